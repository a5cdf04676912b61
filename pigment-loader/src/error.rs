use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum LoadError {
    StringError(String),
    // The server answered with a non-success status code
    HttpStatus(u16),
    HttpError(Arc<reqwest::Error>),
    IoError(Arc<std::io::Error>),
    JsonError(Arc<serde_json::Error>),
    DecodeError(String),
    // The transport dropped the request without reporting success or failure
    RequestDropped,
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            LoadError::StringError(_) => None,
            LoadError::HttpStatus(_) => None,
            LoadError::HttpError(ref e) => Some(&**e),
            LoadError::IoError(ref e) => Some(&**e),
            LoadError::JsonError(ref e) => Some(&**e),
            LoadError::DecodeError(_) => None,
            LoadError::RequestDropped => None,
        }
    }
}

impl core::fmt::Display for LoadError {
    fn fmt(
        &self,
        fmt: &mut core::fmt::Formatter,
    ) -> core::fmt::Result {
        match *self {
            LoadError::StringError(ref e) => e.fmt(fmt),
            LoadError::HttpStatus(status) => write!(fmt, "HTTP status {}", status),
            LoadError::HttpError(ref e) => e.fmt(fmt),
            LoadError::IoError(ref e) => e.fmt(fmt),
            LoadError::JsonError(ref e) => e.fmt(fmt),
            LoadError::DecodeError(ref e) => write!(fmt, "decode failed: {}", e),
            LoadError::RequestDropped => "RequestDropped".fmt(fmt),
        }
    }
}

impl From<&str> for LoadError {
    fn from(str: &str) -> Self {
        LoadError::StringError(str.to_string())
    }
}

impl From<String> for LoadError {
    fn from(string: String) -> Self {
        LoadError::StringError(string)
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(error: reqwest::Error) -> Self {
        LoadError::HttpError(Arc::new(error))
    }
}

impl From<std::io::Error> for LoadError {
    fn from(error: std::io::Error) -> Self {
        LoadError::IoError(Arc::new(error))
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(error: serde_json::Error) -> Self {
        LoadError::JsonError(Arc::new(error))
    }
}

pub type LoadResult<T> = Result<T, LoadError>;

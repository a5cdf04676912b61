use crate::LoadResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_IO_THREAD_COUNT: usize = 4;

fn default_io_thread_count() -> usize {
    DEFAULT_IO_THREAD_COUNT
}

fn default_true() -> bool {
    true
}

#[derive(Serialize, Deserialize)]
pub struct UrlRemapJson {
    pub from: String,
    pub to: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoaderConfigJson {
    #[serde(default)]
    pub asset_root: String,
    #[serde(default = "default_io_thread_count")]
    pub io_thread_count: usize,
    #[serde(default)]
    pub texture_path: String,
    #[serde(default)]
    pub buffer_path: String,
    #[serde(default)]
    pub url_remaps: Vec<UrlRemapJson>,
    #[serde(default = "default_true")]
    pub has_textures: bool,
    #[serde(default = "default_true")]
    pub has_buffers: bool,
}

/// Rewrites urls starting with `from` so they start with `to` instead
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRemap {
    pub from: String,
    pub to: String,
}

impl UrlRemap {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        UrlRemap {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn apply(
        &self,
        url: &str,
    ) -> Option<String> {
        url.strip_prefix(&self.from)
            .map(|rest| format!("{}{}", self.to, rest))
    }
}

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    // Directory the file transport reads from. Relative paths in the json are relative to the
    // directory containing the json file.
    pub asset_root: PathBuf,

    // Number of transport worker threads, also the max number of requests in flight
    pub io_thread_count: usize,

    // Prepended to every url passed to the texture/buffer loaders before resolution
    pub texture_path: Option<String>,
    pub buffer_path: Option<String>,

    // Applied in order by the session, first match wins
    pub url_remaps: Vec<UrlRemap>,

    // Set to false if the session will never load this kind of asset, otherwise progress stays
    // indeterminate
    pub has_textures: bool,
    pub has_buffers: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            asset_root: PathBuf::default(),
            io_thread_count: DEFAULT_IO_THREAD_COUNT,
            texture_path: None,
            buffer_path: None,
            url_remaps: Vec::default(),
            has_textures: true,
            has_buffers: true,
        }
    }
}

impl LoaderConfig {
    pub fn unverified_absolute_path(
        root_path: &Path,
        json_path: &str,
    ) -> PathBuf {
        if Path::new(json_path).is_absolute() {
            PathBuf::from(json_path)
        } else {
            root_path.join(json_path)
        }
    }

    pub fn from_json(
        root_path: &Path,
        config_json: LoaderConfigJson,
    ) -> LoadResult<Self> {
        if config_json.io_thread_count == 0 {
            return Err("io_thread_count must be at least 1".into());
        }

        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };

        Ok(LoaderConfig {
            asset_root: Self::unverified_absolute_path(root_path, &config_json.asset_root),
            io_thread_count: config_json.io_thread_count,
            texture_path: non_empty(config_json.texture_path),
            buffer_path: non_empty(config_json.buffer_path),
            url_remaps: config_json
                .url_remaps
                .into_iter()
                .map(|remap| UrlRemap::new(remap.from, remap.to))
                .collect(),
            has_textures: config_json.has_textures,
            has_buffers: config_json.has_buffers,
        })
    }

    pub fn parse(
        root_path: &Path,
        json_str: &str,
    ) -> LoadResult<Self> {
        let config_json: LoaderConfigJson = serde_json::from_str(json_str)?;
        Self::from_json(root_path, config_json)
    }

    pub fn read_from_file(path: &Path) -> LoadResult<Self> {
        log::info!("Reading loader config from {:?}", path);
        let json_str = std::fs::read_to_string(path)?;
        let root_path = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(root_path, &json_str)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_fills_defaults() {
        let config = LoaderConfig::parse(Path::new("/project"), "{}").unwrap();
        assert_eq!(config.asset_root, PathBuf::from("/project"));
        assert_eq!(config.io_thread_count, DEFAULT_IO_THREAD_COUNT);
        assert_eq!(config.texture_path, None);
        assert!(config.has_textures);
        assert!(config.has_buffers);
        assert!(config.url_remaps.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "asset_root": "assets",
            "io_thread_count": 2,
            "texture_path": "textures/",
            "url_remaps": [{ "from": "cdn://", "to": "https://cdn.example.com/" }],
            "has_buffers": false
        }"#;
        let config = LoaderConfig::parse(Path::new("/project"), json).unwrap();
        assert_eq!(config.asset_root, PathBuf::from("/project").join("assets"));
        assert_eq!(config.io_thread_count, 2);
        assert_eq!(config.texture_path.as_deref(), Some("textures/"));
        assert_eq!(config.buffer_path, None);
        assert!(!config.has_buffers);
        assert_eq!(
            config.url_remaps,
            vec![UrlRemap::new("cdn://", "https://cdn.example.com/")]
        );
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            LoaderConfig::parse(Path::new(""), "{ not json"),
            Err(crate::LoadError::JsonError(_))
        ));
        assert!(matches!(
            LoaderConfig::parse(Path::new(""), r#"{ "io_thread_count": 0 }"#),
            Err(crate::LoadError::StringError(_))
        ));
    }

    #[test]
    fn remap_only_matches_prefix() {
        let remap = UrlRemap::new("cdn://", "https://cdn.example.com/");
        assert_eq!(
            remap.apply("cdn://a.png").as_deref(),
            Some("https://cdn.example.com/a.png")
        );
        assert_eq!(remap.apply("a.png?x=cdn://"), None);
    }
}

use std::fmt;
use std::sync::Arc;

/// The resolved URL of an asset. Two loads refer to the same asset if and only if their keys are
/// equal, so keys are built after path prefixes and URL remapping have been applied.
#[derive(Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct AssetKey(Arc<str>);

impl AssetKey {
    pub fn new(resolved_url: &str) -> Self {
        AssetKey(Arc::from(resolved_url))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AssetKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_tuple("AssetKey").field(&&*self.0).finish()
    }
}

impl fmt::Display for AssetKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetKey {
    fn from(url: &str) -> Self {
        AssetKey::new(url)
    }
}

impl From<String> for AssetKey {
    fn from(url: String) -> Self {
        AssetKey(Arc::from(url))
    }
}

impl AsRef<str> for AssetKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The categories of assets a loading session tracks separately when deciding whether the
/// aggregate progress total is known.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    // Geometry: vertex/index streams
    Buffer,
    // Images uploaded as textures
    Texture,
}

impl AssetKind {
    pub fn name(&self) -> &'static str {
        match self {
            AssetKind::Buffer => "buffer",
            AssetKind::Texture => "texture",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

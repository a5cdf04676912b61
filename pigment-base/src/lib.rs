pub mod hashing;
mod asset_key;
mod progress;

pub use asset_key::AssetKey;
pub use asset_key::AssetKind;
pub use progress::{AggregateProgress, ProgressSample, ProgressTick};

pub mod handle;
pub use handle::AssetHandle;
pub use handle::LoadHandle;
pub use handle::LoadState;

use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::AssetKey;

/// Identifies one transport attempt for an asset. Every caller that is coalesced onto the same
/// attempt shares the handle. Zero is never allocated so it can be used as "null".
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, Ord, PartialOrd)]
pub struct LoadHandle(pub u64);

impl LoadHandle {
    pub const NULL: LoadHandle = LoadHandle(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoadState {
    // A transport request is in flight
    Loading,
    // The decoded asset is in the cache. A caller that hit the cache is still told on the next
    // update.
    Loaded,
    // The attempt this handle refers to failed. The entry was evicted, so loading the same url
    // again starts a fresh attempt with a new handle.
    Failed,
}

/// Returned immediately by a load call, before any data has arrived. It names the asset and the
/// attempt serving it; the loader that produced it answers what state it is in and hands out the
/// decoded asset once it exists.
pub struct AssetHandle<T> {
    key: AssetKey,
    load_handle: LoadHandle,
    phantom_data: PhantomData<fn() -> T>,
}

impl<T> AssetHandle<T> {
    pub fn new(
        key: AssetKey,
        load_handle: LoadHandle,
    ) -> Self {
        AssetHandle {
            key,
            load_handle,
            phantom_data: PhantomData,
        }
    }

    pub fn key(&self) -> &AssetKey {
        &self.key
    }

    pub fn load_handle(&self) -> LoadHandle {
        self.load_handle
    }
}

impl<T> Clone for AssetHandle<T> {
    fn clone(&self) -> Self {
        AssetHandle {
            key: self.key.clone(),
            load_handle: self.load_handle,
            phantom_data: PhantomData,
        }
    }
}

impl<T> PartialEq for AssetHandle<T> {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.load_handle == other.load_handle && self.key == other.key
    }
}

impl<T> Eq for AssetHandle<T> {}

impl<T> Hash for AssetHandle<T> {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.load_handle.hash(state);
        self.key.hash(state);
    }
}

impl<T> Debug for AssetHandle<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("AssetHandle")
            .field("key", &self.key)
            .field("load_handle", &self.load_handle)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn handles_compare_by_attempt_and_key() {
        let a = AssetHandle::<u32>::new(AssetKey::new("a.png"), LoadHandle(1));
        let b = a.clone();
        assert_eq!(a, b);

        let retry = AssetHandle::<u32>::new(AssetKey::new("a.png"), LoadHandle(2));
        assert_ne!(a, retry);
        assert!(!a.load_handle().is_null());
        assert!(LoadHandle::NULL.is_null());
    }
}

use crate::config::{LoaderConfig, UrlRemap};
use crate::progress::ProgressAggregator;
use pigment_base::{AggregateProgress, AssetKey, AssetKind};
use std::sync::{Arc, Mutex};

/// Session-wide notifications. These run after the session's internal lock is released, so they
/// may query the [`LoadingSession`]. They must not report progress or start/finish items.
#[derive(Default)]
pub struct SessionCallbacks {
    /// Called when an item starts loading while nothing else was loading. Receives the url and the
    /// finished/total item counts.
    pub on_start: Option<Box<dyn FnMut(&str, usize, usize) + Send>>,
    /// Called with the combined byte progress of every asset in the session
    pub on_progress: Option<Box<dyn FnMut(AggregateProgress) + Send>>,
    /// Called when every item that was started has finished, successfully or not
    pub on_load: Option<Box<dyn FnMut() + Send>>,
    /// Called with the url of an item that failed
    pub on_error: Option<Box<dyn FnMut(&str) + Send>>,
}

struct SessionInner {
    aggregator: ProgressAggregator,
    url_remaps: Vec<UrlRemap>,

    // Item counters. An item is one load call, so coalesced callers each count.
    is_loading: bool,
    items_total: usize,
    items_finished: usize,
    items_failed: usize,
}

impl SessionInner {
    fn resolve_url(
        &self,
        url: &str,
    ) -> String {
        for remap in &self.url_remaps {
            if let Some(remapped) = remap.apply(url) {
                return remapped;
            }
        }

        url.to_string()
    }

    // Returns the finished/total counts if this start ended an idle period
    fn item_start(&mut self) -> Option<(usize, usize)> {
        self.items_total += 1;
        if self.is_loading {
            return None;
        }

        self.is_loading = true;
        Some((self.items_finished, self.items_total))
    }

    // Returns true if every started item has now finished
    fn item_finished(&mut self) -> bool {
        self.items_finished += 1;
        if self.items_finished == self.items_total {
            self.is_loading = false;
            true
        } else {
            false
        }
    }
}

//
// State shared by every loader in one loading session: the progress aggregator, url resolution,
// and the item counters behind the start/load/error notifications. Cloning produces another handle
// to the same session.
//
// Counters are updated under one lock and the callbacks are invoked under a second one, after the
// first is released.
//
#[derive(Clone)]
pub struct LoadingSession {
    inner: Arc<Mutex<SessionInner>>,
    callbacks: Arc<Mutex<SessionCallbacks>>,
}

impl LoadingSession {
    pub fn new(callbacks: SessionCallbacks) -> Self {
        let inner = SessionInner {
            // The session emits the aggregator's events itself, outside of the lock
            aggregator: ProgressAggregator::new(|_| {}),
            url_remaps: Vec::default(),
            is_loading: false,
            items_total: 0,
            items_finished: 0,
            items_failed: 0,
        };

        LoadingSession {
            inner: Arc::new(Mutex::new(inner)),
            callbacks: Arc::new(Mutex::new(callbacks)),
        }
    }

    /// Creates a session with the config's url remaps, and with any asset kinds the config says
    /// are absent already declared.
    pub fn from_config(
        config: &LoaderConfig,
        callbacks: SessionCallbacks,
    ) -> Self {
        let session = Self::new(callbacks);
        session.set_url_modifier(config.url_remaps.clone());
        if !config.has_textures {
            session.declare_no_assets_of_kind(AssetKind::Texture);
        }
        if !config.has_buffers {
            session.declare_no_assets_of_kind(AssetKind::Buffer);
        }
        session
    }

    pub fn set_url_modifier(
        &self,
        url_remaps: Vec<UrlRemap>,
    ) {
        self.inner.lock().unwrap().url_remaps = url_remaps;
    }

    /// Applies the first matching url remap, or returns the url unchanged
    pub fn resolve_url(
        &self,
        url: &str,
    ) -> AssetKey {
        AssetKey::from(self.inner.lock().unwrap().resolve_url(url))
    }

    pub fn declare_no_assets_of_kind(
        &self,
        kind: AssetKind,
    ) {
        self.inner
            .lock()
            .unwrap()
            .aggregator
            .declare_no_assets_of_kind(kind);
    }

    pub fn mark_pending_first_update(
        &self,
        kind: AssetKind,
        key: &AssetKey,
    ) {
        self.inner
            .lock()
            .unwrap()
            .aggregator
            .mark_pending_first_update(kind, key);
    }

    pub fn report_progress(
        &self,
        key: &AssetKey,
        kind: AssetKind,
        loaded: u64,
        total: u64,
    ) -> AggregateProgress {
        let progress = self
            .inner
            .lock()
            .unwrap()
            .aggregator
            .report_progress(key, kind, loaded, total);

        if let Some(on_progress) = &mut self.callbacks.lock().unwrap().on_progress {
            on_progress(progress);
        }
        progress
    }

    pub fn item_start(
        &self,
        url: &str,
    ) {
        log::trace!("item_start {}", url);
        let started = self.inner.lock().unwrap().item_start();
        if let Some((finished, total)) = started {
            if let Some(on_start) = &mut self.callbacks.lock().unwrap().on_start {
                on_start(url, finished, total);
            }
        }
    }

    pub fn item_end(
        &self,
        url: &str,
    ) {
        log::trace!("item_end {}", url);
        let all_finished = self.inner.lock().unwrap().item_finished();
        if all_finished {
            self.notify_load();
        }
    }

    pub fn item_error(
        &self,
        url: &str,
    ) {
        log::trace!("item_error {}", url);
        let all_finished = {
            let mut inner = self.inner.lock().unwrap();
            inner.items_failed += 1;
            inner.item_finished()
        };

        if let Some(on_error) = &mut self.callbacks.lock().unwrap().on_error {
            on_error(url);
        }
        if all_finished {
            self.notify_load();
        }
    }

    fn notify_load(&self) {
        if let Some(on_load) = &mut self.callbacks.lock().unwrap().on_load {
            on_load();
        }
    }

    /// The most recently emitted aggregate progress
    pub fn progress(&self) -> AggregateProgress {
        self.inner.lock().unwrap().aggregator.aggregate()
    }

    pub fn is_pending(
        &self,
        kind: AssetKind,
        key: &AssetKey,
    ) -> bool {
        self.inner.lock().unwrap().aggregator.is_pending(kind, key)
    }

    pub fn items_total(&self) -> usize {
        self.inner.lock().unwrap().items_total
    }

    pub fn items_finished(&self) -> usize {
        self.inner.lock().unwrap().items_finished
    }

    pub fn items_failed(&self) -> usize {
        self.inner.lock().unwrap().items_failed
    }

    /// True when every started item has finished
    pub fn is_idle(&self) -> bool {
        !self.inner.lock().unwrap().is_loading
    }
}

impl Default for LoadingSession {
    fn default() -> Self {
        Self::new(SessionCallbacks::default())
    }
}

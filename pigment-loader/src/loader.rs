use crate::decoder::{AssetDecoder, BufferDecoder, TextureDecoder};
use crate::session::LoadingSession;
use crate::transport::{AssetTransport, TransportEvent, TransportOp, TransportPayload, TransportRequest};
use crate::LoadError;
use crossbeam_channel::{Receiver, Sender};
use pigment_base::hashing::HashMap;
use pigment_base::{AssetHandle, AssetKey, AssetKind, LoadHandle, LoadState, ProgressTick};
use std::collections::VecDeque;
use std::sync::Arc;

/// What a caller of [`AssetLoader::load`] wants to hear about. `on_load` or `on_error` is called
/// exactly once, after any number of `on_progress` calls, and never before `load` returns.
pub struct LoadCallbacks<T> {
    on_load: Option<Box<dyn FnOnce(Arc<T>)>>,
    on_progress: Option<Box<dyn FnMut(ProgressTick)>>,
    on_error: Option<Box<dyn FnOnce(&LoadError)>>,
}

impl<T> Default for LoadCallbacks<T> {
    fn default() -> Self {
        LoadCallbacks {
            on_load: None,
            on_progress: None,
            on_error: None,
        }
    }
}

impl<T> LoadCallbacks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_load(
        mut self,
        on_load: impl FnOnce(Arc<T>) + 'static,
    ) -> Self {
        self.on_load = Some(Box::new(on_load));
        self
    }

    pub fn on_progress(
        mut self,
        on_progress: impl FnMut(ProgressTick) + 'static,
    ) -> Self {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    pub fn on_error(
        mut self,
        on_error: impl FnOnce(&LoadError) + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    fn notify_load(
        self,
        asset: &Arc<T>,
    ) {
        if let Some(on_load) = self.on_load {
            on_load(asset.clone());
        }
    }

    fn notify_progress(
        &mut self,
        tick: ProgressTick,
    ) {
        if let Some(on_progress) = &mut self.on_progress {
            on_progress(tick);
        }
    }

    fn notify_error(
        self,
        error: &LoadError,
    ) {
        if let Some(on_error) = self.on_error {
            on_error(error);
        }
    }
}

// Per-url state. A url with no entry has never been requested, or its last attempt failed.
enum CacheEntry<T> {
    // A transport request is running. Everyone who asked for the url while it runs waits on it.
    InFlight {
        load_handle: LoadHandle,
        waiters: Vec<LoadCallbacks<T>>,
    },
    // Decoded and cached for the rest of the session
    Completed {
        load_handle: LoadHandle,
        asset: Arc<T>,
    },
}

//
// Loads one kind of asset, making sure each url is fetched at most once at a time.
//
// load() never calls back into the caller. Every callback, including for urls that are already
// cached, is made from update(), which drains the events sent by the transport. Call update() once
// per frame (or whenever convenient) on the thread that owns the loader.
//
pub struct AssetLoader<D: AssetDecoder> {
    decoder: D,
    kind: AssetKind,
    // Prepended to urls passed to load()
    path: Option<String>,

    session: LoadingSession,
    transport: Arc<dyn AssetTransport>,

    // start at 1 because 0 means null
    next_handle_index: u64,
    entries: HashMap<AssetKey, CacheEntry<D::Asset>>,
    // Which url each running transport request is for
    in_flight: HashMap<LoadHandle, AssetKey>,
    // The most recent failed attempt per url. A later failure of the same url replaces it.
    failed: HashMap<AssetKey, LoadHandle>,

    // Loads of already-cached urls. Their callbacks run on the next update().
    deferred_loads: VecDeque<(AssetKey, LoadCallbacks<D::Asset>)>,

    events_tx: Sender<TransportEvent>,
    events_rx: Receiver<TransportEvent>,
}

pub type TextureLoader = AssetLoader<TextureDecoder>;
pub type BufferLoader = AssetLoader<BufferDecoder>;

impl<D: AssetDecoder> AssetLoader<D> {
    pub fn new(
        decoder: D,
        session: LoadingSession,
        transport: Arc<dyn AssetTransport>,
    ) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let kind = decoder.kind();

        AssetLoader {
            decoder,
            kind,
            path: None,
            session,
            transport,
            next_handle_index: 1,
            entries: Default::default(),
            in_flight: Default::default(),
            failed: Default::default(),
            deferred_loads: Default::default(),
            events_tx,
            events_rx,
        }
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn session(&self) -> &LoadingSession {
        &self.session
    }

    pub fn set_path(
        &mut self,
        path: impl Into<String>,
    ) -> &mut Self {
        let path = path.into();
        self.path = if path.is_empty() { None } else { Some(path) };
        self
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn resolve(
        &self,
        url: &str,
    ) -> AssetKey {
        match &self.path {
            Some(path) => self.session.resolve_url(&format!("{}{}", path, url)),
            None => self.session.resolve_url(url),
        }
    }

    /// Starts loading `url` and returns a handle to the eventual asset right away.
    ///
    /// If the url is already being fetched, the caller joins that request instead of starting a
    /// new one. If it is already cached, the caller's `on_load` runs on the next `update()`.
    pub fn load(
        &mut self,
        url: &str,
        callbacks: LoadCallbacks<D::Asset>,
    ) -> AssetHandle<D::Asset> {
        let key = self.resolve(url);
        self.session.item_start(key.as_str());

        match self.entries.get_mut(&key) {
            Some(CacheEntry::Completed { load_handle, .. }) => {
                let load_handle = *load_handle;
                log::debug!("load {:?} {:?} already cached", load_handle, key);
                self.deferred_loads.push_back((key.clone(), callbacks));
                return AssetHandle::new(key, load_handle);
            }
            Some(CacheEntry::InFlight {
                load_handle,
                waiters,
            }) => {
                log::debug!("load {:?} {:?} joins request in flight", load_handle, key);
                waiters.push(callbacks);
                return AssetHandle::new(key, *load_handle);
            }
            None => {}
        }

        let load_handle = LoadHandle(self.next_handle_index);
        self.next_handle_index += 1;
        log::debug!("Allocate load handle {:?} for {:?}", load_handle, key);

        self.entries.insert(
            key.clone(),
            CacheEntry::InFlight {
                load_handle,
                waiters: vec![callbacks],
            },
        );
        self.in_flight.insert(load_handle, key.clone());

        // Must happen before the transport can possibly report anything
        self.session.mark_pending_first_update(self.kind, &key);

        self.transport.request(TransportRequest {
            load_handle,
            url: key.clone(),
            op: TransportOp::new(self.events_tx.clone(), load_handle),
        });

        AssetHandle::new(key, load_handle)
    }

    // Process all transport events and queued cache hits, calling the callbacks they complete
    #[profiling::function]
    pub fn update(&mut self) {
        while let Some((key, callbacks)) = self.deferred_loads.pop_front() {
            self.handle_deferred_load(key, callbacks);
        }

        while let Ok(event) = self.events_rx.try_recv() {
            log::trace!("handle event {:?}", event);
            match event {
                TransportEvent::Progress(load_handle, tick) => {
                    self.handle_progress(load_handle, tick)
                }
                TransportEvent::Complete(load_handle, payload) => {
                    self.handle_complete(load_handle, payload)
                }
                TransportEvent::Failed(load_handle, error) => {
                    self.handle_failed(load_handle, error)
                }
            }
        }
    }

    fn handle_deferred_load(
        &mut self,
        key: AssetKey,
        callbacks: LoadCallbacks<D::Asset>,
    ) {
        // Completed entries are never removed, so the asset is still here
        if let Some(CacheEntry::Completed { asset, .. }) = self.entries.get(&key) {
            callbacks.notify_load(asset);
            self.session.item_end(key.as_str());
        } else {
            log::error!("cached asset {:?} disappeared before its load was delivered", key);
            callbacks.notify_error(&LoadError::RequestDropped);
            self.session.item_error(key.as_str());
        }
    }

    fn handle_progress(
        &mut self,
        load_handle: LoadHandle,
        tick: ProgressTick,
    ) {
        let key = match self.in_flight.get(&load_handle) {
            Some(key) => key.clone(),
            None => {
                log::debug!("ignoring progress for finished request {:?}", load_handle);
                return;
            }
        };

        if let Some(CacheEntry::InFlight { waiters, .. }) = self.entries.get_mut(&key) {
            for waiter in waiters.iter_mut() {
                waiter.notify_progress(tick);
            }
        }

        self.session
            .report_progress(&key, self.kind, tick.loaded, tick.total);
    }

    // Stops tracking a finished request and hands back everyone waiting on it
    fn take_in_flight(
        &mut self,
        load_handle: LoadHandle,
    ) -> Option<(AssetKey, Vec<LoadCallbacks<D::Asset>>)> {
        let key = self.in_flight.remove(&load_handle)?;
        match self.entries.remove(&key) {
            Some(CacheEntry::InFlight { waiters, .. }) => Some((key, waiters)),
            Some(completed) => {
                log::error!("request {:?} finished but {:?} was not in flight", load_handle, key);
                self.entries.insert(key, completed);
                None
            }
            None => None,
        }
    }

    fn handle_complete(
        &mut self,
        load_handle: LoadHandle,
        payload: TransportPayload,
    ) {
        let (key, waiters) = match self.take_in_flight(load_handle) {
            Some(in_flight) => in_flight,
            None => return,
        };

        log::debug!(
            "handle_complete {:?} {:?} {} waiters",
            load_handle,
            key,
            waiters.len()
        );

        // A transport that never reported progress would otherwise hold back the aggregate forever
        if self.session.is_pending(self.kind, &key) {
            let length = payload.bytes.len() as u64;
            self.session.report_progress(&key, self.kind, length, length);
        }

        let asset = {
            profiling::scope!("AssetDecoder::decode");
            self.decoder.decode(&key, payload)
        };

        match asset {
            Ok(asset) => {
                let asset = Arc::new(asset);
                self.entries.insert(
                    key.clone(),
                    CacheEntry::Completed {
                        load_handle,
                        asset: asset.clone(),
                    },
                );

                for waiter in waiters {
                    waiter.notify_load(&asset);
                    self.session.item_end(key.as_str());
                }
            }
            Err(error) => self.fail(load_handle, key, waiters, error),
        }
    }

    fn handle_failed(
        &mut self,
        load_handle: LoadHandle,
        error: LoadError,
    ) {
        if let Some((key, waiters)) = self.take_in_flight(load_handle) {
            self.fail(load_handle, key, waiters, error);
        }
    }

    // The entry has already been removed, so the next load of this url starts a new request
    fn fail(
        &mut self,
        load_handle: LoadHandle,
        key: AssetKey,
        waiters: Vec<LoadCallbacks<D::Asset>>,
        error: LoadError,
    ) {
        log::error!("load error {:?} {:?}: {}", load_handle, key, error);
        self.failed.insert(key.clone(), load_handle);

        // Don't let a request that will never report again block the aggregate
        if self.session.is_pending(self.kind, &key) {
            self.session.report_progress(&key, self.kind, 0, 0);
        }

        for waiter in waiters {
            waiter.notify_error(&error);
            self.session.item_error(key.as_str());
        }
    }

    /// Returns `None` if the handle was not produced by this loader, or if it refers to a failed
    /// attempt that a later failure of the same url has superseded.
    pub fn load_state(
        &self,
        handle: &AssetHandle<D::Asset>,
    ) -> Option<LoadState> {
        match self.entries.get(handle.key()) {
            Some(CacheEntry::InFlight { load_handle, .. })
                if *load_handle == handle.load_handle() =>
            {
                Some(LoadState::Loading)
            }
            Some(CacheEntry::Completed { load_handle, .. })
                if *load_handle == handle.load_handle() =>
            {
                Some(LoadState::Loaded)
            }
            _ if self.failed.get(handle.key()) == Some(&handle.load_handle()) => {
                Some(LoadState::Failed)
            }
            _ => None,
        }
    }

    /// The decoded asset, once the request behind the handle has completed
    pub fn asset(
        &self,
        handle: &AssetHandle<D::Asset>,
    ) -> Option<Arc<D::Asset>> {
        match self.entries.get(handle.key()) {
            Some(CacheEntry::Completed { load_handle, asset })
                if *load_handle == handle.load_handle() =>
            {
                Some(asset.clone())
            }
            _ => None,
        }
    }

    /// Looks up a url (path prefix and url remaps are applied) in the cache without loading it
    pub fn cached(
        &self,
        url: &str,
    ) -> Option<Arc<D::Asset>> {
        match self.entries.get(&self.resolve(url)) {
            Some(CacheEntry::Completed { asset, .. }) => Some(asset.clone()),
            _ => None,
        }
    }

    /// Number of transport requests that have not finished
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// True when there are no running requests and no callbacks waiting for update()
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty() && self.deferred_loads.is_empty()
    }
}

mod file_io;
mod http_io;
mod thread_pool;

pub use file_io::FileAssetIO;
pub use http_io::HttpAssetIO;
pub use thread_pool::{FetchWorker, TransportThreadPool};

use crate::LoadError;
use crossbeam_channel::Sender;
use pigment_base::{AssetKey, LoadHandle, ProgressTick};

//
// Interface for transports
//
// A transport fetches the raw bytes for a url. It is handed a TransportOp per request and reports
// through it: any number of cumulative progress ticks, then exactly one of complete or error. The
// op sends those as events to the loader that issued the request, which processes them on its own
// thread during update(). Transports are free to do the actual work on other threads.
//

// Upper bound on what we reserve up front from a reported length. The rest grows as data arrives.
const MAX_PREALLOCATION: u64 = 1024 * 1024;

// Buffer for a body of `total` bytes. `total` comes from the other end and may be absurd.
pub(crate) fn payload_buffer(total: u64) -> Vec<u8> {
    Vec::with_capacity(total.min(MAX_PREALLOCATION) as usize)
}

/// Raw bytes of a fetched asset, along with the mime type if the transport knows it
pub struct TransportPayload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl TransportPayload {
    /// Parameters like `; charset=...` are cut off the content type
    pub fn new(
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Self {
        let content_type = content_type
            .map(|content_type| match content_type.find(';') {
                Some(index) => &content_type[..index],
                None => content_type,
            })
            .map(|content_type| content_type.trim().to_string())
            .filter(|content_type| !content_type.is_empty());

        TransportPayload {
            bytes,
            content_type,
        }
    }
}

impl std::fmt::Debug for TransportPayload {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TransportPayload")
            .field("data_length", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

#[derive(Debug)]
pub enum TransportEvent {
    Progress(LoadHandle, ProgressTick),
    Complete(LoadHandle, TransportPayload),
    Failed(LoadHandle, LoadError),
}

/// Lets a transport report progress and the outcome of one request. Dropping the op without
/// calling [`complete`](Self::complete) or [`error`](Self::error) fails the request.
pub struct TransportOp {
    sender: Option<Sender<TransportEvent>>,
    handle: LoadHandle,
}

impl TransportOp {
    pub(crate) fn new(
        sender: Sender<TransportEvent>,
        handle: LoadHandle,
    ) -> Self {
        Self {
            sender: Some(sender),
            handle,
        }
    }

    pub fn load_handle(&self) -> LoadHandle {
        self.handle
    }

    /// Reports cumulative progress. `total` is zero if the length is not known.
    pub fn progress(
        &self,
        loaded: u64,
        total: u64,
    ) {
        if let Some(sender) = &self.sender {
            // The loader may already be gone, nobody is interested in the result then
            let _ = sender.send(TransportEvent::Progress(
                self.handle,
                ProgressTick::new(loaded, total),
            ));
        }
    }

    pub fn complete(
        mut self,
        payload: TransportPayload,
    ) {
        log::debug!("TransportOp for {:?} complete", self.handle);
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(TransportEvent::Complete(self.handle, payload));
        }
    }

    pub fn error(
        mut self,
        error: LoadError,
    ) {
        log::debug!("TransportOp for {:?} error {}", self.handle, error);
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(TransportEvent::Failed(self.handle, error));
        }
    }
}

impl Drop for TransportOp {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            log::warn!(
                "TransportOp for {:?} dropped without calling complete/error",
                self.handle
            );
            let _ = sender.send(TransportEvent::Failed(
                self.handle,
                LoadError::RequestDropped,
            ));
        }
    }
}

pub struct TransportRequest {
    pub load_handle: LoadHandle,
    pub url: AssetKey,
    pub op: TransportOp,
}

// Represents a source we can fetch asset bytes from
pub trait AssetTransport: Send + Sync {
    // Start fetching the url. Progress and the outcome are reported through request.op.
    fn request(
        &self,
        request: TransportRequest,
    );
}

use super::{TransportOp, TransportPayload, TransportRequest};
use crate::LoadResult;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Does the blocking work of fetching one url. Runs on a pool thread.
pub trait FetchWorker: Send + Sync + 'static {
    // Returns the fetched bytes. May call op.progress() any number of times while reading.
    fn fetch(
        &self,
        url: &str,
        op: &TransportOp,
    ) -> LoadResult<TransportPayload>;
}

// Thread that tries to take jobs out of the request channel and ends when the finish channel is
// signalled
struct TransportWorkerThread {
    finish_tx: Sender<()>,
    join_handle: JoinHandle<()>,
}

impl TransportWorkerThread {
    fn new<W: FetchWorker>(
        worker: Arc<W>,
        request_rx: Receiver<TransportRequest>,
        active_request_count: Arc<AtomicUsize>,
        thread_name: String,
    ) -> LoadResult<Self> {
        let (finish_tx, finish_rx) = crossbeam_channel::bounded(1);
        let join_handle = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                profiling::register_thread!(&thread_name);
                loop {
                    crossbeam_channel::select! {
                        recv(request_rx) -> msg => {
                            let request = match msg {
                                Ok(request) => request,
                                // The pool is gone
                                Err(_) => return,
                            };

                            profiling::scope!("TransportRequest");
                            log::trace!("Start fetch {:?} {}", request.load_handle, request.url);
                            let result = worker.fetch(request.url.as_str(), &request.op);

                            // No longer active by the time anyone hears about the outcome
                            active_request_count.fetch_sub(1, Ordering::Release);
                            match result {
                                Ok(payload) => {
                                    log::trace!("Finished fetch {:?} {:?}", request.load_handle, payload);
                                    request.op.complete(payload);
                                }
                                Err(error) => {
                                    log::trace!("Failed fetch {:?} {}", request.load_handle, error);
                                    request.op.error(error);
                                }
                            }
                        },
                        recv(finish_rx) -> _msg => {
                            return;
                        }
                    }
                }
            })?;

        Ok(TransportWorkerThread {
            finish_tx,
            join_handle,
        })
    }
}

// Spawns N threads, proxies requests to them, and stops the threads when the pool is dropped.
// Requests still queued when the pool is dropped are dropped too, which fails them.
pub struct TransportThreadPool {
    worker_threads: Vec<TransportWorkerThread>,
    request_tx: Sender<TransportRequest>,
    active_request_count: Arc<AtomicUsize>,
}

impl TransportThreadPool {
    pub fn new<W: FetchWorker>(
        worker: Arc<W>,
        thread_count: usize,
        thread_name: &str,
    ) -> LoadResult<Self> {
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<TransportRequest>();
        let active_request_count = Arc::new(AtomicUsize::new(0));

        let mut worker_threads = Vec::with_capacity(thread_count);
        for thread_index in 0..thread_count {
            let worker_thread = TransportWorkerThread::new(
                worker.clone(),
                request_rx.clone(),
                active_request_count.clone(),
                format!("{} {}", thread_name, thread_index),
            )?;
            worker_threads.push(worker_thread);
        }

        Ok(TransportThreadPool {
            worker_threads,
            request_tx,
            active_request_count,
        })
    }

    pub fn add_request(
        &self,
        request: TransportRequest,
    ) {
        self.active_request_count.fetch_add(1, Ordering::Release);
        if let Err(error) = self.request_tx.send(request) {
            // Only possible if every worker exited. Dropping the request reports the failure.
            self.active_request_count.fetch_sub(1, Ordering::Release);
            log::error!("transport pool has no running workers, dropping request");
            drop(error.into_inner());
        }
    }

    /// Requests that are queued or being fetched
    pub fn active_request_count(&self) -> usize {
        self.active_request_count.load(Ordering::Acquire)
    }

    pub fn thread_count(&self) -> usize {
        self.worker_threads.len()
    }
}

impl Drop for TransportThreadPool {
    fn drop(&mut self) {
        for worker_thread in &self.worker_threads {
            let _ = worker_thread.finish_tx.send(());
        }

        for worker_thread in self.worker_threads.drain(..) {
            if worker_thread.join_handle.join().is_err() {
                log::error!("transport worker thread panicked");
            }
        }
    }
}

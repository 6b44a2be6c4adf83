//! Worker pool running asynchronous load requests.
//!
//! A fixed set of threads drains one unbounded job queue. Shutdown drops
//! the sender side, which lets workers finish everything already queued and
//! then exit, so no accepted job is ever silently discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::error::CacheError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size worker pool with a shared job queue.
pub(crate) struct LoadExecutor {
    tx: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl LoadExecutor {
    pub(crate) fn new(worker_count: usize) -> Self {
        let (tx, rx) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let rx = rx.clone();
            workers.push(thread::spawn(move || worker_loop(rx)));
        }
        Self {
            tx: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
        }
    }

    /// Queue a job. Returns `false` once the executor has stopped.
    pub(crate) fn submit(&self, job: Job) -> bool {
        match self.tx.lock().as_ref() {
            Some(tx) => tx.send(job).is_ok(),
            None => false,
        }
    }

    /// Stop accepting jobs, run out the queue and join the workers.
    ///
    /// Idempotent; later calls return immediately.
    pub(crate) fn stop(&self) {
        drop(self.tx.lock().take());
        for worker in self.workers.lock().drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for LoadExecutor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(rx: Receiver<Job>) {
    // Ends only when the queue is disconnected and fully drained.
    while let Ok(job) = rx.recv() {
        job();
    }
}

// ---------------------------------------------------------------------------
// LoadHandle
// ---------------------------------------------------------------------------

/// Pending result of an asynchronous load.
///
/// Returned by [`Cache::load`](crate::cache::Cache::load) and
/// [`Cache::load_all`](crate::cache::Cache::load_all).
pub struct LoadHandle<T> {
    rx: Receiver<Result<T, CacheError>>,
    cancelled: Arc<AtomicBool>,
}

impl<T> LoadHandle<T> {
    pub(crate) fn new() -> (Self, LoadResolver<T>) {
        let (tx, rx) = bounded(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        let handle = Self {
            rx,
            cancelled: Arc::clone(&cancelled),
        };
        (handle, LoadResolver { tx, cancelled })
    }

    /// Block until the load completes.
    ///
    /// Returns [`CacheError::Cancelled`] if the job was cancelled before it
    /// ran, or if its worker abandoned it without a result.
    pub fn wait(self) -> Result<T, CacheError> {
        match self.rx.recv() {
            Ok(result) => result,
            Err(_) => Err(CacheError::Cancelled),
        }
    }

    /// Check for a result without blocking. `None` means still pending.
    pub fn try_wait(&self) -> Option<Result<T, CacheError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(CacheError::Cancelled)),
        }
    }

    /// Request cancellation.
    ///
    /// Best-effort: a job that has not started yet will be skipped; a job
    /// already running completes normally.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether `cancel` has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl<T> std::fmt::Debug for LoadHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Job-side counterpart of a [`LoadHandle`].
pub(crate) struct LoadResolver<T> {
    tx: Sender<Result<T, CacheError>>,
    cancelled: Arc<AtomicBool>,
}

impl<T> LoadResolver<T> {
    /// Whether the waiting side requested cancellation.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Deliver the result. Dropping a resolver without resolving reports
    /// cancellation to the waiting side.
    pub(crate) fn resolve(self, result: Result<T, CacheError>) {
        let _ = self.tx.send(result);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Bounded pool of long-lived download workers.
//!
//! Work is fed through a single FIFO channel, so jobs submitted one after
//! another are admitted serially and the number of open connections never
//! exceeds the pool size.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::error::{TransferError, TransferResult};
use super::http::HttpClient;

/// Default number of download workers.
pub const DEFAULT_MAX_WORKERS: usize = 16;

pub(crate) type Task = Box<dyn FnOnce(&WorkerContext) + Send + 'static>;

/// What a worker hands to each task it runs.
pub struct WorkerContext {
    http: Arc<HttpClient>,
    stopping: Arc<AtomicBool>,
}

impl WorkerContext {
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// True once the pool has been force-stopped; tasks should wrap up.
    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }
}

/// Fixed-size pool of download threads.
pub struct WorkerPool {
    max_workers: usize,
    sender: Mutex<Option<mpsc::Sender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stopping: Arc<AtomicBool>,
    http: Arc<HttpClient>,
}

impl WorkerPool {
    /// Start `max_workers` threads (at least one) sharing `http`.
    pub fn new(max_workers: usize, http: HttpClient) -> Self {
        let max_workers = max_workers.max(1);
        let http = Arc::new(http);
        let stopping = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = mpsc::channel::<Task>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..max_workers)
            .map(|index| {
                let receiver = Arc::clone(&receiver);
                let context = WorkerContext {
                    http: Arc::clone(&http),
                    stopping: Arc::clone(&stopping),
                };
                thread::spawn(move || {
                    loop {
                        let task = receiver.lock().recv();
                        match task {
                            Ok(task) => task(&context),
                            Err(_) => break,
                        }
                    }
                    debug!(worker = index, "download worker exiting");
                })
            })
            .collect();

        Self {
            max_workers,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            stopping,
            http,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn http(&self) -> &Arc<HttpClient> {
        &self.http
    }

    /// Whether the pool still accepts work.
    pub fn is_running(&self) -> bool {
        self.sender.lock().is_some()
    }

    pub(crate) fn execute(&self, task: Task) -> TransferResult<()> {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(sender) => sender.send(task).map_err(|_| TransferError::PoolShutDown),
            None => Err(TransferError::PoolShutDown),
        }
    }

    /// Stop accepting work and wait up to `timeout` for queued work to drain.
    ///
    /// Returns `true` if every worker exited in time. Otherwise the pool is
    /// force-stopped: workers finish the transfer in hand, skip the rest and
    /// their threads are detached.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.sender.lock().take();
        let deadline = Instant::now() + timeout;

        loop {
            {
                let mut workers = self.workers.lock();
                if workers.iter().all(JoinHandle::is_finished) {
                    for handle in workers.drain(..) {
                        let _ = handle.join();
                    }
                    return true;
                }
            }
            if Instant::now() >= deadline {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "download workers did not drain in time, forcing stop"
                );
                self.force_stop();
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Stop immediately without waiting for workers.
    pub fn force_stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.sender.lock().take();
        self.workers.lock().clear();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel lets idle workers exit on their own
        self.sender.lock().take();
    }
}

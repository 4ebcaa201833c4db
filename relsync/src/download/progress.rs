//! Byte-level progress tracking for transfers and jobs.
//!
//! Every [`Transfer`](super::Transfer) owns a [`ProgressCounter`]. When the
//! transfer is added to a job, the counter is attached to that job and from
//! then on every change is forwarded as a delta, so the job's aggregate
//! stays current without walking its transfers or taking a lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Receives counter deltas from the transfers it owns.
pub(crate) trait ProgressSink: Send + Sync {
    fn adjust(&self, current_delta: i64, total_delta: i64);
}

/// Snapshot of download progress handed to UI layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Bytes fetched so far.
    pub current: u64,
    /// Bytes expected in total. Unknown sizes count as an assumed average.
    pub total: u64,
    /// Human readable status, e.g. `Downloading 1.20.jar`.
    pub status: String,
}

impl DownloadProgress {
    /// Fraction complete in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.current as f64 / self.total as f64).min(1.0)
    }
}

/// Callback for progress snapshots.
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, progress: &DownloadProgress);
}

impl<F> ProgressListener for F
where
    F: Fn(&DownloadProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &DownloadProgress) {
        self(progress)
    }
}

/// Current/total byte counter for one transfer.
pub struct ProgressCounter {
    current: AtomicU64,
    total: AtomicU64,
    owner: OnceLock<Weak<dyn ProgressSink>>,
}

impl std::fmt::Debug for ProgressCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressCounter")
            .field("current", &self.current())
            .field("total", &self.total())
            .finish()
    }
}

impl ProgressCounter {
    pub fn new(total: u64) -> Self {
        Self {
            current: AtomicU64::new(0),
            total: AtomicU64::new(total),
            owner: OnceLock::new(),
        }
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    /// Attach the counter to its owning job. Only the first call has effect.
    pub(crate) fn attach(&self, owner: Weak<dyn ProgressSink>) -> bool {
        self.owner.set(owner).is_ok()
    }

    /// Replace the expected total, e.g. once Content-Length is known.
    pub fn set_total(&self, total: u64) {
        let old = self.total.swap(total, Ordering::SeqCst);
        self.notify(0, total as i64 - old as i64);
    }

    /// Record `bytes` more received.
    pub fn add(&self, bytes: u64) {
        let now = self.current.fetch_add(bytes, Ordering::SeqCst) + bytes;
        self.notify(bytes as i64, 0);
        if now > self.total() {
            self.set_total(now);
        }
    }

    /// Set the received count. A count past the total raises the total.
    pub fn set_current(&self, current: u64) {
        let old = self.current.swap(current, Ordering::SeqCst);
        self.notify(current as i64 - old as i64, 0);
        if current > self.total() {
            self.set_total(current);
        }
    }

    /// Mark the transfer as fully accounted for.
    pub fn complete(&self) {
        self.set_current(self.total());
    }

    /// Forget received bytes before a retry.
    pub fn reset(&self) {
        self.set_current(0);
    }

    fn notify(&self, current_delta: i64, total_delta: i64) {
        if current_delta == 0 && total_delta == 0 {
            return;
        }
        if let Some(owner) = self.owner.get().and_then(Weak::upgrade) {
            owner.adjust(current_delta, total_delta);
        }
    }
}

/// Background thread that polls a progress source and reports snapshots.
///
/// Dropping the reporter stops the thread after one final report.
pub struct ProgressReporter {
    handle: Option<JoinHandle<()>>,
    done: Arc<AtomicBool>,
}

impl ProgressReporter {
    /// Start polling `source` every `poll_interval`.
    pub fn start<S>(
        source: S,
        listener: Arc<dyn ProgressListener>,
        poll_interval: Duration,
    ) -> Self
    where
        S: Fn() -> DownloadProgress + Send + 'static,
    {
        let done = Arc::new(AtomicBool::new(false));
        let done_flag = Arc::clone(&done);

        let handle = thread::spawn(move || {
            let mut last = None;
            while !done_flag.load(Ordering::SeqCst) {
                let snapshot = source();
                if last.as_ref() != Some(&snapshot) {
                    listener.on_progress(&snapshot);
                    last = Some(snapshot);
                }
                thread::sleep(poll_interval);
            }

            // Final report
            listener.on_progress(&source());
        });

        Self {
            handle: Some(handle),
            done,
        }
    }

    /// Start a reporter with the default 100ms poll interval.
    pub fn start_default<S>(source: S, listener: Arc<dyn ProgressListener>) -> Self
    where
        S: Fn() -> DownloadProgress + Send + 'static,
    {
        Self::start(source, listener, Duration::from_millis(100))
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.done.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

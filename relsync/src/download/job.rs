//! Named batches of transfers executed on the worker pool.
//!
//! # Lifecycle
//!
//! ```text
//! new ──add_transfer()*──► start_downloading(pool)
//!                               │ submits pool.max_workers() worker tasks
//!                               ▼
//!               ┌─────── worker loop ────────┐
//!               │ pop pending transfer       │
//!               │ attempt > cap? ─► give up  │
//!               │ fetch ok?      ─► success  │
//!               │ storage error? ─► give up  │
//!               │ otherwise      ─► requeue  │
//!               └────────────────────────────┘
//!                               │ queue empty: live workers -= 1
//!                               ▼
//!                 last worker out fires listeners once
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use super::error::{TransferError, TransferResult};
use super::http::HttpClient;
use super::pool::{WorkerContext, WorkerPool};
use super::progress::{DownloadProgress, ProgressSink};
use super::transfer::Transfer;

/// Attempts a transfer gets before it is abandoned.
pub const MAX_ATTEMPTS_PER_TRANSFER: u32 = 5;

/// Size assumed for a transfer until the server reports one (5 MiB).
pub const ASSUMED_AVERAGE_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Notified when a job has no more work.
pub trait JobListener: Send + Sync {
    fn on_job_finished(&self, job: &DownloadJob);
}

impl<F> JobListener for F
where
    F: Fn(&DownloadJob) + Send + Sync,
{
    fn on_job_finished(&self, job: &DownloadJob) {
        self(job)
    }
}

struct JobInner {
    name: String,
    ignore_failures: bool,
    started: AtomicBool,
    started_at: Mutex<Option<Instant>>,
    all: Mutex<Vec<Arc<Transfer>>>,
    pending: Mutex<VecDeque<Arc<Transfer>>>,
    successes: Mutex<Vec<Arc<Transfer>>>,
    failures: Mutex<Vec<Arc<Transfer>>>,
    live_workers: AtomicUsize,
    finishing: AtomicBool,
    finished: Mutex<bool>,
    finished_signal: Condvar,
    listeners: Mutex<Vec<Arc<dyn JobListener>>>,
    current: AtomicI64,
    total: AtomicI64,
    status: Mutex<String>,
}

impl ProgressSink for JobInner {
    fn adjust(&self, current_delta: i64, total_delta: i64) {
        if current_delta != 0 {
            self.current.fetch_add(current_delta, Ordering::SeqCst);
        }
        if total_delta != 0 {
            self.total.fetch_add(total_delta, Ordering::SeqCst);
        }
    }
}

/// A batch of transfers sharing completion and failure accounting.
///
/// Cloning yields another handle to the same job.
#[derive(Clone)]
pub struct DownloadJob {
    inner: Arc<JobInner>,
}

impl std::fmt::Debug for DownloadJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadJob")
            .field("name", &self.inner.name)
            .field("transfers", &self.transfer_count())
            .field("started", &self.is_started())
            .finish()
    }
}

impl DownloadJob {
    /// Create an empty job. With `ignore_failures`, abandoned transfers are
    /// dropped instead of being recorded as failures.
    pub fn new(name: impl Into<String>, ignore_failures: bool) -> Self {
        Self {
            inner: Arc::new(JobInner {
                name: name.into(),
                ignore_failures,
                started: AtomicBool::new(false),
                started_at: Mutex::new(None),
                all: Mutex::new(Vec::new()),
                pending: Mutex::new(VecDeque::new()),
                successes: Mutex::new(Vec::new()),
                failures: Mutex::new(Vec::new()),
                live_workers: AtomicUsize::new(0),
                finishing: AtomicBool::new(false),
                finished: Mutex::new(false),
                finished_signal: Condvar::new(),
                listeners: Mutex::new(Vec::new()),
                current: AtomicI64::new(0),
                total: AtomicI64::new(0),
                status: Mutex::new(String::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn ignores_failures(&self) -> bool {
        self.inner.ignore_failures
    }

    /// Register a completion listener. Add listeners before starting.
    pub fn add_listener(&self, listener: Arc<dyn JobListener>) {
        self.inner.listeners.lock().push(listener);
    }

    /// Queue a transfer.
    ///
    /// # Errors
    ///
    /// Fails with [`TransferError::AlreadyStarted`] once the job is running.
    pub fn add_transfer(&self, transfer: Transfer) -> TransferResult<()> {
        if self.is_started() {
            return Err(TransferError::AlreadyStarted(self.inner.name.clone()));
        }

        if transfer.expected_size() == 0 {
            transfer.progress().set_total(ASSUMED_AVERAGE_FILE_SIZE);
        }
        let transfer = Arc::new(transfer);

        self.inner
            .total
            .fetch_add(transfer.progress().total() as i64, Ordering::SeqCst);
        self.inner
            .current
            .fetch_add(transfer.progress().current() as i64, Ordering::SeqCst);
        let sink: Arc<dyn ProgressSink> = self.inner.clone();
        transfer.progress().attach(Arc::downgrade(&sink));

        self.inner.all.lock().push(Arc::clone(&transfer));
        self.inner.pending.lock().push_back(transfer);
        Ok(())
    }

    /// Queue several transfers.
    pub fn add_transfers<I>(&self, transfers: I) -> TransferResult<()>
    where
        I: IntoIterator<Item = Transfer>,
    {
        for transfer in transfers {
            self.add_transfer(transfer)?;
        }
        Ok(())
    }

    /// Submit one worker task per pool slot.
    ///
    /// Returns immediately; completion is reported to listeners and through
    /// [`wait`](Self::wait). An empty job finishes before this returns.
    ///
    /// # Arguments
    ///
    /// * `pool` - Pool whose workers drain this job's queue
    ///
    /// # Returns
    ///
    /// `Ok(())` once the workers are submitted. Fails with
    /// [`TransferError::AlreadyStarted`] on a second call, or with
    /// [`TransferError::PoolShutDown`] when the pool no longer accepts work.
    ///
    /// # Example
    ///
    /// ```
    /// use relsync::download::{DownloadJob, HttpClient, WorkerPool};
    ///
    /// let pool = WorkerPool::new(2, HttpClient::new().unwrap());
    /// let job = DownloadJob::new("Empty", false);
    /// job.start_downloading(&pool).unwrap();
    /// assert!(job.is_finished());
    /// assert!(job.start_downloading(&pool).is_err());
    /// ```
    pub fn start_downloading(&self, pool: &WorkerPool) -> TransferResult<()> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(TransferError::AlreadyStarted(self.inner.name.clone()));
        }
        *self.inner.started_at.lock() = Some(Instant::now());

        let transfers = self.transfer_count();
        let workers = pool.max_workers();
        info!(
            job = %self.inner.name,
            transfers,
            workers,
            "starting download job"
        );

        if transfers == 0 {
            self.finish();
            return Ok(());
        }

        self.inner.live_workers.store(workers, Ordering::SeqCst);
        for submitted in 0..workers {
            let job = self.clone();
            if let Err(e) = pool.execute(Box::new(move |ctx| job.run_worker(ctx))) {
                for _ in submitted..workers {
                    self.worker_exited();
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn run_worker(&self, ctx: &WorkerContext) {
        while !ctx.is_stopping() {
            let next = self.inner.pending.lock().pop_front();
            let Some(transfer) = next else {
                break;
            };
            self.attempt(transfer, ctx.http());
        }
        self.worker_exited();
    }

    fn attempt(&self, transfer: Arc<Transfer>, http: &HttpClient) {
        let attempt = transfer.begin_attempt();
        if attempt > MAX_ATTEMPTS_PER_TRANSFER {
            self.give_up(&transfer, "too many attempts");
            return;
        }

        *self.inner.status.lock() = format!("Downloading {}", transfer.display_name());

        match transfer.verification().fetch(&transfer, http) {
            Ok(outcome) => {
                debug!(
                    job = %self.inner.name,
                    url = transfer.url(),
                    attempt,
                    ?outcome,
                    "transfer finished"
                );
                transfer.progress().complete();
                transfer.mark_finished();
                self.inner.successes.lock().push(transfer);
            }
            Err(e) if e.is_storage() => {
                error!(job = %self.inner.name, url = transfer.url(), error = %e, "storage failure");
                self.give_up(&transfer, "storage failure");
            }
            Err(e) => {
                warn!(
                    job = %self.inner.name,
                    url = transfer.url(),
                    attempt,
                    error = %e,
                    "transfer attempt failed, requeueing"
                );
                transfer.progress().reset();
                self.inner.pending.lock().push_back(transfer);
            }
        }
    }

    fn give_up(&self, transfer: &Arc<Transfer>, reason: &str) {
        transfer.progress().complete();
        transfer.mark_finished();
        if self.inner.ignore_failures {
            debug!(job = %self.inner.name, url = transfer.url(), reason, "dropping transfer");
        } else {
            error!(
                job = %self.inner.name,
                url = transfer.url(),
                attempts = transfer.attempts(),
                reason,
                "giving up on transfer"
            );
            self.inner.failures.lock().push(Arc::clone(transfer));
        }
    }

    fn worker_exited(&self) {
        if self.inner.live_workers.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.finish();
        }
    }

    fn finish(&self) {
        if self.inner.finishing.swap(true, Ordering::SeqCst) {
            return;
        }

        // Anything still queued was cut off by a forced stop
        let leftover: Vec<_> = self.inner.pending.lock().drain(..).collect();
        for transfer in &leftover {
            self.give_up(transfer, "pool stopped");
        }

        info!(
            job = %self.inner.name,
            successes = self.success_count(),
            failures = self.failure_count(),
            elapsed_ms = self.elapsed().map(|d| d.as_millis() as u64).unwrap_or(0),
            "download job finished"
        );

        let listeners: Vec<_> = self.inner.listeners.lock().clone();
        for listener in listeners {
            listener.on_job_finished(self);
        }

        *self.inner.finished.lock() = true;
        self.inner.finished_signal.notify_all();
    }

    /// Block until the job finishes.
    pub fn wait(&self) {
        let mut finished = self.inner.finished.lock();
        while !*finished {
            self.inner.finished_signal.wait(&mut finished);
        }
    }

    /// Block until the job finishes or `timeout` passes. Returns `true` if
    /// the job finished.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut finished = self.inner.finished.lock();
        while !*finished {
            if self
                .inner
                .finished_signal
                .wait_until(&mut finished, deadline)
                .timed_out()
            {
                return *finished;
            }
        }
        true
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// True once completion listeners have run.
    pub fn is_finished(&self) -> bool {
        *self.inner.finished.lock()
    }

    /// Started, nothing pending and no worker still running.
    pub fn is_complete(&self) -> bool {
        self.is_started()
            && self.inner.pending.lock().is_empty()
            && self.inner.live_workers.load(Ordering::SeqCst) == 0
    }

    pub fn transfer_count(&self) -> usize {
        self.inner.all.lock().len()
    }

    pub fn transfers(&self) -> Vec<Arc<Transfer>> {
        self.inner.all.lock().clone()
    }

    pub fn successes(&self) -> Vec<Arc<Transfer>> {
        self.inner.successes.lock().clone()
    }

    pub fn failures(&self) -> Vec<Arc<Transfer>> {
        self.inner.failures.lock().clone()
    }

    pub fn success_count(&self) -> usize {
        self.inner.successes.lock().len()
    }

    pub fn failure_count(&self) -> usize {
        self.inner.failures.lock().len()
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.inner.started_at.lock().map(|t| t.elapsed())
    }

    /// Aggregate bytes across this job's transfers.
    pub fn progress(&self) -> DownloadProgress {
        DownloadProgress {
            current: self.inner.current.load(Ordering::SeqCst).max(0) as u64,
            total: self.inner.total.load(Ordering::SeqCst).max(0) as u64,
            status: self.inner.status.lock().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::Verification;
    use std::fs;
    use tempfile::TempDir;

    const HELLO_SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";

    fn pool(size: usize) -> WorkerPool {
        WorkerPool::new(size, HttpClient::new().unwrap())
    }

    fn counting_listener(job: &DownloadJob) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        job.add_listener(Arc::new(move |_: &DownloadJob| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        count
    }

    #[test]
    fn test_empty_job_finishes_immediately() {
        let job = DownloadJob::new("Empty", false);
        let fired = counting_listener(&job);

        job.start_downloading(&pool(2)).unwrap();

        assert!(job.is_finished());
        assert!(job.is_complete());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cannot_add_after_start() {
        let job = DownloadJob::new("Frozen", false);
        job.start_downloading(&pool(1)).unwrap();

        let result = job.add_transfer(Transfer::new("http://h/a", "/tmp/a", Verification::Etag));
        assert!(matches!(result, Err(TransferError::AlreadyStarted(_))));
    }

    #[test]
    fn test_cannot_start_twice() {
        let job = DownloadJob::new("Twice", false);
        let pool = pool(1);
        job.start_downloading(&pool).unwrap();
        assert!(job.start_downloading(&pool).is_err());
    }

    #[test]
    fn test_unknown_sizes_assume_average() {
        let job = DownloadJob::new("Sizes", false);
        job.add_transfer(Transfer::new("http://h/a", "/tmp/a", Verification::Etag))
            .unwrap();
        job.add_transfer(
            Transfer::new("http://h/b", "/tmp/b", Verification::Etag).with_expected_size(100),
        )
        .unwrap();

        assert_eq!(job.progress().total, ASSUMED_AVERAGE_FILE_SIZE + 100);
        assert_eq!(job.progress().current, 0);
    }

    #[test]
    fn test_local_files_complete_without_network() {
        let temp = TempDir::new().unwrap();
        let job = DownloadJob::new("Local", false);
        let fired = counting_listener(&job);

        for name in ["a.jar", "b.jar", "c.jar"] {
            let path = temp.path().join(name);
            fs::write(&path, b"hello world").unwrap();
            job.add_transfer(
                Transfer::new(
                    "http://127.0.0.1:9/never",
                    path,
                    Verification::PreHashed {
                        sha1: HELLO_SHA1.to_string(),
                    },
                )
                .with_expected_size(11),
            )
            .unwrap();
        }

        job.start_downloading(&pool(4)).unwrap();
        assert!(job.wait_timeout(Duration::from_secs(10)));

        assert_eq!(job.success_count(), 3);
        assert_eq!(job.failure_count(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(job.progress().current, job.progress().total);
    }

    #[test]
    fn test_storage_failure_is_not_retried() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let temp = TempDir::new().unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"hello world").unwrap();
        let compressed = temp.path().join("compressed");
        fs::write(&compressed, encoder.finish().unwrap()).unwrap();
        let compressed_hash =
            crate::download::file_digest(&compressed, crate::download::HashAlgorithm::Sha1)
                .unwrap();

        // A regular file where a directory is needed makes the target unwritable
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let transfer = Transfer::new(
            "http://127.0.0.1:9/never",
            blocker.join("sub/obj"),
            Verification::ContentAddressed(crate::download::ObjectSpec {
                hash: HELLO_SHA1.to_string(),
                size: 11,
                compressed: Some(crate::download::CompressedSource {
                    url: "http://127.0.0.1:9/never.gz".to_string(),
                    path: compressed,
                    hash: compressed_hash,
                    size: 0,
                }),
                trust_size: true,
            }),
        );
        let job = DownloadJob::new("Storage", false);
        job.add_transfer(transfer).unwrap();

        job.start_downloading(&pool(1)).unwrap();
        assert!(job.wait_timeout(Duration::from_secs(10)));
        assert_eq!(job.failure_count(), 1);
        assert_eq!(job.failures()[0].attempts(), 1);
    }
}

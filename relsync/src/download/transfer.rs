//! A single file fetch unit.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::progress::ProgressCounter;
use super::verify::Verification;

/// Start and end instants of a transfer's lifetime in a job.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferTimes {
    /// When the first attempt began.
    pub started: Option<Instant>,
    /// When the transfer succeeded or was abandoned.
    pub finished: Option<Instant>,
}

/// One remote file to bring to a local path, verified by a [`Verification`].
#[derive(Debug)]
pub struct Transfer {
    url: String,
    target: PathBuf,
    verification: Verification,
    /// Expected size in bytes; 0 while unknown.
    expected_size: AtomicU64,
    attempts: AtomicU32,
    progress: Arc<ProgressCounter>,
    times: Mutex<TransferTimes>,
}

impl Transfer {
    pub fn new(url: impl Into<String>, target: impl Into<PathBuf>, verification: Verification) -> Self {
        Self {
            url: url.into(),
            target: target.into(),
            verification,
            expected_size: AtomicU64::new(0),
            attempts: AtomicU32::new(0),
            progress: Arc::new(ProgressCounter::new(0)),
            times: Mutex::new(TransferTimes::default()),
        }
    }

    /// Set the size the catalog advertises for this file.
    pub fn with_expected_size(self, size: u64) -> Self {
        self.expected_size.store(size, Ordering::SeqCst);
        self.progress.set_total(size);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn verification(&self) -> &Verification {
        &self.verification
    }

    pub fn progress(&self) -> &Arc<ProgressCounter> {
        &self.progress
    }

    pub fn expected_size(&self) -> u64 {
        self.expected_size.load(Ordering::SeqCst)
    }

    /// Adopt the server's Content-Length if no size was known up front.
    pub fn update_expected_size(&self, content_length: Option<u64>) {
        if let Some(len) = content_length {
            if self
                .expected_size
                .compare_exchange(0, len, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                self.progress.set_total(len);
            }
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Count a new attempt and return the attempt number (1-based).
    pub(crate) fn begin_attempt(&self) -> u32 {
        let mut times = self.times.lock();
        if times.started.is_none() {
            times.started = Some(Instant::now());
        }
        self.attempts.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn mark_finished(&self) {
        self.times.lock().finished = Some(Instant::now());
    }

    pub fn times(&self) -> TransferTimes {
        *self.times.lock()
    }

    /// Time from first attempt to completion, or to now if still running.
    pub fn elapsed(&self) -> Option<Duration> {
        let times = self.times();
        let started = times.started?;
        Some(times.finished.unwrap_or_else(Instant::now) - started)
    }

    /// File name of the target, for status lines.
    pub fn display_name(&self) -> String {
        self.target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_size_only_adopted_when_unknown() {
        let transfer = Transfer::new("http://h/a.jar", "/tmp/a.jar", Verification::Sidecar);
        transfer.update_expected_size(Some(100));
        assert_eq!(transfer.expected_size(), 100);
        assert_eq!(transfer.progress().total(), 100);

        transfer.update_expected_size(Some(999));
        assert_eq!(transfer.expected_size(), 100);
    }

    #[test]
    fn test_known_size_is_kept() {
        let transfer = Transfer::new("http://h/a.jar", "/tmp/a.jar", Verification::Etag)
            .with_expected_size(42);
        transfer.update_expected_size(Some(7));
        assert_eq!(transfer.expected_size(), 42);
    }

    #[test]
    fn test_attempts_and_times() {
        let transfer = Transfer::new("http://h/a.jar", "/tmp/x/a.jar", Verification::Sidecar);
        assert!(transfer.elapsed().is_none());
        assert_eq!(transfer.begin_attempt(), 1);
        assert_eq!(transfer.begin_attempt(), 2);
        assert_eq!(transfer.attempts(), 2);
        transfer.mark_finished();
        assert!(transfer.times().finished.is_some());
        assert!(transfer.elapsed().is_some());
        assert_eq!(transfer.display_name(), "a.jar");
    }
}

//! Error types for verified transfers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Errors that can occur while fetching and verifying a single file.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// The request could not be sent or the body could not be read.
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The request exceeded its connect or read timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The server answered with a status the strategy cannot use.
    #[error("server responded with {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Downloaded or inflated content did not hash to the expected value.
    #[error("hash mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// Failed to read a local file.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a local file.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Transfers were added to a job that is already running.
    #[error("job '{0}' has already started")]
    AlreadyStarted(String),

    /// The worker pool no longer accepts work.
    #[error("worker pool has been shut down")]
    PoolShutDown,
}

impl TransferError {
    /// True for hash and ETag mismatches.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. })
    }

    /// True for local filesystem failures, which retrying cannot fix.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::WriteFailed { .. } | Self::CreateDirFailed { .. }
        )
    }

    /// True for network failures that a later attempt may get past.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Request { .. } | Self::Timeout { .. } | Self::HttpStatus { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let mismatch = TransferError::ChecksumMismatch {
            path: PathBuf::from("a.jar"),
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        assert!(mismatch.is_integrity());
        assert!(!mismatch.is_storage());
        assert!(!mismatch.is_transient());

        let write = TransferError::WriteFailed {
            path: PathBuf::from("/ro/a.jar"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        };
        assert!(write.is_storage());

        let timeout = TransferError::Timeout {
            url: "http://example.com/a".to_string(),
        };
        assert!(timeout.is_transient());
    }

    #[test]
    fn test_display_is_lowercase_and_contextual() {
        let err = TransferError::HttpStatus {
            url: "http://example.com/a.jar".to_string(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "server responded with 404 for http://example.com/a.jar"
        );
    }
}

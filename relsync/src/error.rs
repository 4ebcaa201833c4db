//! Errors surfaced by catalogs and the sync manager.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::assets::StoreError;
use crate::download::TransferError;
use crate::version::ResolveError;

/// Result type for catalog and sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// No catalog knows a release with this id.
    #[error("unknown release '{0}'")]
    UnknownRelease(String),

    /// The operation needs a locally installed release.
    #[error("release '{0}' is not installed")]
    NotInstalled(String),

    /// Another sync of the same release is in progress.
    #[error("release '{0}' is already being downloaded")]
    Busy(String),

    /// The remote catalog document could not be used.
    #[error("invalid release manifest from {url}: {reason}")]
    InvalidManifest { url: String, reason: String },

    /// A release id that cannot name a directory under `versions/`.
    #[error("invalid release id '{0}'")]
    InvalidReleaseId(String),

    /// A download job ended with blocking failures.
    #[error("failed to sync {id}: {reason}")]
    SyncFailed { id: String, reason: String },

    /// Required files are still missing after syncing.
    #[error("release {id} is missing {missing} required file(s)")]
    MissingFiles { id: String, missing: usize },

    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    #[error("failed to remove {}: {source}", path.display())]
    RemoveFailed { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Whether this error came from a network request.
    pub fn is_network(&self) -> bool {
        match self {
            Self::Transfer(e) => e.is_transient(),
            Self::Store(StoreError::Transfer(e)) => e.is_transient(),
            _ => false,
        }
    }
}

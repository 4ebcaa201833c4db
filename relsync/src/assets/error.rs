//! Asset store errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::download::TransferError;

/// Result type for asset store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// An asset index could not be parsed.
    #[error("invalid asset index {id}: {reason}")]
    InvalidIndex { id: String, reason: String },

    /// The fetched index does not hash to the value the release declares.
    #[error("asset index {id} hash mismatch: expected {expected}, got {actual}")]
    IndexHashMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    /// A virtual tree needs an object that is not in the store.
    #[error("object {hash} for {logical_path} is missing from the store")]
    MissingObject { hash: String, logical_path: String },

    /// A name from an index would resolve outside its directory.
    #[error("refusing unsafe {kind} '{name}': {reason}")]
    UnsafeName {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

//! CLI error type.

use relsync::config::ConfigError;
use relsync::SyncError;
use thiserror::Error;

/// Errors reported to the user as a single line.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

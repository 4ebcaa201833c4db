//! Errors raised while parsing and resolving release descriptors.

use thiserror::Error;

/// Result type for descriptor resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Fatal problems with a release's descriptor chain.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The `inheritsFrom` chain loops back on itself.
    #[error("circular dependency detected while resolving {id}")]
    CircularDependency { id: String },

    /// A parent named by `inheritsFrom` could not be obtained.
    #[error("release {id} inherits from {parent}, which is unavailable: {reason}")]
    MissingParent {
        id: String,
        parent: String,
        reason: String,
    },

    /// No catalog could supply the descriptor.
    #[error("release {id} is unavailable: {reason}")]
    Unavailable { id: String, reason: String },

    /// The descriptor could not be parsed or is missing required data.
    #[error("malformed descriptor for {id}: {reason}")]
    Malformed { id: String, reason: String },

    /// A library name is not a `group:artifact:version` coordinate.
    #[error("invalid library name '{0}'")]
    InvalidLibraryName(String),

    /// The release cannot run in this environment.
    #[error("release {id} is incompatible with this system: {reason}")]
    Incompatible { id: String, reason: String },

    /// The release needs a newer launcher format than this one supports.
    #[error("release {id} requires launcher format {required}, this launcher supports {supported}")]
    LauncherTooOld {
        id: String,
        required: u32,
        supported: u32,
    },
}

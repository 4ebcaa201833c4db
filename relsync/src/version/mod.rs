//! Release descriptors and their inheritance.
//!
//! # Overview
//!
//! - [`ReleaseDescriptor`]: the complete metadata for one installable release
//! - [`PartialRelease`]: a catalog listing entry pointing at a descriptor
//! - [`LibraryRef`]: a library coordinate with download and native metadata
//! - [`CompatibilityRule`]: ordered allow/disallow rules evaluated against a
//!   [`LaunchEnvironment`](crate::platform::LaunchEnvironment)
//! - [`resolve`]: flattens an `inheritsFrom` chain into one descriptor
//!
//! # Example
//!
//! ```ignore
//! use relsync::version::{resolve, ReleaseDescriptor};
//!
//! let child = ReleaseDescriptor::from_json(&json, "1.12.2-forge")?;
//! let resolved = resolve(child, &|id: &str| local.load(id))?;
//! let files = resolved.required_files(&env)?;
//! ```

mod argument;
mod descriptor;
mod error;
mod library;
mod resolve;
mod rule;

pub use argument::{substitute, Argument, ArgumentKind};
pub use descriptor::{
    AssetIndexInfo, DownloadInfo, PartialRelease, ReleaseDescriptor, ReleaseInfo, ReleaseType,
    LEGACY_ASSET_INDEX_BASE, LEGACY_ASSET_INDEX_ID,
};
pub use error::{ResolveError, ResolveResult};
pub use library::{ArtifactDownload, ArtifactSource, Coordinate, ExtractRules, LibraryDownloads, LibraryRef};
pub use resolve::{merge, resolve, ReleaseLookup};
pub use rule::{rules_allow, CompatibilityRule, OsRestriction, RuleAction, RulePattern};

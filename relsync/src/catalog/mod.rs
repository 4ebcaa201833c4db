//! Local and remote release catalogs.
//!
//! - [`LocalCatalog`] reads and writes descriptors under `versions/`
//! - [`RemoteCatalog`] lists published releases and fetches descriptors
//! - [`SyncInfo`] relates the two views of one release

mod local;
mod remote;
mod sync_info;

pub use local::LocalCatalog;
pub use remote::{RemoteCatalog, DEFAULT_MANIFEST_URL};
pub use sync_info::{compare_newest_first, ReleaseSource, SyncInfo, VersionFilter, DEFAULT_MAX_COUNT};

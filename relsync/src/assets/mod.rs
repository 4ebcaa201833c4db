//! Content-addressed asset storage.
//!
//! Asset indexes map logical paths such as `sound/boop.ogg` to objects
//! stored once under their SHA-1. Releases that predate the hashed layout
//! get a "virtual" copy of the tree with the original names, rebuilt before
//! each launch and aged out by [`reclaim`](crate::reclaim).
//!
//! Object downloads go through the shared
//! [`WorkerPool`](crate::download::WorkerPool) like every other transfer;
//! this module only decides which objects are missing and how each one is
//! verified.

mod error;
mod manifest;
mod store;

pub use error::{StoreError, StoreResult};
pub use manifest::{AssetManifest, AssetObject};
pub use store::{AssetStore, DEFAULT_RESOURCE_BASE_URL, LAST_USED_MARKER};

//! The hash-named object store under `assets/`.
//!
//! ```text
//! assets/
//! ├── indexes/<index id>.json
//! ├── objects/<hh>/<hash>          hh = first two hex digits of hash
//! └── virtual/<index id>/
//!     ├── .lastused                RFC 3339 timestamp of the last launch
//!     └── <logical path>           copy of objects/<hh>/<hash>
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sha1::{Digest, Sha1};
use tracing::{debug, info, warn};

use super::error::{StoreError, StoreResult};
use super::manifest::{AssetManifest, AssetObject};
use crate::download::{digests_match, CompressedSource, HttpClient, ObjectSpec, Transfer, Verification};
use crate::paths::{is_object_hash, is_safe_name, relative_path_problem};
use crate::version::AssetIndexInfo;

/// Default host serving asset objects.
pub const DEFAULT_RESOURCE_BASE_URL: &str = "http://resources.download.minecraft.net/";

/// Marker file in each virtual root holding its last use time.
pub const LAST_USED_MARKER: &str = ".lastused";

/// Content-addressed asset storage rooted at an `assets/` directory.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
    base_url: String,
    trust_size: bool,
}

impl AssetStore {
    /// Create a store. Existing objects of the right size are trusted
    /// without hashing unless [`with_size_trust`](Self::with_size_trust)
    /// turns that off.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
            trust_size: true,
        }
    }

    pub fn with_size_trust(mut self, trust_size: bool) -> Self {
        self.trust_size = trust_size;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn trusts_size(&self) -> bool {
        self.trust_size
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.root.join("objects")
    }

    pub fn indexes_dir(&self) -> PathBuf {
        self.root.join("indexes")
    }

    pub fn virtual_dir(&self) -> PathBuf {
        self.root.join("virtual")
    }

    pub fn virtual_root(&self, index_id: &str) -> PathBuf {
        self.virtual_dir().join(index_id)
    }

    pub fn index_path(&self, index_id: &str) -> PathBuf {
        self.indexes_dir().join(format!("{index_id}.json"))
    }

    pub fn object_path(&self, hash: &str) -> PathBuf {
        self.objects_dir().join(hash_path(hash))
    }

    pub fn object_url(&self, hash: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/{}", hash_path(hash))
    }

    /// Read a previously saved index.
    pub fn load_index(&self, index_id: &str) -> StoreResult<AssetManifest> {
        check_index_id(index_id)?;
        let path = self.index_path(index_id);
        let json = fs::read_to_string(&path).map_err(|source| StoreError::ReadFailed { path, source })?;
        AssetManifest::from_json(&json, index_id)
    }

    /// Download an index, save it under `indexes/` and parse it.
    ///
    /// When the server cannot be reached a previously saved copy is used.
    pub fn fetch_index(&self, http: &HttpClient, info: &AssetIndexInfo) -> StoreResult<AssetManifest> {
        check_index_id(&info.id)?;
        let json = match http.get_text(&info.url) {
            Ok(json) => json,
            Err(e) if self.index_path(&info.id).is_file() => {
                warn!(index = %info.id, error = %e, "Could not fetch asset index, using saved copy");
                return self.load_index(&info.id);
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(expected) = &info.sha1 {
            let actual = format!("{:x}", Sha1::digest(json.as_bytes()));
            if !digests_match(expected, &actual) {
                return Err(StoreError::IndexHashMismatch {
                    id: info.id.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        let manifest = AssetManifest::from_json(&json, &info.id)?;
        let path = self.index_path(&info.id);
        create_dir(&self.indexes_dir())?;
        fs::write(&path, &json).map_err(|source| StoreError::WriteFailed { path, source })?;
        debug!(index = %info.id, objects = manifest.objects.len(), "Saved asset index");
        Ok(manifest)
    }

    /// How an object is verified, including its gzip alternative.
    pub fn object_spec(&self, object: &AssetObject) -> ObjectSpec {
        ObjectSpec {
            hash: object.hash.clone(),
            size: object.size,
            compressed: object
                .compressed()
                .filter(|(hash, _)| is_object_hash(hash))
                .map(|(hash, size)| CompressedSource {
                    url: self.object_url(hash),
                    path: self.object_path(hash),
                    hash: hash.to_string(),
                    size,
                }),
            trust_size: self.trust_size,
        }
    }

    pub fn object_transfer(&self, object: &AssetObject) -> Transfer {
        let spec = self.object_spec(object);
        let size = spec.compressed.as_ref().map_or(object.size, |c| c.size);
        Transfer::new(
            self.object_url(&object.hash),
            self.object_path(&object.hash),
            Verification::ContentAddressed(spec),
        )
        .with_expected_size(size)
    }

    /// Transfers for every distinct object not already valid on disk.
    ///
    /// Objects whose hash is not a SHA-1 are skipped.
    pub fn missing_transfers(&self, manifest: &AssetManifest) -> Vec<Transfer> {
        manifest
            .unique_objects()
            .into_iter()
            .filter(|(logical_path, object)| match check_hash(&object.hash, logical_path) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Skipping asset");
                    false
                }
            })
            .map(|(_, object)| self.object_transfer(object))
            .filter(|transfer| !transfer.verification().is_satisfied_locally(transfer.target()))
            .collect()
    }

    /// Materialize the path-named tree of a virtual index.
    ///
    /// Existing files are left alone. Entries whose path would land outside
    /// the virtual root are skipped. Returns the virtual root, or `None` for
    /// indexes that are not virtual.
    pub fn reconstruct_virtual(&self, index_id: &str, manifest: &AssetManifest) -> StoreResult<Option<PathBuf>> {
        if !manifest.is_virtual {
            return Ok(None);
        }
        check_index_id(index_id)?;

        let root = self.virtual_root(index_id);
        info!(root = %root.display(), "Reconstructing virtual assets");

        for (logical_path, object) in &manifest.objects {
            if let Err(e) = check_entry(logical_path, &object.hash) {
                warn!(index = index_id, error = %e, "Skipping asset");
                continue;
            }
            let target = root.join(logical_path);
            if target.is_file() {
                continue;
            }
            let original = self.object_path(&object.hash);
            if !original.is_file() {
                return Err(StoreError::MissingObject {
                    hash: object.hash.clone(),
                    logical_path: logical_path.clone(),
                });
            }
            if let Some(parent) = target.parent() {
                create_dir(parent)?;
            }
            fs::copy(&original, &target).map_err(|source| StoreError::WriteFailed {
                path: target.clone(),
                source,
            })?;
        }

        create_dir(&root)?;
        let marker = root.join(LAST_USED_MARKER);
        fs::write(&marker, Utc::now().to_rfc3339()).map_err(|source| StoreError::WriteFailed {
            path: marker,
            source,
        })?;
        Ok(Some(root))
    }

    /// Directory the game should read assets from for this index.
    pub fn asset_root(&self, index_id: &str, manifest: &AssetManifest) -> PathBuf {
        if manifest.is_virtual {
            self.virtual_root(index_id)
        } else {
            self.root.clone()
        }
    }
}

/// `<hh>/<hash>`
fn hash_path(hash: &str) -> String {
    let prefix = hash.get(..2).unwrap_or(hash);
    format!("{prefix}/{hash}")
}

fn check_index_id(index_id: &str) -> StoreResult<()> {
    if is_safe_name(index_id) {
        return Ok(());
    }
    Err(StoreError::UnsafeName {
        kind: "asset index id",
        name: index_id.to_string(),
        reason: relative_path_problem(index_id).unwrap_or("must be a single path segment"),
    })
}

fn check_hash(hash: &str, logical_path: &str) -> StoreResult<()> {
    if is_object_hash(hash) {
        return Ok(());
    }
    Err(StoreError::UnsafeName {
        kind: "object hash",
        name: format!("{hash} ({logical_path})"),
        reason: "must be 40 lower-case hex digits",
    })
}

fn check_entry(logical_path: &str, hash: &str) -> StoreResult<()> {
    if let Some(reason) = relative_path_problem(logical_path) {
        return Err(StoreError::UnsafeName {
            kind: "asset path",
            name: logical_path.to_string(),
            reason,
        });
    }
    check_hash(hash, logical_path)
}

fn create_dir(path: &Path) -> StoreResult<()> {
    fs::create_dir_all(path).map_err(|source| StoreError::CreateDirFailed {
        path: path.to_path_buf(),
        source,
    })
}

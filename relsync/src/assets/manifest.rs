//! Asset index documents.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{StoreError, StoreResult};
use crate::paths::{is_object_hash, relative_path_problem};

/// One object referenced by an asset index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reconstruct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_size: Option<u64>,
}

impl AssetObject {
    pub fn new(hash: impl Into<String>, size: u64) -> Self {
        Self {
            hash: hash.into(),
            size,
            reconstruct: false,
            compressed_hash: None,
            compressed_size: None,
        }
    }

    /// Hash and size of the gzip copy, when the index declares one.
    pub fn compressed(&self) -> Option<(&str, u64)> {
        match (&self.compressed_hash, self.compressed_size) {
            (Some(hash), Some(size)) => Some((hash.as_str(), size)),
            _ => None,
        }
    }
}

/// Mapping of logical asset paths to content-addressed objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifest {
    #[serde(default)]
    pub objects: BTreeMap<String, AssetObject>,
    /// Whether a path-named copy of the objects must be built before launch.
    #[serde(rename = "virtual", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_virtual: bool,
}

impl AssetManifest {
    /// Parse an index, dropping entries whose path or hash cannot be used
    /// safely on disk.
    pub fn from_json(json: &str, id: &str) -> StoreResult<Self> {
        let mut manifest: Self = serde_json::from_str(json).map_err(|e| StoreError::InvalidIndex {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        manifest.sanitize(id);
        Ok(manifest)
    }

    fn sanitize(&mut self, id: &str) {
        self.objects.retain(|logical_path, object| {
            object.hash.make_ascii_lowercase();
            if let Some(reason) = relative_path_problem(logical_path) {
                warn!(index = id, path = %logical_path, reason, "Skipping asset with unsafe path");
                return false;
            }
            if !is_object_hash(&object.hash) {
                warn!(index = id, path = %logical_path, hash = %object.hash, "Skipping asset with invalid hash");
                return false;
            }
            if let Some(compressed) = object.compressed_hash.as_mut() {
                compressed.make_ascii_lowercase();
                if !is_object_hash(compressed) {
                    warn!(index = id, path = %logical_path, hash = %compressed, "Ignoring invalid compressed hash");
                    object.compressed_hash = None;
                    object.compressed_size = None;
                }
            }
            true
        });
    }

    /// Each distinct object once, paired with one logical path naming it.
    pub fn unique_objects(&self) -> Vec<(&str, &AssetObject)> {
        let mut seen = HashSet::new();
        self.objects
            .iter()
            .filter(|(_, object)| seen.insert(object.hash.to_ascii_lowercase()))
            .map(|(path, object)| (path.as_str(), object))
            .collect()
    }

    /// Lower-case hashes of every plain and compressed object referenced.
    pub fn referenced_hashes(&self) -> HashSet<String> {
        let mut hashes = HashSet::new();
        for object in self.objects.values() {
            hashes.insert(object.hash.to_ascii_lowercase());
            if let Some(compressed) = &object.compressed_hash {
                hashes.insert(compressed.to_ascii_lowercase());
            }
        }
        hashes
    }

    /// Sum of the plain object sizes, counting each object once.
    pub fn total_size(&self) -> u64 {
        self.unique_objects().iter().map(|(_, o)| o.size).sum()
    }
}

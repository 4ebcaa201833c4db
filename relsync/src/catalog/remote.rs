//! The remote release manifest.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::download::HttpClient;
use crate::error::{SyncError, SyncResult};
use crate::paths::is_safe_name;
use crate::version::{PartialRelease, ReleaseDescriptor, ReleaseType};

/// Default location of the release manifest.
pub const DEFAULT_MANIFEST_URL: &str = "https://launchermeta.mojang.com/mc/game/version_manifest.json";

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    latest: BTreeMap<String, String>,
    #[serde(default)]
    versions: Vec<PartialRelease>,
}

/// Listing of every published release, with complete descriptors fetched
/// lazily and cached.
#[derive(Debug)]
pub struct RemoteCatalog {
    manifest_url: String,
    releases: Vec<PartialRelease>,
    by_id: HashMap<String, usize>,
    latest: BTreeMap<ReleaseType, String>,
    complete: HashMap<String, ReleaseDescriptor>,
}

impl RemoteCatalog {
    pub fn new(manifest_url: impl Into<String>) -> Self {
        Self {
            manifest_url: manifest_url.into(),
            releases: Vec::new(),
            by_id: HashMap::new(),
            latest: BTreeMap::new(),
            complete: HashMap::new(),
        }
    }

    pub fn manifest_url(&self) -> &str {
        &self.manifest_url
    }

    /// Fetch the manifest and replace the listing.
    pub fn refresh(&mut self, http: &HttpClient) -> SyncResult<()> {
        let json = http.get_text(&self.manifest_url)?;
        self.load_manifest(&json)?;
        info!(url = %self.manifest_url, count = self.releases.len(), "Refreshed remote releases");
        Ok(())
    }

    /// Replace the listing with a manifest document.
    pub fn load_manifest(&mut self, json: &str) -> SyncResult<()> {
        let raw: RawManifest = serde_json::from_str(json).map_err(|e| SyncError::InvalidManifest {
            url: self.manifest_url.clone(),
            reason: e.to_string(),
        })?;

        self.releases = raw
            .versions
            .into_iter()
            .filter(|release| {
                let usable = is_safe_name(&release.id);
                if !usable {
                    warn!(id = %release.id, "Ignoring remote release with unusable id");
                }
                usable
            })
            .collect();
        self.by_id = self
            .releases
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        self.latest = raw
            .latest
            .into_iter()
            .filter_map(|(name, id)| ReleaseType::from_name(&name).map(|t| (t, id)))
            .filter(|(_, id)| self.by_id.contains_key(id))
            .collect();
        self.complete.clear();
        Ok(())
    }

    pub fn releases(&self) -> &[PartialRelease] {
        &self.releases
    }

    pub fn get(&self, id: &str) -> Option<&PartialRelease> {
        self.by_id.get(id).map(|&i| &self.releases[i])
    }

    pub fn latest(&self, release_type: ReleaseType) -> Option<&PartialRelease> {
        self.latest.get(&release_type).and_then(|id| self.get(id))
    }

    /// The complete descriptor of a listed release, fetched on first use.
    pub fn complete_release(&mut self, http: &HttpClient, id: &str) -> SyncResult<ReleaseDescriptor> {
        if let Some(cached) = self.complete.get(id) {
            return Ok(cached.clone());
        }
        let partial = self
            .get(id)
            .ok_or_else(|| SyncError::UnknownRelease(id.to_string()))?;

        debug!(id, url = %partial.url, "Fetching complete descriptor");
        let json = http.get_text(&partial.url)?;
        let descriptor = ReleaseDescriptor::from_json(&json, id)?;
        self.complete.insert(id.to_string(), descriptor.clone());
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "latest": {"release": "1.20.1", "snapshot": "23w31a", "nightly": "n1"},
        "versions": [
            {"id": "23w31a", "type": "snapshot", "url": "https://h/23w31a.json",
             "time": "2023-08-01T00:00:00+00:00", "releaseTime": "2023-08-01T00:00:00+00:00"},
            {"id": "1.20.1", "type": "release", "url": "https://h/1.20.1.json",
             "time": "2023-06-12T13:25:51+00:00", "releaseTime": "2023-06-12T13:25:51+00:00"},
            {"id": "n1", "type": "nightly", "url": "https://h/n1.json"}
        ]
    }"#;

    #[test]
    fn test_load_manifest() {
        let mut catalog = RemoteCatalog::new("https://h/manifest.json");
        catalog.load_manifest(MANIFEST).unwrap();

        assert_eq!(catalog.releases().len(), 3);
        assert_eq!(catalog.latest(ReleaseType::Stable).unwrap().id, "1.20.1");
        assert_eq!(catalog.latest(ReleaseType::Preview).unwrap().id, "23w31a");
        assert_eq!(catalog.get("n1").unwrap().release_type, None);
    }

    #[test]
    fn test_releases_with_unusable_ids_are_ignored() {
        let mut catalog = RemoteCatalog::new("https://h/manifest.json");
        catalog
            .load_manifest(
                r#"{
                    "latest": {"release": "../../evil"},
                    "versions": [
                        {"id": "../../evil", "type": "release", "url": "https://h/evil.json"},
                        {"id": "1.0", "type": "release", "url": "https://h/1.0.json"}
                    ]
                }"#,
            )
            .unwrap();
        assert_eq!(catalog.releases().len(), 1);
        assert!(catalog.get("../../evil").is_none());
        assert!(catalog.latest(ReleaseType::Stable).is_none());
    }

    #[test]
    fn test_invalid_manifest() {
        let mut catalog = RemoteCatalog::new("https://h/manifest.json");
        assert!(matches!(
            catalog.load_manifest("not json"),
            Err(SyncError::InvalidManifest { .. })
        ));
    }

    #[test]
    fn test_unknown_release() {
        let mut catalog = RemoteCatalog::new("https://h/manifest.json");
        catalog.load_manifest(MANIFEST).unwrap();
        let http = HttpClient::new().unwrap();
        assert!(matches!(
            catalog.complete_release(&http, "missing"),
            Err(SyncError::UnknownRelease(_))
        ));
    }
}

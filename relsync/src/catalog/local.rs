//! Releases installed under `versions/<id>/<id>.json`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::paths::is_safe_name;
use crate::platform::LaunchEnvironment;
use crate::version::{ReleaseDescriptor, ReleaseType};

/// Descriptors stored in a game directory, as authored.
#[derive(Debug)]
pub struct LocalCatalog {
    base_dir: PathBuf,
    releases: BTreeMap<String, ReleaseDescriptor>,
    latest: BTreeMap<ReleaseType, String>,
}

impl LocalCatalog {
    /// Open the catalog rooted at `base_dir`, creating `versions/` if needed.
    ///
    /// Call [`refresh`](Self::refresh) to load the installed descriptors.
    pub fn open(base_dir: impl Into<PathBuf>) -> SyncResult<Self> {
        let base_dir = base_dir.into();
        let versions = base_dir.join("versions");
        fs::create_dir_all(&versions).map_err(|source| SyncError::CreateDirFailed {
            path: versions,
            source,
        })?;
        Ok(Self {
            base_dir,
            releases: BTreeMap::new(),
            latest: BTreeMap::new(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.base_dir.join("versions")
    }

    pub fn descriptor_path(&self, id: &str) -> PathBuf {
        self.versions_dir().join(id).join(format!("{id}.json"))
    }

    /// Rescan `versions/`.
    ///
    /// Unreadable descriptors, descriptors whose id does not match their
    /// directory, and descriptors of unknown type are skipped with a warning.
    pub fn refresh(&mut self) -> SyncResult<()> {
        self.releases.clear();
        self.latest.clear();

        let versions_dir = self.versions_dir();
        let entries = match fs::read_dir(&versions_dir) {
            Ok(entries) => entries,
            Err(source) => {
                return Err(SyncError::ReadFailed {
                    path: versions_dir,
                    source,
                })
            }
        };

        for entry in entries.filter_map(|e| e.ok()) {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            let path = self.descriptor_path(&id);
            if !path.is_file() {
                continue;
            }

            match load_descriptor(&path, &id) {
                Ok(descriptor) if descriptor.id != id => {
                    warn!(path = %path.display(), found = %descriptor.id, "Ignoring descriptor with mismatched id");
                }
                Ok(descriptor) if descriptor.release_type.is_none() => {
                    warn!(path = %path.display(), "Ignoring descriptor with unknown release type");
                }
                Ok(descriptor) => {
                    self.releases.insert(id, descriptor);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Couldn't load local release"),
            }
        }

        self.recompute_latest();
        debug!(count = self.releases.len(), "Scanned local releases");
        Ok(())
    }

    fn recompute_latest(&mut self) {
        self.latest.clear();
        for release in self.releases.values() {
            let Some(release_type) = release.release_type else {
                continue;
            };
            let newer = match self.latest.get(&release_type).and_then(|id| self.releases.get(id)) {
                Some(current) => release.updated_time > current.updated_time,
                None => true,
            };
            if newer {
                self.latest.insert(release_type, release.id.clone());
            }
        }
    }

    pub fn releases(&self) -> impl Iterator<Item = &ReleaseDescriptor> {
        self.releases.values()
    }

    pub fn get(&self, id: &str) -> Option<&ReleaseDescriptor> {
        self.releases.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.releases.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Most recently updated installed release of a type.
    pub fn latest(&self, release_type: ReleaseType) -> Option<&ReleaseDescriptor> {
        self.latest.get(&release_type).and_then(|id| self.releases.get(id))
    }

    /// Write the authored form of `descriptor` and track it.
    pub fn save(&mut self, descriptor: &ReleaseDescriptor) -> SyncResult<()> {
        let savable = descriptor.savable_form();
        check_id(&savable.id)?;
        let json = savable.to_savable_json()?;
        let path = self.descriptor_path(&savable.id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SyncError::CreateDirFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, json).map_err(|source| SyncError::WriteFailed {
            path: path.clone(),
            source,
        })?;

        let mut stored = savable.clone();
        stored.set_synced(true);
        self.releases.insert(stored.id.clone(), stored);
        self.recompute_latest();
        info!(id = %savable.id, path = %path.display(), "Saved release descriptor");
        Ok(())
    }

    /// Forget a release and delete `versions/<id>/`.
    pub fn uninstall(&mut self, id: &str) -> SyncResult<()> {
        check_id(id)?;
        self.releases.remove(id);
        self.recompute_latest();

        let dir = self.versions_dir().join(id);
        if dir.is_dir() {
            fs::remove_dir_all(&dir).map_err(|source| SyncError::RemoveFailed { path: dir, source })?;
        }
        info!(id, "Uninstalled release");
        Ok(())
    }

    /// Required files of `descriptor` that are not present locally.
    pub fn missing_files(&self, descriptor: &ReleaseDescriptor, env: &LaunchEnvironment) -> SyncResult<Vec<PathBuf>> {
        Ok(descriptor
            .required_files(env)?
            .into_iter()
            .filter(|file| !self.base_dir.join(file).is_file())
            .collect())
    }

    /// Whether every required file of `descriptor` is present.
    pub fn has_all_files(&self, descriptor: &ReleaseDescriptor, env: &LaunchEnvironment) -> bool {
        self.missing_files(descriptor, env)
            .map(|missing| missing.is_empty())
            .unwrap_or(false)
    }
}

fn check_id(id: &str) -> SyncResult<()> {
    if is_safe_name(id) {
        Ok(())
    } else {
        Err(SyncError::InvalidReleaseId(id.to_string()))
    }
}

fn load_descriptor(path: &Path, id: &str) -> SyncResult<ReleaseDescriptor> {
    let json = fs::read_to_string(path).map_err(|source| SyncError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let mut descriptor = ReleaseDescriptor::from_json(&json, id)?;
    descriptor.set_synced(true);
    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::OperatingSystem;
    use tempfile::TempDir;

    fn write_descriptor(dir: &Path, folder: &str, json: &str) {
        let path = dir.join("versions").join(folder);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join(format!("{folder}.json")), json).unwrap();
    }

    fn env() -> LaunchEnvironment {
        LaunchEnvironment::new(OperatingSystem::Linux, "6.1", "x86_64")
    }

    #[test]
    fn test_refresh_skips_invalid_entries() {
        let dir = TempDir::new().unwrap();
        write_descriptor(dir.path(), "1.0", r#"{"id": "1.0", "type": "release", "time": "2020-01-01T00:00:00Z"}"#);
        write_descriptor(dir.path(), "renamed", r#"{"id": "other", "type": "release"}"#);
        write_descriptor(dir.path(), "weird", r#"{"id": "weird", "type": "nightly"}"#);
        write_descriptor(dir.path(), "broken", "{");

        let mut catalog = LocalCatalog::open(dir.path()).unwrap();
        catalog.refresh().unwrap();

        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("1.0"));
        assert!(catalog.get("1.0").unwrap().is_synced());
    }

    #[test]
    fn test_latest_per_type() {
        let dir = TempDir::new().unwrap();
        write_descriptor(dir.path(), "a", r#"{"id": "a", "type": "release", "time": "2020-01-01T00:00:00Z"}"#);
        write_descriptor(dir.path(), "b", r#"{"id": "b", "type": "release", "time": "2021-01-01T00:00:00Z"}"#);
        write_descriptor(dir.path(), "s", r#"{"id": "s", "type": "snapshot", "time": "2019-01-01T00:00:00Z"}"#);

        let mut catalog = LocalCatalog::open(dir.path()).unwrap();
        catalog.refresh().unwrap();

        assert_eq!(catalog.latest(ReleaseType::Stable).unwrap().id, "b");
        assert_eq!(catalog.latest(ReleaseType::Preview).unwrap().id, "s");
        assert!(catalog.latest(ReleaseType::Experimental).is_none());
    }

    #[test]
    fn test_save_and_uninstall() {
        let dir = TempDir::new().unwrap();
        let mut catalog = LocalCatalog::open(dir.path()).unwrap();

        let mut release = ReleaseDescriptor::new("1.2");
        release.release_type = Some(ReleaseType::Stable);
        catalog.save(&release).unwrap();

        assert!(catalog.descriptor_path("1.2").is_file());
        assert!(catalog.get("1.2").unwrap().is_synced());

        let mut reopened = LocalCatalog::open(dir.path()).unwrap();
        reopened.refresh().unwrap();
        assert!(reopened.contains("1.2"));

        catalog.uninstall("1.2").unwrap();
        assert!(!catalog.contains("1.2"));
        assert!(!dir.path().join("versions/1.2").exists());
    }

    #[test]
    fn test_ids_must_stay_inside_versions() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("game");
        fs::create_dir_all(&base).unwrap();
        fs::create_dir_all(dir.path().join("keep")).unwrap();
        let mut catalog = LocalCatalog::open(&base).unwrap();

        let release = ReleaseDescriptor::new("../escaped");
        assert!(matches!(catalog.save(&release), Err(SyncError::InvalidReleaseId(_))));
        assert!(!base.join("escaped").exists());

        assert!(matches!(catalog.uninstall("../../keep"), Err(SyncError::InvalidReleaseId(_))));
        assert!(dir.path().join("keep").is_dir());
    }

    #[test]
    fn test_has_all_files() {
        let dir = TempDir::new().unwrap();
        let catalog = LocalCatalog::open(dir.path()).unwrap();
        let release = ReleaseDescriptor::new("1.3");

        assert!(!catalog.has_all_files(&release, &env()));
        assert_eq!(
            catalog.missing_files(&release, &env()).unwrap(),
            vec![PathBuf::from("versions/1.3/1.3.jar")]
        );

        let jar = dir.path().join("versions/1.3/1.3.jar");
        fs::create_dir_all(jar.parent().unwrap()).unwrap();
        fs::write(&jar, b"jar").unwrap();
        assert!(catalog.has_all_files(&release, &env()));
    }
}

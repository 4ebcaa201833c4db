//! The sync manager: release listing, inheritance-aware installs and the
//! libraries-then-resources download flow.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::state::{ReleaseState, ReleaseStatus};
use crate::assets::AssetStore;
use crate::catalog::{compare_newest_first, LocalCatalog, ReleaseSource, RemoteCatalog, SyncInfo, VersionFilter};
use crate::config::SyncConfig;
use crate::download::{
    DownloadJob, DownloadProgress, HttpClient, ProgressListener, ProgressReporter, Transfer, Verification, WorkerPool,
};
use crate::error::{SyncError, SyncResult};
use crate::platform::LaunchEnvironment;
use crate::reclaim::{
    reclaim_orphaned_libraries, reclaim_orphaned_objects, reclaim_stale_virtuals, ReclaimReport,
    DEFAULT_VIRTUAL_RETENTION_DAYS,
};
use crate::version::{
    self, ArtifactSource, PartialRelease, ReleaseDescriptor, ReleaseInfo, ReleaseLookup, ReleaseType, ResolveError,
    ResolveResult,
};

/// Name of the blocking job holding libraries and the client jar.
pub const LIBRARIES_JOB: &str = "Version & Libraries";

/// Name of the best-effort asset job.
pub const RESOURCES_JOB: &str = "Resources";

/// Everything a launcher needs once a release is ready.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    /// The fully resolved descriptor.
    pub descriptor: ReleaseDescriptor,
    pub classpath: Vec<PathBuf>,
    /// Directory the game reads assets from.
    pub asset_root: PathBuf,
}

/// Keeps local releases in sync with the remote catalog.
///
/// All methods take `&self`; the catalogs and the state table sit behind
/// their own locks, and no lock is held across a download job.
pub struct SyncManager {
    config: SyncConfig,
    env: LaunchEnvironment,
    pool: WorkerPool,
    store: AssetStore,
    local: Mutex<LocalCatalog>,
    remote: Mutex<RemoteCatalog>,
    statuses: Mutex<HashMap<String, ReleaseStatus>>,
    active_jobs: Arc<Mutex<Vec<DownloadJob>>>,
}

impl std::fmt::Debug for SyncManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncManager")
            .field("base_dir", &self.config.base_dir)
            .field("manifest_url", &self.config.manifest_url)
            .field("workers", &self.pool.max_workers())
            .finish()
    }
}

impl SyncManager {
    /// Open the game directory and start the download pool.
    ///
    /// Nothing is read until [`refresh`](Self::refresh) is called.
    pub fn new(config: SyncConfig, env: LaunchEnvironment) -> SyncResult<Self> {
        let http = HttpClient::with_timeouts(config.connect_timeout, config.read_timeout)?;
        let pool = WorkerPool::new(config.max_workers, http);
        let store = AssetStore::new(config.assets_dir(), config.resource_base_url.clone())
            .with_size_trust(!config.verify_asset_hashes);
        let local = LocalCatalog::open(&config.base_dir)?;
        let remote = RemoteCatalog::new(config.manifest_url.clone());

        Ok(Self {
            config,
            env,
            pool,
            store,
            local: Mutex::new(local),
            remote: Mutex::new(remote),
            statuses: Mutex::new(HashMap::new()),
            active_jobs: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn environment(&self) -> &LaunchEnvironment {
        &self.env
    }

    pub fn asset_store(&self) -> &AssetStore {
        &self.store
    }

    fn http(&self) -> &HttpClient {
        self.pool.http().as_ref()
    }

    /// Rescan the local catalog, then fetch the remote one.
    ///
    /// The local view is usable even when the remote fetch fails; the
    /// remote error is still returned.
    pub fn refresh(&self) -> SyncResult<()> {
        info!("Refreshing local release list");
        self.local.lock().refresh()?;

        info!(url = %self.config.manifest_url, "Refreshing remote release list");
        let remote = self.remote.lock().refresh(self.http());
        self.reconcile_states();

        remote?;
        info!("Refresh complete");
        Ok(())
    }

    fn reconcile_states(&self) {
        let mut ids: HashSet<String> = self.local.lock().releases().map(|r| r.id.clone()).collect();
        ids.extend(self.remote.lock().releases().iter().map(|r| r.id.clone()));

        for id in ids {
            let state = ReleaseState::from_sync_info(&self.shallow_sync_info(&id));
            let mut statuses = self.statuses.lock();
            let status = statuses.entry(id).or_default();
            if status.state != ReleaseState::Downloading {
                status.state = state;
            }
        }
    }

    /// Current lifecycle state of a release.
    pub fn status(&self, id: &str) -> ReleaseStatus {
        self.statuses.lock().get(id).cloned().unwrap_or_default()
    }

    fn set_state(&self, id: &str, state: ReleaseState) {
        let mut statuses = self.statuses.lock();
        let status = statuses.entry(id.to_string()).or_default();
        if status.state != ReleaseState::Downloading {
            status.state = state;
        }
    }

    /// Relate the local and remote copies of `id`, resolving the local one.
    ///
    /// The tracked state of an installed release follows the result, so
    /// files deleted since the last sync turn it stale.
    pub fn sync_info(&self, id: &str) -> SyncInfo {
        let local = self.local.lock().get(id).cloned();
        let remote = self.remote.lock().get(id).cloned();
        let info = self.sync_info_for(local, remote);
        if info.installed {
            self.set_state(id, ReleaseState::from_sync_info(&info));
        }
        info
    }

    fn sync_info_for(&self, local: Option<ReleaseDescriptor>, remote: Option<PartialRelease>) -> SyncInfo {
        let installed = local.is_some();
        let mut up_to_date = installed && not_older(local.as_ref(), remote.as_ref());

        let resolved = local.map(|descriptor| {
            let id = descriptor.id.clone();
            version::resolve(descriptor.clone(), self).unwrap_or_else(|e| {
                error!(id = %id, error = %e, "Couldn't resolve release");
                descriptor
            })
        });
        if let Some(resolved) = &resolved {
            up_to_date &= self.local.lock().has_all_files(resolved, &self.env);
        }

        SyncInfo::new(resolved, remote, installed, up_to_date)
    }

    // Same as `sync_info` but checks files of the authored descriptor, so
    // parent lookups during resolution never recurse.
    fn shallow_sync_info(&self, id: &str) -> SyncInfo {
        let remote = self.remote.lock().get(id).cloned();
        let local = self.local.lock();
        let descriptor = local.get(id).cloned();
        let up_to_date = match &descriptor {
            Some(d) => not_older(Some(d), remote.as_ref()) && local.has_all_files(d, &self.env),
            None => false,
        };
        let installed = descriptor.is_some();
        SyncInfo::new(descriptor, remote, installed, up_to_date)
    }

    /// Merged listing of local and remote releases, newest first.
    ///
    /// Installed releases of an included type are always listed. Remote-only
    /// releases are capped at the filter's count per type. Releases without
    /// a known type or update time are skipped.
    pub fn release_list(&self, filter: &VersionFilter) -> Vec<SyncInfo> {
        let locals: Vec<ReleaseDescriptor> = self.local.lock().releases().cloned().collect();
        let remotes: Vec<PartialRelease> = self.remote.lock().releases().to_vec();

        let mut counts: BTreeMap<ReleaseType, usize> = BTreeMap::new();
        let mut seen = HashSet::new();
        let mut result = Vec::new();

        for local in &locals {
            let Some(release_type) = listable_type(local) else {
                continue;
            };
            if !filter.includes(release_type) || counts.get(&release_type).copied().unwrap_or(0) >= filter.max_count() {
                continue;
            }
            let remote = remotes.iter().find(|r| r.id == local.id).cloned();
            seen.insert(local.id.clone());
            result.push(self.sync_info_for(Some(local.clone()), remote));
        }

        for remote in &remotes {
            let Some(release_type) = listable_type(remote) else {
                continue;
            };
            if seen.contains(&remote.id) {
                continue;
            }
            let count = counts.entry(release_type).or_insert(0);
            if !filter.includes(release_type) || *count >= filter.max_count() {
                continue;
            }
            *count += 1;
            seen.insert(remote.id.clone());
            result.push(self.sync_info_for(None, Some(remote.clone())));
        }

        if result.is_empty() {
            if let Some(local) = locals.iter().find(|l| listable_type(*l).is_some()) {
                let remote = remotes.iter().find(|r| r.id == local.id).cloned();
                result.push(self.sync_info_for(Some(local.clone()), remote));
            }
        }

        result.sort_by(compare_newest_first);
        result
    }

    /// Sync info for every installed release with a known type.
    pub fn installed_releases(&self) -> Vec<SyncInfo> {
        let locals: Vec<ReleaseDescriptor> = self.local.lock().releases().cloned().collect();
        locals
            .into_iter()
            .filter(|local| listable_type(local).is_some())
            .map(|local| {
                let remote = self.remote.lock().get(&local.id).cloned();
                self.sync_info_for(Some(local), remote)
            })
            .collect()
    }

    /// The complete, unresolved descriptor from whichever side is newer.
    ///
    /// A failed remote fetch falls back to the installed copy.
    pub fn latest_complete(&self, info: &SyncInfo) -> SyncResult<ReleaseDescriptor> {
        if info.local.is_none() && info.remote.is_none() {
            return Err(SyncError::UnknownRelease(info.id().to_string()));
        }
        let id = info.id().to_string();

        if info.latest_source() != ReleaseSource::Remote {
            return self
                .local
                .lock()
                .get(&id)
                .cloned()
                .ok_or(SyncError::NotInstalled(id));
        }

        let fetched = self.remote.lock().complete_release(self.http(), &id);
        match fetched {
            Ok(descriptor) => Ok(descriptor),
            Err(e) => match self.local.lock().get(&id).cloned() {
                Some(local) => {
                    warn!(id = %id, error = %e, "Couldn't fetch remote descriptor, using installed copy");
                    Ok(local)
                }
                None => Err(e),
            },
        }
    }

    /// Fully resolve the newest copy of `id`.
    ///
    /// Parents that are missing or stale locally are installed on the way.
    pub fn resolve(&self, id: &str) -> SyncResult<ReleaseDescriptor> {
        let info = self.shallow_sync_info(id);
        let complete = self.latest_complete(&info)?;
        Ok(version::resolve(complete, self)?)
    }

    /// Persist the authored form of `descriptor` under `versions/`.
    pub fn install(&self, descriptor: &ReleaseDescriptor) -> SyncResult<()> {
        self.local.lock().save(descriptor)?;
        let id = &descriptor.savable_form().id;
        let state = ReleaseState::from_sync_info(&self.shallow_sync_info(id));
        self.set_state(id, state);
        info!(id = %id, "Installed release");
        Ok(())
    }

    /// Remove an installed release. Shared libraries and assets stay until
    /// [`perform_cleanups`](Self::perform_cleanups).
    pub fn uninstall(&self, id: &str) -> SyncResult<()> {
        if self.status(id).state == ReleaseState::Downloading {
            return Err(SyncError::Busy(id.to_string()));
        }
        {
            let mut local = self.local.lock();
            if !local.contains(id) {
                return Err(SyncError::NotInstalled(id.to_string()));
            }
            local.uninstall(id)?;
        }
        self.set_state(id, ReleaseState::Uninstalled);
        Ok(())
    }

    /// Files `descriptor` needs, relative to the game directory.
    pub fn required_files(&self, descriptor: &ReleaseDescriptor) -> SyncResult<Vec<PathBuf>> {
        Ok(descriptor.required_files(&self.env)?)
    }

    /// Required files of `descriptor` not present on disk.
    pub fn missing_files(&self, descriptor: &ReleaseDescriptor) -> SyncResult<Vec<PathBuf>> {
        self.local.lock().missing_files(descriptor, &self.env)
    }

    /// Replace the installed descriptor with the remote one.
    pub fn sync_release(&self, info: &SyncInfo) -> SyncResult<SyncInfo> {
        let remote = info
            .remote
            .as_ref()
            .ok_or_else(|| SyncError::UnknownRelease(info.id().to_string()))?;
        let complete = self.remote.lock().complete_release(self.http(), &remote.id)?;
        self.install(&complete)?;
        Ok(self.sync_info(&remote.id))
    }

    /// Job fetching the libraries and client jar the newest copy of a
    /// release is missing. Any failed transfer fails the job.
    ///
    /// # Arguments
    ///
    /// * `info` - Local and remote view of the release, from [`sync_info`](Self::sync_info)
    ///
    /// # Returns
    ///
    /// An unstarted job holding only the transfers whose targets are absent
    /// or fail verification. It is empty when nothing is missing. Fails when
    /// the release or one of its parents cannot be fetched or resolved.
    pub fn download_missing(&self, info: &SyncInfo) -> SyncResult<DownloadJob> {
        let complete = self.latest_complete(info)?;
        let resolved = version::resolve(complete, self)?;
        self.libraries_job(&resolved)
    }

    fn libraries_job(&self, release: &ReleaseDescriptor) -> SyncResult<DownloadJob> {
        let job = DownloadJob::new(LIBRARIES_JOB, false);
        job.add_transfers(self.library_transfers(release)?)?;
        Ok(job)
    }

    fn library_transfers(&self, release: &ReleaseDescriptor) -> SyncResult<Vec<Transfer>> {
        let libraries_dir = self.config.libraries_dir();
        let mut transfers = Vec::new();

        for library in release.relevant_libraries(&self.env) {
            let classifier = if library.has_natives() {
                match library.native_classifier(&self.env) {
                    Some(classifier) => Some(classifier),
                    None => continue,
                }
            } else {
                None
            };
            let path = library.artifact_path(classifier.as_deref())?;
            match library.artifact_source(classifier.as_deref(), &self.config.library_base_url)? {
                Some(source) => transfers.push(artifact_transfer(source, libraries_dir.join(path))),
                None => debug!(library = %library.name, "No download listed for library"),
            }
        }
        transfers.push(self.jar_transfer(release));

        let mut targets = HashSet::new();
        Ok(transfers
            .into_iter()
            .filter(|t| targets.insert(t.target().to_path_buf()))
            .filter(|t| !t.verification().is_satisfied_locally(t.target()))
            .collect())
    }

    fn jar_transfer(&self, release: &ReleaseDescriptor) -> Transfer {
        let relative = release.jar_path();
        let target = self.config.base_dir.join(&relative);
        match release.download("client") {
            Some(info) => {
                let verification = match &info.sha1 {
                    Some(sha1) => Verification::PreHashed { sha1: sha1.clone() },
                    None => Verification::Etag,
                };
                Transfer::new(info.url.clone(), target, verification).with_expected_size(info.size.unwrap_or(0))
            }
            None => {
                let jar = release.jar();
                let url = join_url(&self.config.jar_fallback_url, &format!("versions/{jar}/{jar}.jar"));
                Transfer::new(url, target, Verification::Etag)
            }
        }
    }

    /// Best-effort job for the asset objects of `release`.
    ///
    /// The asset index is fetched and saved first; when that fails the job
    /// is empty and the error is only logged.
    pub fn download_resources(&self, release: &ReleaseDescriptor) -> SyncResult<DownloadJob> {
        let job = DownloadJob::new(RESOURCES_JOB, true);
        let index = release.asset_index();
        match self.store.fetch_index(self.http(), &index) {
            Ok(manifest) => {
                let transfers = self.store.missing_transfers(&manifest);
                debug!(index = %index.id, missing = transfers.len(), "Compared resources");
                job.add_transfers(transfers)?;
            }
            Err(e) => error!(index = %index.id, error = %e, "Couldn't download resources"),
        }
        Ok(job)
    }

    fn run_job(&self, job: &DownloadJob, id: &str) -> SyncResult<()> {
        {
            let mut active = self.active_jobs.lock();
            active.retain(|j| !j.is_finished());
            active.push(job.clone());
        }
        job.start_downloading(&self.pool)?;
        job.wait();

        let failures = job.failure_count();
        if failures > 0 {
            return Err(SyncError::SyncFailed {
                id: id.to_string(),
                reason: format!(
                    "{failures} of {} file(s) in '{}' could not be downloaded",
                    job.transfer_count(),
                    job.name()
                ),
            });
        }
        Ok(())
    }

    /// Sync `id` and everything it needs, then describe how to launch it.
    ///
    /// Libraries are downloaded to completion before assets. On failure the
    /// installed descriptor is put back the way it was and the release keeps
    /// its previous state with the failure recorded.
    ///
    /// # Arguments
    ///
    /// * `id` - Release to launch, installed or listed remotely
    ///
    /// # Returns
    ///
    /// The resolved descriptor, class path and asset directory. Fails with
    /// [`SyncError::UnknownRelease`] when no catalog lists `id`, with
    /// [`SyncError::Busy`] while another sync of it runs, and with
    /// [`SyncError::SyncFailed`] or [`SyncError::MissingFiles`] when
    /// libraries could not be completed.
    pub fn prepare_launch(&self, id: &str) -> SyncResult<LaunchPlan> {
        let info = self.shallow_sync_info(id);
        if info.local.is_none() && info.remote.is_none() {
            return Err(SyncError::UnknownRelease(id.to_string()));
        }
        let previous_state = ReleaseState::from_sync_info(&info);
        let previous_descriptor = info.local.clone();

        {
            let mut statuses = self.statuses.lock();
            let status = statuses.entry(id.to_string()).or_default();
            if status.state == ReleaseState::Downloading {
                return Err(SyncError::Busy(id.to_string()));
            }
            status.state = ReleaseState::Downloading;
        }

        let result = self.sync_and_prepare(info);

        let (state, last_error) = match &result {
            Ok(_) => (ReleaseState::InstalledCurrent, None),
            Err(e) => {
                error!(id, error = %e, "Release sync failed");
                self.revert_install(id, previous_descriptor);
                (previous_state, Some(e.to_string()))
            }
        };
        self.statuses
            .lock()
            .insert(id.to_string(), ReleaseStatus { state, last_error });
        result
    }

    fn sync_and_prepare(&self, mut info: SyncInfo) -> SyncResult<LaunchPlan> {
        if info.installed && info.latest_source() == ReleaseSource::Remote {
            info!(id = info.id(), "Remote copy is newer, syncing descriptor");
            info = self.sync_release(&info)?;
        }

        let complete = self.latest_complete(&info)?;
        let resolved = version::resolve(complete.clone(), self)?;
        resolved.check_launchable(&self.env, self.config.launcher_format_version)?;

        if !info.installed || !info.up_to_date {
            self.install(&complete)?;
        }

        let libraries = self.libraries_job(&resolved)?;
        self.run_job(&libraries, &resolved.id)?;

        let resources = self.download_resources(&resolved)?;
        self.run_job(&resources, &resolved.id)?;

        let asset_root = self.reconstruct_assets(&resolved)?;

        let missing = self.missing_files(&resolved)?;
        if !missing.is_empty() {
            for file in &missing {
                warn!(id = %resolved.id, file = %file.display(), "Required file missing");
            }
            return Err(SyncError::MissingFiles {
                id: resolved.id.clone(),
                missing: missing.len(),
            });
        }

        let classpath = resolved.classpath(&self.config.base_dir, &self.env)?;
        info!(id = %resolved.id, "Release ready to launch");
        Ok(LaunchPlan {
            descriptor: resolved,
            classpath,
            asset_root,
        })
    }

    fn reconstruct_assets(&self, release: &ReleaseDescriptor) -> SyncResult<PathBuf> {
        let index = release.asset_index();
        let manifest = match self.store.load_index(&index.id) {
            Ok(manifest) => manifest,
            Err(e) => {
                error!(index = %index.id, error = %e, "No asset index, can't reconstruct assets");
                return Ok(self.store.virtual_root(&index.id));
            }
        };
        Ok(self
            .store
            .reconstruct_virtual(&index.id, &manifest)?
            .unwrap_or_else(|| self.store.root().to_path_buf()))
    }

    fn revert_install(&self, id: &str, previous: Option<ReleaseDescriptor>) {
        let mut local = self.local.lock();
        let current = local.get(id).cloned();
        let outcome = match (previous, current) {
            (Some(previous), Some(current)) if previous != current => {
                info!(id, "Restoring previous descriptor");
                local.save(&previous)
            }
            (None, Some(_)) => {
                info!(id, "Removing partially installed release");
                local.uninstall(id)
            }
            _ => Ok(()),
        };
        if let Err(e) = outcome {
            warn!(id, error = %e, "Failed to revert install");
        }
    }

    /// Aggregate progress of the jobs started by the last sync.
    pub fn progress(&self) -> DownloadProgress {
        aggregate_progress(&self.active_jobs.lock())
    }

    /// Push [`progress`](Self::progress) snapshots to `listener` until the
    /// returned reporter is dropped.
    pub fn watch_progress(&self, listener: Arc<dyn ProgressListener>) -> ProgressReporter {
        let jobs = Arc::clone(&self.active_jobs);
        ProgressReporter::start_default(move || aggregate_progress(&jobs.lock()), listener)
    }

    /// Delete assets, virtual trees and libraries no installed release
    /// needs.
    ///
    /// The object sweep is skipped when any installed release's asset index
    /// cannot be read, since its references would be unknown.
    ///
    /// # Returns
    ///
    /// How many objects, virtual roots, libraries and emptied directories
    /// were removed. Anything that cannot be deleted is logged and left in
    /// place.
    pub fn perform_cleanups(&self) -> ReclaimReport {
        let installed: Vec<ReleaseDescriptor> = self
            .installed_releases()
            .into_iter()
            .filter_map(|info| info.local)
            .collect();
        let mut report = ReclaimReport::default();

        match self.referenced_objects(&installed) {
            Some(referenced) => report.merge(reclaim_orphaned_objects(&self.store.objects_dir(), &referenced)),
            None => warn!("Skipping orphaned object cleanup"),
        }

        let retention = chrono::Duration::from_std(self.config.virtual_retention)
            .unwrap_or_else(|_| chrono::Duration::days(DEFAULT_VIRTUAL_RETENTION_DAYS));
        report.merge(reclaim_stale_virtuals(&self.store.virtual_dir(), retention, Utc::now()));

        match self.referenced_libraries(&installed) {
            Some(referenced) => report.merge(reclaim_orphaned_libraries(&self.config.libraries_dir(), &referenced)),
            None => warn!("Skipping orphaned library cleanup"),
        }

        info!(
            objects = report.objects,
            virtual_roots = report.virtual_roots,
            libraries = report.libraries,
            directories = report.directories,
            "Cleanup finished"
        );
        report
    }

    fn referenced_objects(&self, installed: &[ReleaseDescriptor]) -> Option<HashSet<String>> {
        let mut referenced = HashSet::new();
        for release in installed {
            let index = release.asset_index();
            match self.store.load_index(&index.id) {
                Ok(manifest) => referenced.extend(manifest.referenced_hashes()),
                Err(e) => {
                    warn!(id = %release.id, index = %index.id, error = %e, "Couldn't read asset index");
                    return None;
                }
            }
        }
        Some(referenced)
    }

    fn referenced_libraries(&self, installed: &[ReleaseDescriptor]) -> Option<HashSet<PathBuf>> {
        let mut referenced = HashSet::new();
        for release in installed {
            match release.required_library_files(&self.env) {
                Ok(files) => referenced.extend(
                    files
                        .into_iter()
                        .filter_map(|file| file.strip_prefix("libraries").ok().map(Path::to_path_buf)),
                ),
                Err(e) => {
                    warn!(id = %release.id, error = %e, "Couldn't list libraries");
                    return None;
                }
            }
        }
        Some(referenced)
    }

    /// Stop taking work and let running jobs drain for up to `timeout`.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.pool.shutdown(timeout)
    }
}

impl ReleaseLookup for SyncManager {
    fn complete_release(&self, id: &str) -> ResolveResult<ReleaseDescriptor> {
        let unavailable = |e: SyncError| ResolveError::Unavailable {
            id: id.to_string(),
            reason: e.to_string(),
        };

        let info = self.shallow_sync_info(id);
        let parent = self.latest_complete(&info).map_err(unavailable)?;
        if info.needs_sync() {
            self.install(&parent).map_err(unavailable)?;
        }
        Ok(parent)
    }
}

fn not_older(local: Option<&ReleaseDescriptor>, remote: Option<&PartialRelease>) -> bool {
    match (local, remote) {
        (Some(local), Some(remote)) => remote.updated_time <= local.updated_time,
        _ => true,
    }
}

fn listable_type(release: &dyn ReleaseInfo) -> Option<ReleaseType> {
    release.updated_time()?;
    release.release_type()
}

fn artifact_transfer(source: ArtifactSource, target: PathBuf) -> Transfer {
    match source {
        ArtifactSource::Hashed {
            url,
            sha1: Some(sha1),
            size,
        } => Transfer::new(url, target, Verification::PreHashed { sha1 }).with_expected_size(size.unwrap_or(0)),
        ArtifactSource::Hashed { url, sha1: None, size } => {
            Transfer::new(url, target, Verification::Etag).with_expected_size(size.unwrap_or(0))
        }
        ArtifactSource::Sidecar { url } => Transfer::new(url, target, Verification::Sidecar),
    }
}

fn aggregate_progress(jobs: &[DownloadJob]) -> DownloadProgress {
    let mut total = DownloadProgress::default();
    for job in jobs {
        let progress = job.progress();
        total.current += progress.current;
        total.total += progress.total;
        if total.status.is_empty() && !job.is_finished() {
            total.status = progress.status;
        }
    }
    total
}

fn join_url(base: &str, path: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

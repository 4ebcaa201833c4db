//! Setup shared by the commands that touch the game directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ValueEnum;
use console::style;
use relsync::config::ConfigFile;
use relsync::logging::{init_logging, LogConfig, WorkerGuard};
use relsync::version::ReleaseType;
use relsync::{LaunchEnvironment, SyncError, SyncManager};

use crate::error::CliError;

/// Release type selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ReleaseTypeArg {
    /// Stable releases
    Release,
    /// Preview snapshots
    Snapshot,
    /// Historical beta builds
    OldBeta,
    /// Historical alpha builds
    OldAlpha,
}

impl From<ReleaseTypeArg> for ReleaseType {
    fn from(arg: ReleaseTypeArg) -> Self {
        match arg {
            ReleaseTypeArg::Release => ReleaseType::Stable,
            ReleaseTypeArg::Snapshot => ReleaseType::Preview,
            ReleaseTypeArg::OldBeta => ReleaseType::Experimental,
            ReleaseTypeArg::OldAlpha => ReleaseType::DeprecatedInternal,
        }
    }
}

/// Load the config file and apply command-line overrides.
///
/// An explicit `config_path` must exist; the default one may be missing.
pub fn load_settings(config_path: Option<&Path>, base_dir: Option<PathBuf>) -> Result<ConfigFile, CliError> {
    let mut settings = match config_path {
        Some(path) if !path.is_file() => {
            return Err(CliError::Config(format!(
                "Config file {} does not exist. Create it with 'relsync config init'.",
                path.display()
            )))
        }
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    if let Some(base_dir) = base_dir {
        settings.base_dir = base_dir;
    }
    Ok(settings)
}

/// Logging plus a refreshed sync manager.
pub struct CliContext {
    manager: Arc<SyncManager>,
    _log_guard: Option<WorkerGuard>,
}

impl CliContext {
    pub fn new(config_path: Option<&Path>, base_dir: Option<PathBuf>, verbose: bool) -> Result<Self, CliError> {
        let settings = load_settings(config_path, base_dir)?;
        let config = settings.to_sync_config();

        let mut log_config = LogConfig::new().with_default_filter(if verbose { "debug" } else { "warn" });
        if let Some(dir) = &config.log_dir {
            log_config = log_config.with_log_dir(dir);
        }
        let log_guard = init_logging(log_config);
        tracing::debug!(
            version = env!("CARGO_PKG_VERSION"),
            base_dir = %config.base_dir.display(),
            manifest = %config.manifest_url,
            "Starting relsync"
        );

        let manager = SyncManager::new(config, LaunchEnvironment::current())?;
        if let Err(e) = manager.refresh() {
            let problem = if e.is_network() {
                "could not reach the release catalog"
            } else if matches!(e, SyncError::Transfer(_) | SyncError::InvalidManifest { .. }) {
                "the release catalog is unusable"
            } else {
                return Err(e.into());
            };
            eprintln!(
                "{} {problem}, showing installed releases only ({e})",
                style("warning:").yellow().bold()
            );
        }

        Ok(Self {
            manager: Arc::new(manager),
            _log_guard: log_guard,
        })
    }

    pub fn manager(&self) -> &Arc<SyncManager> {
        &self.manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_release_type_mapping() {
        assert_eq!(ReleaseType::from(ReleaseTypeArg::Release), ReleaseType::Stable);
        assert_eq!(ReleaseType::from(ReleaseTypeArg::OldAlpha), ReleaseType::DeprecatedInternal);
    }

    #[test]
    fn test_base_dir_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        ConfigFile::default().save_to(&path).unwrap();

        let settings = load_settings(Some(&path), Some(PathBuf::from("/games/other"))).unwrap();
        assert_eq!(settings.base_dir, PathBuf::from("/games/other"));
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.ini");
        assert!(matches!(load_settings(Some(&missing), None), Err(CliError::Config(_))));
    }
}

//! Runtime configuration.
//!
//! [`SyncConfig`] is what the library consumes. [`ConfigFile`] is its
//! on-disk INI form, loaded by the CLI and overridden by flags.
//!
//! # Example
//!
//! ```ignore
//! use relsync::config::{ConfigFile, SyncConfig};
//!
//! let config = ConfigFile::load()?
//!     .to_sync_config()
//!     .with_max_workers(8);
//! ```

mod file;

use std::path::PathBuf;
use std::time::Duration;

pub use file::{config_file_path, ConfigError, ConfigFile, ConfigKey};

use crate::assets::DEFAULT_RESOURCE_BASE_URL;
use crate::catalog::DEFAULT_MANIFEST_URL;
use crate::download::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_WORKERS, DEFAULT_READ_TIMEOUT};
use crate::reclaim::DEFAULT_VIRTUAL_RETENTION_DAYS;

/// Conventional library repository.
pub const DEFAULT_LIBRARY_BASE_URL: &str = "https://libraries.minecraft.net/";

/// Host for client jars of releases without structured downloads.
pub const DEFAULT_JAR_FALLBACK_URL: &str = "https://s3.amazonaws.com/Minecraft.Download/";

/// Highest descriptor format this launcher understands.
pub const LAUNCHER_FORMAT_VERSION: u32 = 21;

/// `<data dir>/relsync`, or `./relsync` when the platform has none.
pub fn default_base_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("relsync")
}

/// Settings for a [`SyncManager`](crate::updater::SyncManager).
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Game directory holding `versions/`, `libraries/` and `assets/`.
    pub base_dir: PathBuf,
    pub manifest_url: String,
    pub library_base_url: String,
    pub resource_base_url: String,
    pub jar_fallback_url: String,
    /// Download worker threads.
    pub max_workers: usize,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Hash existing asset objects instead of trusting a size match.
    pub verify_asset_hashes: bool,
    /// How long an unused virtual asset tree is kept.
    pub virtual_retention: Duration,
    pub launcher_format_version: u32,
    /// Directory for the rolling log file; console only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            library_base_url: DEFAULT_LIBRARY_BASE_URL.to_string(),
            resource_base_url: DEFAULT_RESOURCE_BASE_URL.to_string(),
            jar_fallback_url: DEFAULT_JAR_FALLBACK_URL.to_string(),
            max_workers: DEFAULT_MAX_WORKERS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            verify_asset_hashes: false,
            virtual_retention: Duration::from_secs(DEFAULT_VIRTUAL_RETENTION_DAYS as u64 * 24 * 60 * 60),
            launcher_format_version: LAUNCHER_FORMAT_VERSION,
            log_dir: None,
        }
    }
}

impl SyncConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_manifest_url(mut self, url: impl Into<String>) -> Self {
        self.manifest_url = url.into();
        self
    }

    pub fn with_library_base_url(mut self, url: impl Into<String>) -> Self {
        self.library_base_url = url.into();
        self
    }

    pub fn with_resource_base_url(mut self, url: impl Into<String>) -> Self {
        self.resource_base_url = url.into();
        self
    }

    pub fn with_jar_fallback_url(mut self, url: impl Into<String>) -> Self {
        self.jar_fallback_url = url.into();
        self
    }

    /// Set the worker count (at least 1).
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    pub fn with_asset_hash_verification(mut self, verify: bool) -> Self {
        self.verify_asset_hashes = verify;
        self
    }

    pub fn with_virtual_retention(mut self, retention: Duration) -> Self {
        self.virtual_retention = retention;
        self
    }

    pub fn with_launcher_format_version(mut self, version: u32) -> Self {
        self.launcher_format_version = version;
        self
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.base_dir.join("versions")
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.base_dir.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.base_dir.join("assets")
    }
}

//! INI configuration file.
//!
//! ```ini
//! [paths]
//! base_dir = /home/user/.local/share/relsync
//! log_dir =
//!
//! [remote]
//! manifest_url = https://launchermeta.mojang.com/mc/game/version_manifest.json
//! library_base_url = https://libraries.minecraft.net/
//! resource_base_url = http://resources.download.minecraft.net/
//! jar_fallback_url = https://s3.amazonaws.com/Minecraft.Download/
//!
//! [download]
//! max_workers = 16
//! connect_timeout_secs = 5
//! read_timeout_secs = 30
//! verify_asset_hashes = false
//!
//! [cleanup]
//! virtual_retention_days = 5
//! ```
//!
//! Missing sections and keys keep their defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::SyncConfig;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// `<config dir>/relsync/config.ini`
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("relsync")
        .join("config.ini")
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {reason}", path.display())]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write config {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// Settings as stored in `config.ini`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub base_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub manifest_url: String,
    pub library_base_url: String,
    pub resource_base_url: String,
    pub jar_fallback_url: String,
    pub max_workers: usize,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub verify_asset_hashes: bool,
    pub virtual_retention_days: u64,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::from_sync_config(&SyncConfig::default())
    }
}

impl ConfigFile {
    pub fn from_sync_config(config: &SyncConfig) -> Self {
        Self {
            base_dir: config.base_dir.clone(),
            log_dir: config.log_dir.clone(),
            manifest_url: config.manifest_url.clone(),
            library_base_url: config.library_base_url.clone(),
            resource_base_url: config.resource_base_url.clone(),
            jar_fallback_url: config.jar_fallback_url.clone(),
            max_workers: config.max_workers,
            connect_timeout_secs: config.connect_timeout.as_secs(),
            read_timeout_secs: config.read_timeout.as_secs(),
            verify_asset_hashes: config.verify_asset_hashes,
            virtual_retention_days: config.virtual_retention.as_secs() / SECS_PER_DAY,
        }
    }

    pub fn to_sync_config(&self) -> SyncConfig {
        let mut config = SyncConfig::new(&self.base_dir)
            .with_manifest_url(&self.manifest_url)
            .with_library_base_url(&self.library_base_url)
            .with_resource_base_url(&self.resource_base_url)
            .with_jar_fallback_url(&self.jar_fallback_url)
            .with_max_workers(self.max_workers)
            .with_timeouts(
                Duration::from_secs(self.connect_timeout_secs),
                Duration::from_secs(self.read_timeout_secs),
            )
            .with_asset_hash_verification(self.verify_asset_hashes)
            .with_virtual_retention(Duration::from_secs(self.virtual_retention_days * SECS_PER_DAY));
        config.log_dir = self.log_dir.clone();
        config
    }

    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config = Self::default();
        for key in ConfigKey::ALL {
            if let Some(value) = ini.get_from(Some(key.section()), key.name()) {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::ALL {
            ini.with_section(Some(key.section()))
                .set(key.name(), key.get(self));
        }
        ini.write_to_file(path).map_err(write_err)
    }
}

/// A `section.key` setting addressable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    BaseDir,
    LogDir,
    ManifestUrl,
    LibraryBaseUrl,
    ResourceBaseUrl,
    JarFallbackUrl,
    MaxWorkers,
    ConnectTimeoutSecs,
    ReadTimeoutSecs,
    VerifyAssetHashes,
    VirtualRetentionDays,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 11] = [
        Self::BaseDir,
        Self::LogDir,
        Self::ManifestUrl,
        Self::LibraryBaseUrl,
        Self::ResourceBaseUrl,
        Self::JarFallbackUrl,
        Self::MaxWorkers,
        Self::ConnectTimeoutSecs,
        Self::ReadTimeoutSecs,
        Self::VerifyAssetHashes,
        Self::VirtualRetentionDays,
    ];

    pub fn section(&self) -> &'static str {
        match self {
            Self::BaseDir | Self::LogDir => "paths",
            Self::ManifestUrl | Self::LibraryBaseUrl | Self::ResourceBaseUrl | Self::JarFallbackUrl => "remote",
            Self::MaxWorkers | Self::ConnectTimeoutSecs | Self::ReadTimeoutSecs | Self::VerifyAssetHashes => {
                "download"
            }
            Self::VirtualRetentionDays => "cleanup",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BaseDir => "base_dir",
            Self::LogDir => "log_dir",
            Self::ManifestUrl => "manifest_url",
            Self::LibraryBaseUrl => "library_base_url",
            Self::ResourceBaseUrl => "resource_base_url",
            Self::JarFallbackUrl => "jar_fallback_url",
            Self::MaxWorkers => "max_workers",
            Self::ConnectTimeoutSecs => "connect_timeout_secs",
            Self::ReadTimeoutSecs => "read_timeout_secs",
            Self::VerifyAssetHashes => "verify_asset_hashes",
            Self::VirtualRetentionDays => "virtual_retention_days",
        }
    }

    /// Current value rendered as text; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            Self::BaseDir => config.base_dir.display().to_string(),
            Self::LogDir => config
                .log_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            Self::ManifestUrl => config.manifest_url.clone(),
            Self::LibraryBaseUrl => config.library_base_url.clone(),
            Self::ResourceBaseUrl => config.resource_base_url.clone(),
            Self::JarFallbackUrl => config.jar_fallback_url.clone(),
            Self::MaxWorkers => config.max_workers.to_string(),
            Self::ConnectTimeoutSecs => config.connect_timeout_secs.to_string(),
            Self::ReadTimeoutSecs => config.read_timeout_secs.to_string(),
            Self::VerifyAssetHashes => config.verify_asset_hashes.to_string(),
            Self::VirtualRetentionDays => config.virtual_retention_days.to_string(),
        }
    }

    /// Parse and store `value`. Empty values reset optional settings.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            Self::BaseDir => config.base_dir = PathBuf::from(self.non_empty(value)?),
            Self::LogDir => config.log_dir = (!value.is_empty()).then(|| PathBuf::from(value)),
            Self::ManifestUrl => config.manifest_url = self.url(value)?,
            Self::LibraryBaseUrl => config.library_base_url = self.url(value)?,
            Self::ResourceBaseUrl => config.resource_base_url = self.url(value)?,
            Self::JarFallbackUrl => config.jar_fallback_url = self.url(value)?,
            Self::MaxWorkers => {
                config.max_workers = self.number(value)?;
                if config.max_workers == 0 {
                    return Err(self.invalid(value, "must be at least 1"));
                }
            }
            Self::ConnectTimeoutSecs => config.connect_timeout_secs = self.number(value)?,
            Self::ReadTimeoutSecs => config.read_timeout_secs = self.number(value)?,
            Self::VerifyAssetHashes => {
                config.verify_asset_hashes = value
                    .parse()
                    .map_err(|_| self.invalid(value, "expected true or false"))?
            }
            Self::VirtualRetentionDays => config.virtual_retention_days = self.number(value)?,
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn non_empty<'a>(&self, value: &'a str) -> Result<&'a str, ConfigError> {
        if value.is_empty() {
            Err(self.invalid(value, "must not be empty"))
        } else {
            Ok(value)
        }
    }

    fn url(&self, value: &str) -> Result<String, ConfigError> {
        if value.starts_with("http://") || value.starts_with("https://") {
            Ok(value.to_string())
        } else {
            Err(self.invalid(value, "expected an http(s) URL"))
        }
    }

    fn number<T: FromStr>(&self, value: &str) -> Result<T, ConfigError> {
        value
            .parse()
            .map_err(|_| self.invalid(value, "expected a non-negative integer"))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.to_string() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

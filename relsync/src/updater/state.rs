//! Per-release lifecycle tracked by the sync manager.

use std::fmt;

use crate::catalog::SyncInfo;

/// Where a release stands in the sync lifecycle.
///
/// ```text
/// Unknown ─► RemoteOnly ─► Downloading ─► InstalledStale ─► InstalledCurrent
///                              │                                   │
///                              └─ failure reverts ◄────────────────┘
///                                                     uninstall ─► Uninstalled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseState {
    #[default]
    Unknown,
    /// Listed remotely, nothing on disk.
    RemoteOnly,
    /// A sync job is running.
    Downloading,
    /// Installed, but the remote copy is newer or files are missing.
    InstalledStale,
    /// Installed with every required file present.
    InstalledCurrent,
    /// Removed by the user.
    Uninstalled,
}

impl ReleaseState {
    /// The stable state implied by a freshly computed sync info.
    pub fn from_sync_info(info: &SyncInfo) -> Self {
        match (info.installed, info.up_to_date) {
            (true, true) => Self::InstalledCurrent,
            (true, false) => Self::InstalledStale,
            (false, _) if info.is_on_remote() => Self::RemoteOnly,
            (false, _) => Self::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::RemoteOnly => "remote-only",
            Self::Downloading => "downloading",
            Self::InstalledStale => "installed (stale)",
            Self::InstalledCurrent => "installed",
            Self::Uninstalled => "uninstalled",
        }
    }

    pub fn is_installed(&self) -> bool {
        matches!(self, Self::InstalledStale | Self::InstalledCurrent)
    }
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// State of one release plus the reason its last sync failed, if it did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseStatus {
    pub state: ReleaseState,
    pub last_error: Option<String>,
}

impl ReleaseStatus {
    pub fn new(state: ReleaseState) -> Self {
        Self {
            state,
            last_error: None,
        }
    }

    pub fn failed(&self) -> bool {
        self.last_error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::{PartialRelease, ReleaseDescriptor};

    fn remote(id: &str) -> PartialRelease {
        PartialRelease {
            id: id.to_string(),
            release_type: None,
            updated_time: None,
            release_time: None,
            url: format!("https://h/{id}.json"),
        }
    }

    #[test]
    fn test_state_from_sync_info() {
        let current = SyncInfo::new(Some(ReleaseDescriptor::new("a")), None, true, true);
        assert_eq!(ReleaseState::from_sync_info(&current), ReleaseState::InstalledCurrent);

        let stale = SyncInfo::new(Some(ReleaseDescriptor::new("a")), Some(remote("a")), true, false);
        assert_eq!(ReleaseState::from_sync_info(&stale), ReleaseState::InstalledStale);

        let remote_only = SyncInfo::new(None, Some(remote("a")), false, false);
        assert_eq!(ReleaseState::from_sync_info(&remote_only), ReleaseState::RemoteOnly);

        let nothing = SyncInfo::new(None, None, false, false);
        assert_eq!(ReleaseState::from_sync_info(&nothing), ReleaseState::Unknown);
    }

    #[test]
    fn test_status_failure_flag() {
        let mut status = ReleaseStatus::new(ReleaseState::InstalledCurrent);
        assert!(!status.failed());
        status.last_error = Some("network down".into());
        assert!(status.failed());
        assert!(status.state.is_installed());
    }
}

//! How a local release compares to its remote listing.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::version::{PartialRelease, ReleaseDescriptor, ReleaseInfo, ReleaseType};

/// Default number of releases per type kept by a [`VersionFilter`].
pub const DEFAULT_MAX_COUNT: usize = 5;

/// Which catalog holds the newest copy of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseSource {
    Local,
    Remote,
}

/// Local and remote state of one release.
#[derive(Debug, Clone)]
pub struct SyncInfo {
    /// The installed descriptor, resolved when its parents are available.
    pub local: Option<ReleaseDescriptor>,
    pub remote: Option<PartialRelease>,
    pub installed: bool,
    /// Installed, not older than the remote listing, and every required
    /// file is present.
    pub up_to_date: bool,
}

impl SyncInfo {
    pub fn new(
        local: Option<ReleaseDescriptor>,
        remote: Option<PartialRelease>,
        installed: bool,
        up_to_date: bool,
    ) -> Self {
        Self {
            local,
            remote,
            installed,
            up_to_date,
        }
    }

    /// Remote wins only when there is no local copy or the remote one was
    /// updated strictly later.
    pub fn latest_source(&self) -> ReleaseSource {
        match (&self.local, &self.remote) {
            (None, _) => ReleaseSource::Remote,
            (Some(_), None) => ReleaseSource::Local,
            (Some(local), Some(remote)) if remote.updated_time > local.updated_time => ReleaseSource::Remote,
            _ => ReleaseSource::Local,
        }
    }

    /// The newer of the two copies.
    pub fn latest(&self) -> Option<&dyn ReleaseInfo> {
        match (self.latest_source(), &self.local, &self.remote) {
            (ReleaseSource::Remote, _, Some(remote)) => Some(remote as &dyn ReleaseInfo),
            (_, Some(local), _) => Some(local as &dyn ReleaseInfo),
            _ => None,
        }
    }

    pub fn id(&self) -> &str {
        self.latest().map_or("", |latest| latest.id())
    }

    pub fn release_type(&self) -> Option<ReleaseType> {
        self.latest().and_then(|latest| latest.release_type())
    }

    pub fn is_on_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Whether the release needs to be pulled before it can be launched.
    pub fn needs_sync(&self) -> bool {
        !self.installed || !self.up_to_date || self.latest_source() == ReleaseSource::Remote
    }
}

/// Which releases a listing includes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionFilter {
    types: BTreeSet<ReleaseType>,
    max_count: usize,
}

impl Default for VersionFilter {
    fn default() -> Self {
        Self {
            types: ReleaseType::ALL.into_iter().collect(),
            max_count: DEFAULT_MAX_COUNT,
        }
    }
}

impl VersionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the listing to these types.
    pub fn only_types(mut self, types: impl IntoIterator<Item = ReleaseType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    /// Cap the number of remote-only releases per type.
    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn includes(&self, release_type: ReleaseType) -> bool {
        self.types.contains(&release_type)
    }

    pub fn types(&self) -> &BTreeSet<ReleaseType> {
        &self.types
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }
}

/// Newest first, by release time when both sides have one, else by update
/// time.
pub fn compare_newest_first(a: &SyncInfo, b: &SyncInfo) -> Ordering {
    let (Some(a), Some(b)) = (a.latest(), b.latest()) else {
        return Ordering::Equal;
    };
    match (a.release_time(), b.release_time()) {
        (Some(a_time), Some(b_time)) => b_time.cmp(&a_time),
        _ => b.updated_time().cmp(&a.updated_time()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(year: i32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap())
    }

    fn local(id: &str, year: i32) -> ReleaseDescriptor {
        let mut d = ReleaseDescriptor::new(id);
        d.release_type = Some(ReleaseType::Stable);
        d.updated_time = at(year);
        d
    }

    fn remote(id: &str, year: i32) -> PartialRelease {
        PartialRelease {
            id: id.to_string(),
            release_type: Some(ReleaseType::Stable),
            updated_time: at(year),
            release_time: at(year),
            url: format!("https://h/{id}.json"),
        }
    }

    #[test]
    fn test_latest_source() {
        let only_remote = SyncInfo::new(None, Some(remote("a", 2020)), false, false);
        assert_eq!(only_remote.latest_source(), ReleaseSource::Remote);

        let only_local = SyncInfo::new(Some(local("a", 2020)), None, true, true);
        assert_eq!(only_local.latest_source(), ReleaseSource::Local);

        let same = SyncInfo::new(Some(local("a", 2020)), Some(remote("a", 2020)), true, true);
        assert_eq!(same.latest_source(), ReleaseSource::Local);
        assert!(!same.needs_sync());

        let newer = SyncInfo::new(Some(local("a", 2020)), Some(remote("a", 2021)), true, false);
        assert_eq!(newer.latest_source(), ReleaseSource::Remote);
        assert_eq!(newer.latest().unwrap().updated_time(), at(2021));
        assert!(newer.needs_sync());
    }

    #[test]
    fn test_filter() {
        let filter = VersionFilter::new()
            .only_types([ReleaseType::Stable])
            .with_max_count(2);
        assert!(filter.includes(ReleaseType::Stable));
        assert!(!filter.includes(ReleaseType::Preview));
        assert_eq!(filter.max_count(), 2);
        assert_eq!(VersionFilter::default().types().len(), 4);
    }

    #[test]
    fn test_newest_first() {
        let mut infos = vec![
            SyncInfo::new(None, Some(remote("old", 2010)), false, false),
            SyncInfo::new(None, Some(remote("new", 2022)), false, false),
            SyncInfo::new(Some(local("mid", 2015)), None, true, true),
        ];
        infos.sort_by(compare_newest_first);
        let ids: Vec<_> = infos.iter().map(|i| i.id().to_string()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }
}

//! Best-effort removal of files no installed release needs.
//!
//! Every sweep logs what it deletes and swallows I/O errors; a file that
//! cannot be removed is simply left for the next run.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::assets::LAST_USED_MARKER;

/// Virtual roots unused for longer than this are removed.
pub const DEFAULT_VIRTUAL_RETENTION_DAYS: i64 = 5;

/// Counts of what a cleanup run removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReclaimReport {
    pub objects: usize,
    pub virtual_roots: usize,
    pub libraries: usize,
    pub directories: usize,
}

impl ReclaimReport {
    pub fn total(&self) -> usize {
        self.objects + self.virtual_roots + self.libraries + self.directories
    }

    pub fn merge(&mut self, other: ReclaimReport) {
        self.objects += other.objects;
        self.virtual_roots += other.virtual_roots;
        self.libraries += other.libraries;
        self.directories += other.directories;
    }
}

/// Delete objects whose hash is not in `referenced` (lower-case hashes).
pub fn reclaim_orphaned_objects(objects_dir: &Path, referenced: &HashSet<String>) -> ReclaimReport {
    let mut report = ReclaimReport::default();
    if !objects_dir.is_dir() {
        return report;
    }

    for shard in list_dir(objects_dir).into_iter().filter(|p| p.is_dir()) {
        for file in list_dir(&shard).into_iter().filter(|p| p.is_file()) {
            let name = file_name(&file).to_ascii_lowercase();
            if referenced.contains(&name) {
                continue;
            }
            info!(object = %name, "Cleaning up orphaned object");
            if remove_file(&file) {
                report.objects += 1;
            }
        }
    }

    report.directories += delete_empty_directories(objects_dir);
    report
}

/// Delete virtual roots last used before `now - retention`, and roots with
/// no marker at all.
///
/// A marker whose contents cannot be parsed falls back to its modification
/// time.
pub fn reclaim_stale_virtuals(virtual_dir: &Path, retention: Duration, now: DateTime<Utc>) -> ReclaimReport {
    let mut report = ReclaimReport::default();
    if !virtual_dir.is_dir() {
        return report;
    }
    let cutoff = now - retention;

    for root in list_dir(virtual_dir).into_iter().filter(|p| p.is_dir()) {
        let marker = root.join(LAST_USED_MARKER);
        let stale = match last_used(&marker) {
            Some(last_used) => last_used < cutoff,
            None => {
                info!(root = %root.display(), "Virtual directory has no usable marker");
                true
            }
        };
        if !stale {
            continue;
        }

        info!(root = %root.display(), "Cleaning up old virtual directory");
        match fs::remove_dir_all(&root) {
            Ok(()) => report.virtual_roots += 1,
            Err(e) => warn!(root = %root.display(), error = %e, "Failed to remove virtual directory"),
        }
    }

    report.directories += delete_empty_directories(virtual_dir);
    report
}

fn last_used(marker: &Path) -> Option<DateTime<Utc>> {
    if !marker.is_file() {
        return None;
    }
    let parsed = fs::read_to_string(marker)
        .ok()
        .and_then(|text| DateTime::parse_from_rfc3339(text.trim()).ok())
        .map(|t| t.with_timezone(&Utc));
    parsed.or_else(|| modified_at(marker))
}

/// Delete files under `libraries_dir` whose path is not in `referenced`.
///
/// `referenced` holds paths relative to `libraries_dir`; a `.sha` sibling of
/// a referenced file is kept as well.
pub fn reclaim_orphaned_libraries(libraries_dir: &Path, referenced: &HashSet<PathBuf>) -> ReclaimReport {
    let mut report = ReclaimReport::default();
    if !libraries_dir.is_dir() {
        return report;
    }

    let mut keep: HashSet<PathBuf> = HashSet::with_capacity(referenced.len() * 2);
    for path in referenced {
        keep.insert(path.clone());
        let mut sha = path.clone().into_os_string();
        sha.push(".sha");
        keep.insert(PathBuf::from(sha));
    }

    for file in list_files_recursive(libraries_dir) {
        let Ok(relative) = file.strip_prefix(libraries_dir) else {
            continue;
        };
        if keep.contains(relative) {
            continue;
        }
        info!(library = %relative.display(), "Cleaning up orphaned library");
        if remove_file(&file) {
            report.libraries += 1;
        }
    }

    report.directories += delete_empty_directories(libraries_dir);
    report
}

/// Remove empty directories below `root`, repeating until none are left.
/// `root` itself is kept.
pub fn delete_empty_directories(root: &Path) -> usize {
    let mut deleted = 0;
    loop {
        let empty = list_empty_directories(root);
        if empty.is_empty() {
            return deleted;
        }
        for dir in empty {
            if let Err(e) = fs::remove_dir(&dir) {
                warn!(dir = %dir.display(), error = %e, "Failed to remove empty directory");
                return deleted;
            }
            debug!(dir = %dir.display(), "Deleted empty directory");
            deleted += 1;
        }
    }
}

fn list_empty_directories(root: &Path) -> Vec<PathBuf> {
    let mut empty = Vec::new();
    for dir in list_dir(root).into_iter().filter(|p| p.is_dir()) {
        if is_empty_dir(&dir) {
            empty.push(dir);
        } else {
            empty.extend(list_empty_directories(&dir));
        }
    }
    empty
}

fn is_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

fn list_files_recursive(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in list_dir(root) {
        if path.is_dir() {
            files.extend(list_files_recursive(&path));
        } else {
            files.push(path);
        }
    }
    files
}

fn list_dir(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to list directory");
            Vec::new()
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn remove_file(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to delete file");
            false
        }
    }
}

/// Modification time as UTC.
fn modified_at(path: &Path) -> Option<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(|t: SystemTime| t.into())
}

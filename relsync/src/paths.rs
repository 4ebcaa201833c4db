//! Checks for names taken from remote documents before they become paths.
//!
//! Asset logical paths, object hashes, index ids and release ids all end up
//! joined onto a directory inside the game folder, so none of them may
//! climb out of it.

use std::path::{Component, Path};

/// Length of a hex-encoded SHA-1.
pub const SHA1_HEX_LEN: usize = 40;

/// Why a name was refused.
pub fn relative_path_problem(path: &str) -> Option<&'static str> {
    if path.is_empty() {
        return Some("empty path");
    }
    if path.contains('\\') {
        return Some("backslashes not allowed");
    }
    if path.contains(['\0', '\n', '\r']) {
        return Some("control characters not allowed");
    }
    let all_normal = Path::new(path)
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !all_normal {
        return Some("must be relative without '.' or '..'");
    }
    None
}

/// Whether `path` names something strictly below the directory it is
/// joined onto.
pub fn is_safe_relative_path(path: &str) -> bool {
    relative_path_problem(path).is_none()
}

/// A single safe path segment, as used for release and index ids.
pub fn is_safe_name(name: &str) -> bool {
    is_safe_relative_path(name) && Path::new(name).components().count() == 1
}

/// 40 lower-case hex digits.
pub fn is_object_hash(hash: &str) -> bool {
    hash.len() == SHA1_HEX_LEN && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths() {
        assert!(is_safe_relative_path("sound/boop.ogg"));
        assert!(is_safe_relative_path("icons/icon_16x16.png"));

        assert!(!is_safe_relative_path(""));
        assert!(!is_safe_relative_path("../../../escaped.txt"));
        assert!(!is_safe_relative_path("sound/../../x"));
        assert!(!is_safe_relative_path("/etc/passwd"));
        assert!(!is_safe_relative_path("./sound/boop.ogg"));
        assert!(!is_safe_relative_path("sound\\..\\x"));
        assert!(!is_safe_relative_path("a\0b"));
    }

    #[test]
    fn test_names_are_single_segments() {
        assert!(is_safe_name("1.20.1"));
        assert!(is_safe_name("1.20.1-forge-47.2.0"));
        assert!(!is_safe_name("a/b"));
        assert!(!is_safe_name(".."));
        assert!(!is_safe_name("."));
    }

    #[test]
    fn test_object_hash() {
        assert!(is_object_hash("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"));
        assert!(!is_object_hash("2AAE6C35C94FCFB415DBE95F408B9CE91EE846ED"));
        assert!(!is_object_hash("2aae6c35"));
        assert!(!is_object_hash("../../../../../../../../../../../etc/pwd"));
    }
}

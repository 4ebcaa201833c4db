//! SHA-1 and MD5 digests for file verification.
//!
//! Downloads are hashed inline while they stream to disk so a file never
//! has to be read twice.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use md5::Md5;
use sha1::{Digest, Sha1};

use super::error::{TransferError, TransferResult};
use super::progress::ProgressCounter;

/// Buffer size for reading files during hashing and copying (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Digest algorithms used by the verification strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA-1, used for pre-hashed artifacts, sidecars and asset objects.
    Sha1,
    /// MD5, compared against server ETags.
    Md5,
}

enum Hasher {
    Sha1(Sha1),
    Md5(Md5),
}

impl Hasher {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha1 => Self::Sha1(Sha1::new()),
            HashAlgorithm::Md5 => Self::Md5(Md5::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha1(h) => h.update(data),
            Self::Md5(h) => h.update(data),
        }
    }

    fn finish(self) -> String {
        match self {
            Self::Sha1(h) => format!("{:x}", h.finalize()),
            Self::Md5(h) => format!("{:x}", h.finalize()),
        }
    }
}

/// Calculate the lowercase hex digest of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn file_digest(path: &Path, algorithm: HashAlgorithm) -> TransferResult<String> {
    let mut file = File::open(path).map_err(|e| TransferError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| TransferError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finish())
}

/// Compare two hex digests, ignoring case.
pub fn digests_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

/// Create the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> TransferResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            fs::create_dir_all(parent).map_err(|e| TransferError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Stream `reader` into `target`, hashing every byte on the way.
///
/// Bytes written are added to `progress` as they arrive. Read errors are
/// reported against `source_label` (usually the URL) so they classify as
/// transient network failures.
pub fn copy_and_digest<R: Read>(
    reader: &mut R,
    source_label: &str,
    target: &Path,
    algorithm: HashAlgorithm,
    progress: Option<&ProgressCounter>,
) -> TransferResult<String> {
    ensure_parent_dir(target)?;

    let file = File::create(target).map_err(|e| TransferError::WriteFailed {
        path: target.to_path_buf(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| TransferError::Request {
                url: source_label.to_string(),
                reason: e.to_string(),
            })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| TransferError::WriteFailed {
                path: target.to_path_buf(),
                source: e,
            })?;

        if let Some(counter) = progress {
            counter.add(bytes_read as u64);
        }
    }

    writer.flush().map_err(|e| TransferError::WriteFailed {
        path: target.to_path_buf(),
        source: e,
    })?;

    Ok(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_sha1_of_known_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello.txt");
        fs::write(&path, b"hello world").unwrap();

        let hash = file_digest(&path, HashAlgorithm::Sha1).unwrap();
        assert_eq!(hash, "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
    }

    #[test]
    fn test_md5_of_known_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello.txt");
        fs::write(&path, b"hello world").unwrap();

        let hash = file_digest(&path, HashAlgorithm::Md5).unwrap();
        assert_eq!(hash, "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let result = file_digest(&temp.path().join("absent"), HashAlgorithm::Sha1);
        assert!(matches!(result, Err(TransferError::ReadFailed { .. })));
    }

    #[test]
    fn test_copy_and_digest_writes_and_hashes() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("nested/dir/out.bin");
        let counter = ProgressCounter::new(0);
        let mut source = Cursor::new(b"hello world".to_vec());

        let hash = copy_and_digest(
            &mut source,
            "memory",
            &target,
            HashAlgorithm::Sha1,
            Some(&counter),
        )
        .unwrap();

        assert_eq!(hash, "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
        assert_eq!(fs::read(&target).unwrap(), b"hello world");
        assert_eq!(counter.current(), 11);
    }

    #[test]
    fn test_digests_match_ignores_case_and_whitespace() {
        assert!(digests_match("ABCDEF\n", "abcdef"));
        assert!(!digests_match("abcdef", "abcdee"));
    }
}

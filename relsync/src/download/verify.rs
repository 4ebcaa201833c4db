//! Verification strategies for transfers.
//!
//! A [`Verification`] is picked when a transfer is built, based on what the
//! catalog tells us about the artifact:
//!
//! ```text
//! catalog metadata                       strategy
//! ──────────────────────────────────────  ─────────────────
//! {url, sha1, size}                       PreHashed
//! base URL, hash published at <url>.sha1  Sidecar
//! no hash, server sends an MD5 ETag       Etag
//! asset object (hash, size, gzip alt.)    ContentAddressed
//! ```
//!
//! Fresh bytes are always streamed into a `.part` sibling and renamed over
//! the target only after they verify, so a failed attempt never destroys a
//! local copy that was good before it started.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use reqwest::blocking::Response;
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::checksum::{copy_and_digest, digests_match, file_digest, HashAlgorithm};
use super::error::{TransferError, TransferResult};
use super::http::{content_length, etag, HttpClient};
use super::transfer::Transfer;

/// How a transfer decides that a local file is known-good.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The catalog supplied the expected SHA-1.
    PreHashed { sha1: String },
    /// The expected SHA-1 is published next to the file as `<url>.sha1`.
    Sidecar,
    /// Conditional GET against the local MD5; the response ETag is the hash.
    Etag,
    /// Hash-named store object, optionally fetched through a gzip copy.
    ContentAddressed(ObjectSpec),
}

/// Expected content of a hash-named object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpec {
    /// SHA-1 of the plain object.
    pub hash: String,
    /// Size of the plain object in bytes.
    pub size: u64,
    /// Gzip alternative to fetch instead of the plain object.
    pub compressed: Option<CompressedSource>,
    /// Accept an existing object whose size matches without hashing it.
    pub trust_size: bool,
}

/// Gzip-compressed copy of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedSource {
    pub url: String,
    pub path: PathBuf,
    pub hash: String,
    pub size: u64,
}

/// What an attempt did to produce a verified file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The local copy was already valid.
    ReusedLocal,
    /// Fresh bytes were downloaded and verified.
    Downloaded,
    /// A compressed copy was inflated and verified.
    Inflated,
}

impl Verification {
    /// Whether `target` already satisfies this strategy without asking the
    /// server. Sidecar and ETag copies count as valid when present.
    pub fn is_satisfied_locally(&self, target: &Path) -> bool {
        if !target.is_file() {
            return false;
        }
        match self {
            Self::PreHashed { sha1 } => file_digest(target, HashAlgorithm::Sha1)
                .map(|actual| digests_match(sha1, &actual))
                .unwrap_or(false),
            Self::Sidecar | Self::Etag => true,
            Self::ContentAddressed(spec) => object_is_valid(target, spec),
        }
    }

    /// Run one attempt for `transfer`.
    pub fn fetch(&self, transfer: &Transfer, http: &HttpClient) -> TransferResult<FetchOutcome> {
        match self {
            Self::PreHashed { sha1 } => fetch_pre_hashed(transfer, http, sha1),
            Self::Sidecar => fetch_with_sidecar(transfer, http),
            Self::Etag => fetch_with_etag(transfer, http),
            Self::ContentAddressed(spec) => fetch_object(transfer, http, spec),
        }
    }
}

fn fetch_pre_hashed(
    transfer: &Transfer,
    http: &HttpClient,
    expected: &str,
) -> TransferResult<FetchOutcome> {
    let target = transfer.target();

    if target.is_file() {
        match file_digest(target, HashAlgorithm::Sha1) {
            Ok(actual) if digests_match(expected, &actual) => return Ok(FetchOutcome::ReusedLocal),
            Ok(actual) => {
                debug!(path = %target.display(), expected, actual = %actual, "local copy stale");
                remove_quietly(target);
            }
            Err(e) => warn!(path = %target.display(), error = %e, "could not hash local copy"),
        }
    }

    let response = http.get_success(transfer.url())?;
    download_verified(
        transfer,
        response,
        transfer.url(),
        target,
        HashAlgorithm::Sha1,
        Some(expected),
    )?;
    Ok(FetchOutcome::Downloaded)
}

fn fetch_with_sidecar(transfer: &Transfer, http: &HttpClient) -> TransferResult<FetchOutcome> {
    let target = transfer.target();
    let local_hash = if target.is_file() {
        file_digest(target, HashAlgorithm::Sha1).ok()
    } else {
        None
    };

    let sidecar_url = format!("{}.sha1", transfer.url());
    let expected = http
        .get_text_optional(&sidecar_url)
        .and_then(|body| body.split_whitespace().next().map(str::to_string))
        .filter(|hash| !hash.is_empty());

    match (&expected, &local_hash) {
        (None, Some(_)) => {
            debug!(url = %sidecar_url, "no sidecar published, trusting local copy");
            return Ok(FetchOutcome::ReusedLocal);
        }
        (Some(expected), Some(local)) if digests_match(expected, local) => {
            return Ok(FetchOutcome::ReusedLocal);
        }
        _ => {}
    }

    let response = match http.get(transfer.url()) {
        Ok(response) if response.status().is_success() => response,
        Ok(response) if local_hash.is_some() => {
            warn!(
                url = transfer.url(),
                status = response.status().as_u16(),
                "server refused download, keeping local copy"
            );
            return Ok(FetchOutcome::ReusedLocal);
        }
        Ok(response) => {
            return Err(TransferError::HttpStatus {
                url: transfer.url().to_string(),
                status: response.status().as_u16(),
            })
        }
        Err(e) => return Err(e),
    };

    download_verified(
        transfer,
        response,
        transfer.url(),
        target,
        HashAlgorithm::Sha1,
        expected.as_deref(),
    )?;
    Ok(FetchOutcome::Downloaded)
}

fn fetch_with_etag(transfer: &Transfer, http: &HttpClient) -> TransferResult<FetchOutcome> {
    let target = transfer.target();
    let local_md5 = if target.is_file() {
        file_digest(target, HashAlgorithm::Md5).ok()
    } else {
        None
    };

    let response = match http.get_conditional(transfer.url(), local_md5.as_deref()) {
        Ok(response) => response,
        Err(e) if target.is_file() => {
            warn!(url = transfer.url(), error = %e, "request failed, keeping local copy");
            return Ok(FetchOutcome::ReusedLocal);
        }
        Err(e) => return Err(e),
    };

    if response.status() == StatusCode::NOT_MODIFIED {
        return Ok(FetchOutcome::ReusedLocal);
    }

    if !response.status().is_success() {
        if target.is_file() {
            return Ok(FetchOutcome::ReusedLocal);
        }
        return Err(TransferError::HttpStatus {
            url: transfer.url().to_string(),
            status: response.status().as_u16(),
        });
    }

    // Multipart uploads produce ETags that are not a plain MD5
    let expected = etag(&response).filter(|tag| !tag.contains('-'));
    download_verified(
        transfer,
        response,
        transfer.url(),
        target,
        HashAlgorithm::Md5,
        expected.as_deref(),
    )?;
    Ok(FetchOutcome::Downloaded)
}

fn fetch_object(
    transfer: &Transfer,
    http: &HttpClient,
    spec: &ObjectSpec,
) -> TransferResult<FetchOutcome> {
    let target = transfer.target();

    if target.is_file() {
        if object_is_valid(target, spec) {
            return Ok(FetchOutcome::ReusedLocal);
        }
        warn!(path = %target.display(), expected_size = spec.size, "local object invalid");
        remove_quietly(target);
    }

    let Some(compressed) = &spec.compressed else {
        let response = http.get_success(transfer.url())?;
        download_verified(
            transfer,
            response,
            transfer.url(),
            target,
            HashAlgorithm::Sha1,
            Some(&spec.hash),
        )?;
        return Ok(FetchOutcome::Downloaded);
    };

    if compressed.path.is_file() {
        match file_digest(&compressed.path, HashAlgorithm::Sha1) {
            Ok(actual) if digests_match(&compressed.hash, &actual) => {
                inflate_verified(&compressed.path, target, &spec.hash)?;
                return Ok(FetchOutcome::Inflated);
            }
            _ => {
                warn!(path = %compressed.path.display(), "local compressed object invalid");
                remove_quietly(&compressed.path);
            }
        }
    }

    let response = http.get_success(&compressed.url)?;
    download_verified(
        transfer,
        response,
        &compressed.url,
        &compressed.path,
        HashAlgorithm::Sha1,
        Some(&compressed.hash),
    )?;
    inflate_verified(&compressed.path, target, &spec.hash)?;
    Ok(FetchOutcome::Downloaded)
}

fn object_is_valid(path: &Path, spec: &ObjectSpec) -> bool {
    let size_matches = fs::metadata(path)
        .map(|m| m.len() == spec.size)
        .unwrap_or(false);
    if !size_matches {
        return false;
    }
    spec.trust_size
        || file_digest(path, HashAlgorithm::Sha1)
            .map(|actual| digests_match(&spec.hash, &actual))
            .unwrap_or(false)
}

/// Stream a response into `target`, renaming into place only on a hash match.
///
/// With no `expected` hash the download is trusted as-is.
fn download_verified(
    transfer: &Transfer,
    mut response: Response,
    url: &str,
    target: &Path,
    algorithm: HashAlgorithm,
    expected: Option<&str>,
) -> TransferResult<()> {
    transfer.update_expected_size(content_length(&response));
    transfer.progress().reset();

    let part = part_path(target);
    let actual = copy_and_digest(
        &mut response,
        url,
        &part,
        algorithm,
        Some(transfer.progress()),
    )
    .inspect_err(|_| remove_quietly(&part))?;

    if let Some(expected) = expected {
        if !digests_match(expected, &actual) {
            remove_quietly(&part);
            return Err(TransferError::ChecksumMismatch {
                path: target.to_path_buf(),
                expected: expected.to_string(),
                actual,
            });
        }
    }

    fs::rename(&part, target).map_err(|e| {
        remove_quietly(&part);
        TransferError::WriteFailed {
            path: target.to_path_buf(),
            source: e,
        }
    })
}

/// Gunzip `compressed` into `target` and check the inflated hash.
fn inflate_verified(compressed: &Path, target: &Path, expected: &str) -> TransferResult<()> {
    let file = File::open(compressed).map_err(|e| TransferError::ReadFailed {
        path: compressed.to_path_buf(),
        source: e,
    })?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let label = compressed.display().to_string();

    let part = part_path(target);
    let actual = copy_and_digest(&mut decoder, &label, &part, HashAlgorithm::Sha1, None)
        .inspect_err(|_| remove_quietly(&part))?;

    if !digests_match(expected, &actual) {
        remove_quietly(&part);
        return Err(TransferError::ChecksumMismatch {
            path: target.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }

    fs::rename(&part, target).map_err(|e| {
        remove_quietly(&part);
        TransferError::WriteFailed {
            path: target.to_path_buf(),
            source: e,
        }
    })
}

fn part_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove file");
        }
    }
}

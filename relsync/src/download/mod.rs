//! Concurrent, verified file transfers.
//!
//! This module provides:
//! - SHA-1/MD5 hashing that runs inline with the download (`checksum`)
//! - A blocking HTTP client with no-cache headers and timeouts (`http`)
//! - Per-transfer byte counters that cascade into their job (`progress`)
//! - Verification strategies chosen per artifact (`verify`)
//! - Jobs with bounded retries and exactly-once completion (`job`)
//! - A fixed-size pool of download workers (`pool`)
//!
//! # Architecture
//!
//! ```text
//! DownloadJob ──start_downloading()──► WorkerPool (N threads)
//!     │                                     │
//!     ├── pending: VecDeque<Transfer>  ◄────┤ pop / requeue
//!     ├── successes / failures              │
//!     └── JobListener (fires once)          └── HttpClient
//!
//! Transfer ── Verification ─┬─ PreHashed
//!    │                      ├─ Sidecar
//!    │                      ├─ Etag
//!    │                      └─ ContentAddressed
//!    └── ProgressCounter ──► job totals ──► ProgressReporter
//! ```
//!
//! # Example
//!
//! ```ignore
//! use relsync::download::{DownloadJob, HttpClient, Transfer, Verification, WorkerPool};
//!
//! let pool = WorkerPool::new(16, HttpClient::new()?);
//! let job = DownloadJob::new("Version & Libraries", false);
//! job.add_transfer(Transfer::new(
//!     "https://example.com/lib.jar",
//!     "/games/libraries/lib.jar",
//!     Verification::PreHashed { sha1: "2aae6c35...".into() },
//! ))?;
//! job.start_downloading(&pool)?;
//! job.wait();
//! assert_eq!(job.failure_count(), 0);
//! ```

mod checksum;
mod error;
mod http;
mod job;
mod pool;
mod progress;
mod transfer;
mod verify;

pub use checksum::{digests_match, ensure_parent_dir, file_digest, HashAlgorithm};
pub use error::{TransferError, TransferResult};
pub use http::{HttpClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT};
pub use job::{DownloadJob, JobListener, ASSUMED_AVERAGE_FILE_SIZE, MAX_ATTEMPTS_PER_TRANSFER};
pub use pool::{WorkerContext, WorkerPool, DEFAULT_MAX_WORKERS};
pub use progress::{DownloadProgress, ProgressCounter, ProgressListener, ProgressReporter};
pub use transfer::{Transfer, TransferTimes};
pub use verify::{CompressedSource, FetchOutcome, ObjectSpec, Verification};

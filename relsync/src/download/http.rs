//! Blocking HTTP client shared by all download workers.
//!
//! Every request carries no-cache headers so intermediaries never serve a
//! stale artifact, and uses separate connect and read timeouts. A timeout
//! surfaces as [`TransferError::Timeout`] and is retried like any other
//! transient failure.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, ETAG, EXPIRES, IF_NONE_MATCH, PRAGMA};

use super::error::{TransferError, TransferResult};

/// Default connect timeout (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default read timeout (30 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client wrapper used by transfers and catalogs.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl HttpClient {
    /// Create a client with default 5s connect and 30s read timeouts.
    pub fn new() -> TransferResult<Self> {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT)
    }

    /// Create a client with custom timeouts.
    pub fn with_timeouts(connect_timeout: Duration, read_timeout: Duration) -> TransferResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store,max-age=0,no-cache"),
        );
        headers.insert(EXPIRES, HeaderValue::from_static("0"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .default_headers(headers)
            .user_agent(concat!("relsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransferError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            connect_timeout,
            read_timeout,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Issue a GET and return the response whatever its status.
    pub fn get(&self, url: &str) -> TransferResult<Response> {
        self.client
            .get(url)
            .send()
            .map_err(|e| request_error(url, e))
    }

    /// Issue a GET with `If-None-Match` when a local tag is known.
    pub fn get_conditional(&self, url: &str, etag: Option<&str>) -> TransferResult<Response> {
        let mut request = self.client.get(url);
        if let Some(tag) = etag {
            request = request.header(IF_NONE_MATCH, tag);
        }
        request.send().map_err(|e| request_error(url, e))
    }

    /// Issue a GET and fail unless the status is 2xx.
    pub fn get_success(&self, url: &str) -> TransferResult<Response> {
        let response = self.get(url)?;
        if !response.status().is_success() {
            return Err(TransferError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }

    /// Fetch a document as text.
    pub fn get_text(&self, url: &str) -> TransferResult<String> {
        self.get_success(url)?
            .text()
            .map_err(|e| request_error(url, e))
    }

    /// Fetch a small document, treating any failure as absent.
    pub fn get_text_optional(&self, url: &str) -> Option<String> {
        self.get_text(url).ok()
    }
}

/// Content-Length of a response, if the server sent one.
pub fn content_length(response: &Response) -> Option<u64> {
    response.content_length().filter(|len| *len > 0)
}

/// The response ETag with surrounding quotes removed.
pub fn etag(response: &Response) -> Option<String> {
    response
        .headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start_matches("W/").trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
}

fn request_error(url: &str, e: reqwest::Error) -> TransferError {
    if e.is_timeout() {
        TransferError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransferError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

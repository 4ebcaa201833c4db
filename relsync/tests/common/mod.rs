//! Shared fixtures for integration tests.
//!
//! [`FixtureServer`] is a small in-process HTTP server, running axum on its
//! own tokio runtime thread so the blocking client under test can talk to
//! it from ordinary `#[test]` functions.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{mpsc, Arc};
use std::thread;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use flate2::write::GzEncoder;
use flate2::Compression;
use md5::Md5;
use parking_lot::Mutex;
use sha1::{Digest, Sha1};
use tokio::sync::oneshot;

#[derive(Debug, Clone)]
struct Entry {
    status: StatusCode,
    body: Vec<u8>,
    etag: Option<String>,
}

#[derive(Debug, Default)]
struct Routes {
    entries: HashMap<String, Entry>,
    hits: HashMap<String, usize>,
}

type SharedRoutes = Arc<Mutex<Routes>>;

/// Serves canned bodies by path and counts requests.
pub struct FixtureServer {
    base_url: String,
    routes: SharedRoutes,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl FixtureServer {
    /// Bind `127.0.0.1:0` and start serving.
    pub fn start() -> Self {
        let routes: SharedRoutes = Arc::default();
        let state = Arc::clone(&routes);
        let (addr_tx, addr_rx) = mpsc::channel::<SocketAddr>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("fixture runtime");
            runtime.block_on(async move {
                let app = Router::new().route("/*path", get(serve)).with_state(state);
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind fixture listener");
                addr_tx
                    .send(listener.local_addr().expect("fixture addr"))
                    .expect("report fixture addr");
                let _ = axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown_rx.await;
                    })
                    .await;
            });
        });

        let addr = addr_rx.recv().expect("fixture server failed to start");
        Self {
            base_url: format!("http://{addr}"),
            routes,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn put(&self, path: &str, body: impl Into<Vec<u8>>) {
        self.insert(path, StatusCode::OK, body.into(), None);
    }

    /// Serve `body` with its MD5 as a quoted ETag, answering a matching
    /// `If-None-Match` with 304.
    pub fn put_with_etag(&self, path: &str, body: impl Into<Vec<u8>>) {
        let body = body.into();
        let tag = md5_hex(&body);
        self.insert(path, StatusCode::OK, body, Some(tag));
    }

    /// Always answer `path` with `status`.
    pub fn put_status(&self, path: &str, status: StatusCode) {
        self.insert(path, status, Vec::new(), None);
    }

    pub fn remove(&self, path: &str) {
        self.routes.lock().entries.remove(path.trim_start_matches('/'));
    }

    /// Requests seen for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.routes
            .lock()
            .hits
            .get(path.trim_start_matches('/'))
            .copied()
            .unwrap_or(0)
    }

    fn insert(&self, path: &str, status: StatusCode, body: Vec<u8>, etag: Option<String>) {
        self.routes
            .lock()
            .entries
            .insert(path.trim_start_matches('/').to_string(), Entry { status, body, etag });
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

async fn serve(State(routes): State<SharedRoutes>, Path(path): Path<String>, headers: HeaderMap) -> Response {
    let entry = {
        let mut routes = routes.lock();
        *routes.hits.entry(path.clone()).or_default() += 1;
        routes.entries.get(&path).cloned()
    };

    let Some(entry) = entry else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !entry.status.is_success() {
        return entry.status.into_response();
    }

    match entry.etag {
        Some(tag) => {
            let matches = headers
                .get(header::IF_NONE_MATCH)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.trim_matches('"') == tag);
            if matches {
                return StatusCode::NOT_MODIFIED.into_response();
            }
            ([(header::ETAG, format!("\"{tag}\""))], entry.body).into_response()
        }
        None => entry.body.into_response(),
    }
}

pub fn sha1_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha1::digest(bytes))
}

pub fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

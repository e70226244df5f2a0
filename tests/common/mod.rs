//! Shared fixtures for integration tests: a scripted transport that records
//! every request, and a token store that counts its I/O.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bearer_guard::auth::{MemoryTokenStore, SecureTokenStore, StorageError};
use bearer_guard::transport::{Transport, TransportError};
use bearer_guard::types::{AuthClientOptions, HttpRequest, HttpResponse};
use reqwest::StatusCode;

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Transport answering from a closure, optionally after a delay
pub struct MockTransport {
    handler: Box<Handler>,
    delay: Option<Duration>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            delay: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn with_delay<F>(delay: Duration, handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            delay: Some(delay),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// 200 `{"id": 1}` for `Bearer <token>`, 401 "token expired" otherwise
    pub fn accepting(token: &'static str) -> Arc<Self> {
        Self::new(move |request| accept_only(request, |t| t == token))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Bearer token of each recorded request, in order
    pub fn tokens_seen(&self) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.bearer_token().map(str::to_owned))
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(request)
    }
}

pub fn ok_json(value: serde_json::Value) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::json_body(StatusCode::OK, &value))
}

pub fn unauthorized() -> Result<HttpResponse, TransportError> {
    Err(TransportError::bad_response(HttpResponse::new(
        StatusCode::UNAUTHORIZED,
        b"token expired".to_vec(),
    )))
}

/// 200 `{"id": 1}` if the bearer token satisfies `accept`, else 401
pub fn accept_only(
    request: &HttpRequest,
    accept: impl Fn(&str) -> bool,
) -> Result<HttpResponse, TransportError> {
    match request.bearer_token() {
        Some(token) if accept(token) => ok_json(serde_json::json!({"id": 1})),
        _ => unauthorized(),
    }
}

/// In-memory store that counts reads and writes and can be told to fail
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryTokenStore,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
    read_delay: Option<Duration>,
}

impl CountingStore {
    pub fn with_tokens(access: &str, refresh: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryTokenStore::with_entries([
                ("access_token", access),
                ("refresh_token", refresh),
            ]),
            ..Self::default()
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn slow_with_tokens(access: &str, refresh: &str, read_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryTokenStore::with_entries([
                ("access_token", access),
                ("refresh_token", refresh),
            ]),
            read_delay: Some(read_delay),
            ..Self::default()
        })
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Read without touching the counters
    pub async fn peek(&self, key: &str) -> Option<String> {
        self.inner.read(key).await.unwrap()
    }
}

#[async_trait]
impl SecureTokenStore for CountingStore {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::backend("disk full"));
        }
        self.inner.write(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::backend("read-only filesystem"));
        }
        self.inner.delete(key).await
    }

    async fn delete_all(&self) -> Result<(), StorageError> {
        self.inner.delete_all().await
    }
}

pub fn options() -> AuthClientOptions {
    AuthClientOptions::builder()
        .base_url("http://api.test")
        .timeout(Duration::from_secs(2))
        .build()
}

/// Install a test subscriber honoring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

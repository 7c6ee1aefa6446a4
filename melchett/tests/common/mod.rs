//! Scripted transport, in-memory store and capturing log sink for tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use melchett::{
    CacheKey, CacheStore, CachedResponse, LogRecord, LogSink, RequestDescriptor, ResponseBody,
    ResponseRecord, StoreError, StoreResult, Transport, TransportError,
};
use serde_json::Value;

/// Ordered record of store and transport activity shared between mocks.
pub type Journal = Arc<Mutex<Vec<&'static str>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// One scripted transport outcome.
#[derive(Debug, Clone)]
pub enum Reply {
    Respond {
        status: StatusCode,
        headers: HeaderMap,
        body: ResponseBody,
        delay: Duration,
    },
    Fail(TransportError),
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Reply::Respond {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: ResponseBody::Json(body),
            delay: Duration::ZERO,
        }
    }

    pub fn text(status: u16, body: &'static str) -> Self {
        Reply::Respond {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: ResponseBody::Raw(Bytes::from_static(body.as_bytes())),
            delay: Duration::ZERO,
        }
    }

    pub fn fail(error: TransportError) -> Self {
        Reply::Fail(error)
    }

    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        if let Reply::Respond { headers, .. } = &mut self {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        self
    }

    pub fn delayed(mut self, by: Duration) -> Self {
        if let Reply::Respond { delay, .. } = &mut self {
            *delay = by;
        }
        self
    }
}

struct TransportInner {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    requests: Mutex<Vec<RequestDescriptor>>,
    journal: Journal,
}

/// Transport replaying scripted replies, then repeating a fallback.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<TransportInner>,
}

impl MockTransport {
    pub fn new(fallback: Reply) -> Self {
        Self::with_journal(fallback, journal())
    }

    pub fn with_journal(fallback: Reply, journal: Journal) -> Self {
        Self {
            inner: Arc::new(TransportInner {
                script: Mutex::new(VecDeque::new()),
                fallback,
                requests: Mutex::new(Vec::new()),
                journal,
            }),
        }
    }

    /// Queues a reply served before the fallback.
    pub fn then(self, reply: Reply) -> Self {
        self.inner.script.lock().unwrap().push_back(reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.inner.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.inner.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RequestDescriptor {
        self.inner.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: &RequestDescriptor) -> Result<ResponseRecord, TransportError> {
        self.inner.journal.lock().unwrap().push("transport");
        self.inner.requests.lock().unwrap().push(request.clone());
        let reply = self
            .inner
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.inner.fallback.clone());

        match reply {
            Reply::Respond {
                status,
                headers,
                body,
                delay,
            } => {
                tokio::select! {
                    _ = request.cancellation().cancelled() => Err(TransportError::aborted()),
                    _ = tokio::time::sleep(delay) => Ok(ResponseRecord::new(status, headers, body)),
                }
            }
            Reply::Fail(error) => Err(error),
        }
    }
}

#[derive(Default)]
struct StoreInner {
    entries: DashMap<CacheKey, (CachedResponse, Duration)>,
    started: AtomicBool,
    starts: AtomicUsize,
    fail_start: AtomicBool,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    journal: Mutex<Option<Journal>>,
}

/// In-memory cache store on DashMap, with switchable failures.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    /// A store that is already started.
    pub fn new() -> Self {
        let store = Self::default();
        store.inner.started.store(true, Ordering::SeqCst);
        store
    }

    /// A store that needs `start` first.
    pub fn stopped() -> Self {
        Self::default()
    }

    pub fn with_journal(self, journal: Journal) -> Self {
        *self.inner.journal.lock().unwrap() = Some(journal);
        self
    }

    pub fn fail_start(self) -> Self {
        self.inner.fail_start.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_get(self) -> Self {
        self.inner.fail_get.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_set(self) -> Self {
        self.inner.fail_set.store(true, Ordering::SeqCst);
        self
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn starts(&self) -> usize {
        self.inner.starts.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        self.inner.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn ttl_of(&self, key: &CacheKey) -> Option<Duration> {
        self.inner.entries.get(key).map(|e| e.value().1)
    }

    pub fn only_ttl(&self) -> Duration {
        self.inner.entries.iter().next().map(|e| e.value().1).unwrap()
    }

    fn note(&self, event: &'static str) {
        if let Some(journal) = self.inner.journal.lock().unwrap().as_ref() {
            journal.lock().unwrap().push(event);
        }
    }
}

fn failure(message: &str) -> StoreError {
    StoreError::InternalError(message.into())
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn is_ready(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    async fn start(&self) -> StoreResult<()> {
        self.inner.starts.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_start.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionError("refused".into()));
        }
        self.inner.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> StoreResult<Option<CachedResponse>> {
        self.note("store.get");
        if self.inner.fail_get.load(Ordering::SeqCst) {
            return Err(failure("read failed"));
        }
        Ok(self.inner.entries.get(key).map(|entry| entry.value().0.clone()))
    }

    async fn set(&self, key: &CacheKey, value: CachedResponse, ttl: Duration) -> StoreResult<()> {
        self.note("store.set");
        if self.inner.fail_set.load(Ordering::SeqCst) {
            return Err(failure("write failed"));
        }
        self.inner.entries.insert(key.clone(), (value, ttl));
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Log sink keeping every record.
#[derive(Clone, Default)]
pub struct CaptureSink {
    pub info: Arc<Mutex<Vec<LogRecord>>>,
    pub error: Arc<Mutex<Vec<LogRecord>>>,
}

impl LogSink for CaptureSink {
    fn info(&self, record: &LogRecord) {
        self.info.lock().unwrap().push(record.clone());
    }

    fn error(&self, record: &LogRecord) {
        self.error.lock().unwrap().push(record.clone());
    }
}

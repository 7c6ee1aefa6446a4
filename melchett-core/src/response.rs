//! Response records and their cacheable form.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response body as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponseBody {
    /// Body that parsed as JSON.
    Json(Value),
    /// Anything else, including an empty body.
    Raw(Bytes),
}

impl ResponseBody {
    /// Parses `bytes` as JSON, keeping the raw bytes when that fails.
    pub fn from_bytes(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            return ResponseBody::Raw(bytes);
        }
        match serde_json::from_slice(&bytes) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Raw(bytes),
        }
    }

    /// `true` for a JSON object or array.
    ///
    /// Scalars that happen to be valid JSON (`"text"`, `42`, `null`) are not
    /// structured.
    pub fn is_structured(&self) -> bool {
        matches!(self, ResponseBody::Json(Value::Object(_) | Value::Array(_)))
    }

    /// Body rendered as a JSON value: parsed JSON as is, raw bytes as a
    /// (lossy UTF-8) string.
    pub fn to_value(&self) -> Value {
        match self {
            ResponseBody::Json(value) => value.clone(),
            ResponseBody::Raw(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        ResponseBody::Raw(Bytes::new())
    }
}

/// Response attached to a [`Context`](crate::Context).
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRecord {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: ResponseBody,
    /// Served from the cache rather than the transport.
    pub cached: bool,
}

impl ResponseRecord {
    /// Creates a record for a response that came from the transport.
    pub fn new(status: StatusCode, headers: HeaderMap, body: ResponseBody) -> Self {
        Self {
            status,
            headers,
            body,
            cached: false,
        }
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Pruned response stored in a [`CacheStore`](crate::CacheStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Status code.
    #[serde(with = "http_serde::status_code")]
    pub status: StatusCode,
    /// Response headers.
    #[serde(with = "http_serde::header_map")]
    pub headers: HeaderMap,
    /// Response body.
    pub body: ResponseBody,
    /// Cached flag of the record at the time it was stored.
    pub cached: bool,
}

impl From<&ResponseRecord> for CachedResponse {
    fn from(record: &ResponseRecord) -> Self {
        Self {
            status: record.status,
            headers: record.headers.clone(),
            body: record.body.clone(),
            cached: record.cached,
        }
    }
}

impl From<CachedResponse> for ResponseRecord {
    fn from(value: CachedResponse) -> Self {
        Self {
            status: value.status,
            headers: value.headers,
            body: value.body,
            cached: true,
        }
    }
}

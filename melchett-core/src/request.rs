//! Outbound request description.
//!
//! A [`RequestDescriptor`] is frozen once built: stages can read it but never
//! change it. The only thing a stage can do to an in-flight request is fire
//! its [cancellation token](RequestDescriptor::cancellation).

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Header carrying the per-call request identifier.
///
/// Always excluded from cache key computation.
pub const CORRELATION_ID_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");

/// Immutable description of a single outbound call.
///
/// Header names are case-insensitive by construction ([`HeaderMap`] stores
/// them lowercased).
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    id: Uuid,
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<Value>,
    cancellation: CancellationToken,
}

impl RequestDescriptor {
    /// Creates a descriptor for call `id`, injecting the correlation header.
    ///
    /// Any caller supplied `x-correlation-id` is overwritten so the header
    /// always matches [`id`](Self::id).
    pub fn new(
        id: Uuid,
        method: Method,
        url: impl Into<String>,
        mut headers: HeaderMap,
        body: Option<Value>,
    ) -> Self {
        // A hyphenated UUID is always a valid header value.
        if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
            headers.insert(CORRELATION_ID_HEADER, value);
        }
        Self {
            id,
            method,
            url: url.into(),
            headers,
            body,
            cancellation: CancellationToken::new(),
        }
    }

    /// Unique identifier of this call.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Target URL, including the query string.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request headers, correlation header included.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// JSON body, if any.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Token a transport must observe to abort the call.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

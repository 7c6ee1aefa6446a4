//! Error taxonomy of the request lifecycle.
//!
//! Stages never surface Rust errors to callers. Instead they record an
//! [`ErrorRecord`] on the [`Context`](crate::Context) whose [`ErrorName`] is
//! one of a closed set of symbolic names:
//!
//! | Name | Raised by |
//! |------|-----------|
//! | `ECACHEINIT` | cache store failed to start |
//! | `ECACHEREAD` | cache read failed |
//! | `ECACHESTORE` | cache write failed |
//! | `ENOTJSON` | body is not a JSON object or array |
//! | `ESTATUS<code>` | status rejected by the success predicate |
//! | `ECIRCUITBREAKER` | circuit breaker is open |
//! | `ETIMEDOUT` | deadline exceeded |
//! | `EUNKNOWN` | anything unclassified |

use std::fmt;
use std::time::Duration;

use http::StatusCode;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Symbolic error name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorName {
    /// `ECACHEINIT`
    CacheInit,
    /// `ECACHEREAD`
    CacheRead,
    /// `ECACHESTORE`
    CacheStore,
    /// `ENOTJSON`
    NotJson,
    /// `ESTATUS<code>`
    Status(StatusCode),
    /// `ECIRCUITBREAKER`
    CircuitBreaker,
    /// `ETIMEDOUT`
    TimedOut,
    /// `EUNKNOWN`
    Unknown,
}

impl fmt::Display for ErrorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorName::CacheInit => f.write_str("ECACHEINIT"),
            ErrorName::CacheRead => f.write_str("ECACHEREAD"),
            ErrorName::CacheStore => f.write_str("ECACHESTORE"),
            ErrorName::NotJson => f.write_str("ENOTJSON"),
            ErrorName::Status(status) => write!(f, "ESTATUS{}", status.as_u16()),
            ErrorName::CircuitBreaker => f.write_str("ECIRCUITBREAKER"),
            ErrorName::TimedOut => f.write_str("ETIMEDOUT"),
            ErrorName::Unknown => f.write_str("EUNKNOWN"),
        }
    }
}

impl Serialize for ErrorName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Error attached to a [`Context`](crate::Context).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{name}: {message}")]
pub struct ErrorRecord {
    /// Symbolic name.
    pub name: ErrorName,
    /// Human readable message.
    pub message: String,
    /// Optional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Transport failure kind when the record came from the transport.
    #[serde(skip)]
    pub transport: Option<TransportErrorKind>,
}

impl ErrorRecord {
    /// Creates a record without details.
    pub fn new(name: ErrorName, message: impl Into<String>) -> Self {
        Self {
            name,
            message: message.into(),
            details: None,
            transport: None,
        }
    }

    /// Attaches details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// `ECACHEINIT`
    pub fn cache_init() -> Self {
        Self::new(ErrorName::CacheInit, "Cache engine failed to start")
    }

    /// `ECACHEREAD`
    pub fn cache_read() -> Self {
        Self::new(ErrorName::CacheRead, "Failed to read response from cache")
    }

    /// `ECACHESTORE`
    pub fn cache_store() -> Self {
        Self::new(ErrorName::CacheStore, "Failed to write response to cache")
    }

    /// `ENOTJSON`
    pub fn not_json() -> Self {
        Self::new(ErrorName::NotJson, "Response data was not an object")
    }

    /// `ESTATUS<code>`
    pub fn status(status: StatusCode, url: &str) -> Self {
        Self::new(
            ErrorName::Status(status),
            format!("Status code {} received for {url}", status.as_u16()),
        )
    }

    /// `ECIRCUITBREAKER`
    pub fn circuit_breaker(client: &str) -> Self {
        Self::new(
            ErrorName::CircuitBreaker,
            format!("Circuit breaker is open for {client}"),
        )
    }

    /// `ETIMEDOUT`
    pub fn timed_out(timeout: Duration) -> Self {
        Self::new(
            ErrorName::TimedOut,
            format!("Timeout of {}ms exceeded", timeout.as_millis()),
        )
    }

    /// `EUNKNOWN` with the generic message.
    pub fn unknown() -> Self {
        Self::new(ErrorName::Unknown, "An unknown error occurred")
    }

    /// Whether the transport gave up because it was cancelled or timed out.
    pub fn is_transport_timeout(&self) -> bool {
        matches!(
            self.transport,
            Some(TransportErrorKind::Aborted | TransportErrorKind::TimedOut)
        )
    }
}

impl From<TransportError> for ErrorRecord {
    fn from(error: TransportError) -> Self {
        Self {
            name: ErrorName::Unknown,
            message: error.message,
            details: Some(error.kind.as_str().to_owned()),
            transport: Some(error.kind),
        }
    }
}

/// Broad classification of transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The request's cancellation token fired.
    Aborted,
    /// The transport hit its own timeout.
    TimedOut,
    /// Connection could not be established.
    Connect,
    /// Request could not be built or sent.
    Request,
    /// Response body could not be read.
    Body,
    /// Anything else.
    Other,
}

impl TransportErrorKind {
    /// Short code used as error details.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Aborted => "ECONNABORTED",
            TransportErrorKind::TimedOut => "ETIMEDOUT",
            TransportErrorKind::Connect => "ECONNREFUSED",
            TransportErrorKind::Request => "EREQUEST",
            TransportErrorKind::Body => "EBODY",
            TransportErrorKind::Other => "EUNKNOWN",
        }
    }
}

/// Failure reported by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Failure class.
    pub kind: TransportErrorKind,
    /// Transport provided message.
    pub message: String,
}

impl TransportError {
    /// Creates a transport error.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Error for a call aborted through its cancellation token.
    pub fn aborted() -> Self {
        Self::new(TransportErrorKind::Aborted, "Request aborted")
    }
}

/// Error type for cache store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store has not been started.
    #[error("cache store is not ready")]
    NotReady,

    /// Internal store error, state or computation error.
    #[error(transparent)]
    InternalError(Box<dyn std::error::Error + Send + Sync>),

    /// Network interaction error.
    #[error(transparent)]
    ConnectionError(Box<dyn std::error::Error + Send + Sync>),
}

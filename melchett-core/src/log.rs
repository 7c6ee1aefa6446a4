//! Structured request log records and the sink contract.

use serde::Serialize;

/// Record emitted once per settled call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    /// Request URL.
    pub url: String,
    /// Client name.
    pub client: String,
    /// Always `"upstream"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Request identifier.
    pub request_id: String,
    /// HTTP method.
    pub method: String,
    /// Response status, if a response was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// `content-length` response header, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<String>,
    /// `HIT` or `MISS`, if a response was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub melchett_cache: Option<&'static str>,
    /// Upstream duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_duration: Option<f64>,
    /// Symbolic error name on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_name: Option<String>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Error details on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogRecord {
    /// Value of the `type` field.
    pub const KIND: &'static str = "upstream";
}

/// Receiver of per-call log records.
pub trait LogSink: Send + Sync {
    /// A call succeeded.
    fn info(&self, record: &LogRecord);

    /// A call failed.
    fn error(&self, record: &LogRecord);
}

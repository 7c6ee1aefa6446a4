//! Turning a finished [`Context`] into the public result.

use http::header::CONTENT_LENGTH;
use http::{HeaderMap, Method, StatusCode};
use melchett_core::{Context, ErrorRecord, LogRecord, LogSink, ResponseRecord, StageResult};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::metrics;

/// What was sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSummary {
    /// Client name.
    pub client: String,
    /// Request URL.
    pub url: String,
    /// Request identifier, also sent as `x-correlation-id`.
    pub id: Uuid,
    /// Headers as sent.
    #[serde(with = "http_serde::header_map")]
    pub headers: HeaderMap,
    /// HTTP method.
    #[serde(with = "http_serde::method")]
    pub method: Method,
    /// JSON body, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// What came back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseSummary {
    /// Response body. Non-JSON bodies are rendered as a string.
    pub body: Value,
    /// Response headers.
    #[serde(with = "http_serde::header_map")]
    pub headers: HeaderMap,
    /// Status code.
    #[serde(with = "http_serde::status_code")]
    pub status: StatusCode,
    /// Upstream duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Served from the cache.
    #[serde(rename = "melchettCached")]
    pub cached: bool,
}

impl ResponseSummary {
    fn new(record: ResponseRecord, duration: Option<f64>) -> Self {
        Self {
            body: record.body.to_value(),
            headers: record.headers,
            status: record.status,
            duration,
            cached: record.cached,
        }
    }

    fn content_length(&self) -> Option<String> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    }
}

/// A successful call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settled {
    /// Request summary.
    pub request: RequestSummary,
    /// Response summary.
    pub response: ResponseSummary,
}

impl Settled {
    /// Response body.
    pub fn body(&self) -> &Value {
        &self.response.body
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.response.status
    }
}

/// A failed call.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{error}")]
pub struct Failure {
    /// Request summary.
    pub request: RequestSummary,
    /// Response summary, when a response was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseSummary>,
    /// What went wrong.
    pub error: ErrorRecord,
}

/// Consumes `ctx` into the public result, forwarding a log record to `sink`.
///
/// An error on the context always means failure. A rejection or a missing
/// response without a recorded error becomes `EUNKNOWN`.
pub(crate) fn settle(
    mut ctx: Context,
    outcome: StageResult,
    sink: Option<&dyn LogSink>,
) -> Result<Settled, Failure> {
    let duration = ctx.timing.as_ref().and_then(|timing| timing.elapsed_millis());
    let response = ctx
        .response
        .take()
        .map(|record| ResponseSummary::new(record, duration));

    let error = match ctx.error.take() {
        Some(error) => Some(error),
        None if outcome.is_err() || response.is_none() => Some(ErrorRecord::unknown()),
        None => None,
    };

    let client = ctx.client().name.to_string();
    let request = ctx.request();
    let request = RequestSummary {
        client,
        url: request.url().to_owned(),
        id: request.id(),
        headers: request.headers().clone(),
        method: request.method().clone(),
        body: request.body().cloned(),
    };

    let record = log_record(&request, response.as_ref(), error.as_ref());
    metrics::record_request(
        &request.client,
        if error.is_some() { "failure" } else { "success" },
        duration,
    );

    match (error, response) {
        (None, Some(response)) => {
            if let Some(sink) = sink {
                sink.info(&record);
            }
            Ok(Settled { request, response })
        }
        (error, response) => {
            if let Some(sink) = sink {
                sink.error(&record);
            }
            Err(Failure {
                request,
                response,
                error: error.unwrap_or_else(ErrorRecord::unknown),
            })
        }
    }
}

fn log_record(
    request: &RequestSummary,
    response: Option<&ResponseSummary>,
    error: Option<&ErrorRecord>,
) -> LogRecord {
    LogRecord {
        url: request.url.clone(),
        client: request.client.clone(),
        kind: LogRecord::KIND,
        request_id: request.id.to_string(),
        method: request.method.to_string(),
        status_code: response.map(|response| response.status.as_u16()),
        content_length: response.and_then(ResponseSummary::content_length),
        melchett_cache: response.map(|response| if response.cached { "HIT" } else { "MISS" }),
        upstream_duration: response.and_then(|response| response.duration),
        error_name: error.map(|error| error.name.to_string()),
        error_message: error.map(|error| error.message.clone()),
        error_details: error.and_then(|error| error.details.clone()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use melchett_core::{
        ClientIdentity, ErrorName, Rejected, RequestDescriptor, ResponseBody, TimingRecord,
    };
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct Capture {
        info: Mutex<Vec<LogRecord>>,
        error: Mutex<Vec<LogRecord>>,
    }

    impl LogSink for Capture {
        fn info(&self, record: &LogRecord) {
            self.info.lock().unwrap().push(record.clone());
        }

        fn error(&self, record: &LogRecord) {
            self.error.lock().unwrap().push(record.clone());
        }
    }

    fn context() -> Context {
        Context::new(
            Arc::new(ClientIdentity::new("users", "melchett-test")),
            RequestDescriptor::new(
                Uuid::new_v4(),
                Method::GET,
                "http://upstream/users/1",
                HeaderMap::new(),
                None,
            ),
        )
    }

    fn ok_response(body: ResponseBody) -> ResponseRecord {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, "10".parse().unwrap());
        ResponseRecord::new(StatusCode::OK, headers, body)
    }

    #[test]
    fn resolves_with_request_and_response() {
        let sink = Capture::default();
        let mut ctx = context();
        ctx.response = Some(ok_response(ResponseBody::Json(json!({"data": 1}))));
        let mut timing = TimingRecord::start();
        timing.finish(std::time::Duration::from_millis(12));
        ctx.timing = Some(timing);

        let settled = settle(ctx, Ok(()), Some(&sink)).unwrap();

        assert_eq!(settled.status(), StatusCode::OK);
        assert_eq!(settled.body(), &json!({"data": 1}));
        assert_eq!(settled.request.client, "users");
        assert_eq!(settled.response.duration, Some(12.0));
        assert!(!settled.response.cached);

        let info = sink.info.lock().unwrap();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].status_code, Some(200));
        assert_eq!(info[0].content_length.as_deref(), Some("10"));
        assert_eq!(info[0].melchett_cache, Some("MISS"));
        assert_eq!(info[0].upstream_duration, Some(12.0));
        assert!(sink.error.lock().unwrap().is_empty());
    }

    #[test]
    fn error_wins_over_response() {
        let sink = Capture::default();
        let mut ctx = context();
        ctx.response = Some(ok_response(ResponseBody::Raw(Bytes::from_static(b"<html>"))));
        ctx.error = Some(ErrorRecord::not_json());

        let failure = settle(ctx, Err(Rejected), Some(&sink)).unwrap_err();

        assert_eq!(failure.error.name, ErrorName::NotJson);
        let response = failure.response.unwrap();
        assert_eq!(response.body, json!("<html>"));

        let errors = sink.error.lock().unwrap();
        assert_eq!(errors[0].error_name.as_deref(), Some("ENOTJSON"));
        assert_eq!(errors[0].status_code, Some(200));
    }

    #[test]
    fn empty_context_becomes_unknown() {
        let failure = settle(context(), Ok(()), None).unwrap_err();
        assert_eq!(failure.error.name, ErrorName::Unknown);
        assert_eq!(failure.error.message, "An unknown error occurred");
        assert!(failure.response.is_none());
    }

    #[test]
    fn rejection_without_error_becomes_unknown() {
        let mut ctx = context();
        ctx.response = Some(ok_response(ResponseBody::Json(json!([]))));

        let failure = settle(ctx, Err(Rejected), None).unwrap_err();

        assert_eq!(failure.error.name, ErrorName::Unknown);
        assert!(failure.response.is_some());
    }

    #[test]
    fn serializes_cached_flag_under_public_name() {
        let mut ctx = context();
        let mut record = ok_response(ResponseBody::Json(json!({})));
        record.cached = true;
        ctx.response = Some(record);

        let settled = settle(ctx, Ok(()), None).unwrap();
        let value = serde_json::to_value(&settled).unwrap();

        assert_eq!(value["response"]["melchettCached"], json!(true));
        assert_eq!(value["request"]["method"], json!("GET"));
    }
}

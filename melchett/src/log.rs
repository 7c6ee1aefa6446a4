//! Default log sink.

use melchett_core::{LogRecord, LogSink};
use tracing::{error, info};

/// Emits [`LogRecord`]s as `tracing` events with one field per record field.
///
/// Successful calls are logged at `INFO`, failures at `ERROR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn info(&self, record: &LogRecord) {
        info!(
            url = %record.url,
            client = %record.client,
            "type" = record.kind,
            request_id = %record.request_id,
            method = %record.method,
            status_code = record.status_code,
            content_length = record.content_length.as_deref(),
            melchett_cache = record.melchett_cache,
            upstream_duration = record.upstream_duration,
            "upstream call succeeded"
        );
    }

    fn error(&self, record: &LogRecord) {
        error!(
            url = %record.url,
            client = %record.client,
            "type" = record.kind,
            request_id = %record.request_id,
            method = %record.method,
            status_code = record.status_code,
            content_length = record.content_length.as_deref(),
            melchett_cache = record.melchett_cache,
            upstream_duration = record.upstream_duration,
            error_name = record.error_name.as_deref(),
            error_message = record.error_message.as_deref(),
            error_details = record.error_details.as_deref(),
            "upstream call failed"
        );
    }
}

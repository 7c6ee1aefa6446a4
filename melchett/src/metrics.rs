//! Metrics declaration and recording.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of settled calls.
    pub static ref REQUESTS_TOTAL: &'static str = {
        metrics::describe_counter!(
            "melchett_requests_total",
            "Total number of settled upstream calls."
        );
        "melchett_requests_total"
    };
    /// Track number of responses served from the cache.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "melchett_cache_hit_total",
            "Total number of cache hit events."
        );
        "melchett_cache_hit_total"
    };
    /// Track number of cache lookups that found nothing.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "melchett_cache_miss_total",
            "Total number of cache miss events."
        );
        "melchett_cache_miss_total"
    };
    /// Track number of calls rejected by an open circuit.
    pub static ref CIRCUIT_REJECTED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "melchett_circuit_rejected_total",
            "Total number of calls rejected by an open circuit breaker."
        );
        "melchett_circuit_rejected_total"
    };
    /// Histogram of upstream call duration.
    pub static ref UPSTREAM_DURATION: &'static str = {
        metrics::describe_histogram!(
            "melchett_upstream_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of upstream calls in seconds."
        );
        "melchett_upstream_duration_seconds"
    };
}

/// Records a settled call and, when known, its upstream duration.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_request(client: &str, outcome: &'static str, duration_ms: Option<f64>) {
    metrics::counter!(
        *REQUESTS_TOTAL,
        "client" => client.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    if let Some(ms) = duration_ms {
        metrics::histogram!(*UPSTREAM_DURATION, "client" => client.to_string())
            .record(ms / 1000.0);
    }
}

/// Records a cache lookup result.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_cache_lookup(client: &str, hit: bool) {
    let counter = if hit {
        *CACHE_HIT_COUNTER
    } else {
        *CACHE_MISS_COUNTER
    };
    metrics::counter!(counter, "client" => client.to_string()).increment(1);
}

/// Records a call rejected by an open circuit.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_circuit_rejected(client: &str) {
    metrics::counter!(*CIRCUIT_REJECTED_COUNTER, "client" => client.to_string()).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_request(_client: &str, _outcome: &'static str, _duration_ms: Option<f64>) {}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_cache_lookup(_client: &str, _hit: bool) {}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_circuit_rejected(_client: &str) {}

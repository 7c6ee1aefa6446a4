//! Built-in pipeline stages.
//!
//! A client runs them in a fixed order, outermost first:
//!
//! ```text
//! Cache → Json → Status → Timer → CircuitBreaker → transport
//! ```
//!
//! The cache and circuit breaker stages are only present when configured.

use std::sync::Arc;

use http::StatusCode;

pub mod breaker;
pub mod cache;
pub mod json;
pub mod status;
pub mod timer;

pub use breaker::CircuitBreakerStage;
pub use cache::CacheStage;
pub use json::JsonStage;
pub use status::StatusStage;
pub use timer::TimerStage;

/// Shared predicate over response status codes.
pub type StatusPredicate = Arc<dyn Fn(StatusCode) -> bool + Send + Sync>;

/// Default success predicate: `200..400`.
pub fn default_success(status: StatusCode) -> bool {
    (200..400).contains(&status.as_u16())
}

/// Default breaker failure predicate: server errors.
pub fn default_breaker_failure(status: StatusCode) -> bool {
    status.is_server_error()
}

//! Serializable client settings.
//!
//! Settings describe everything about a client that can live in a config
//! file. Collaborators that can't (transport, cache store, log sink,
//! predicates) are supplied to the [`ClientBuilder`](crate::ClientBuilder)
//! directly.
//!
//! ```yaml
//! name: users
//! timeout: 2s
//! timing_header: x-response-time
//! circuit_breaker:
//!   error_threshold_percentage: 25
//!   reset_timeout: 10s
//! cache:
//!   cache_ttl: 1h
//!   do_not_vary: [x-request-start]
//! ```

use std::time::Duration;

use melchett_core::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default client name, also the cache namespace.
pub const DEFAULT_NAME: &str = "http";

/// Default per-call deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1500);

/// Default cache TTL ceiling.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(7200);

/// Default `user-agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("melchett/", env!("CARGO_PKG_VERSION"));

/// Invalid settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Error threshold outside `0..=100`.
    #[error("error threshold percentage must be within 0..=100, got {0}")]
    InvalidThreshold(f64),

    /// Zero request timeout.
    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    /// Zero rolling buckets.
    #[error("rolling buckets must be greater than zero")]
    ZeroBuckets,

    /// More buckets than milliseconds in the window.
    #[error("{buckets} rolling buckets do not fit a {window_ms}ms window")]
    BucketsExceedWindow {
        /// Configured bucket count.
        buckets: u32,
        /// Window length in milliseconds.
        window_ms: u128,
    },

    /// Cache settings given without a store to apply them to.
    #[error("cache settings require a cache store")]
    MissingCacheStore,

    /// A header name or value that is not valid HTTP.
    #[error("invalid header {name}: {reason}")]
    InvalidHeader {
        /// Header name.
        name: String,
        /// Parse failure.
        reason: String,
    },
}

fn default_name() -> String {
    DEFAULT_NAME.to_owned()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

/// Top level client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Client name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Per-call deadline (e.g. `"1500ms"`, `"2s"`).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// `user-agent` sent unless a call overrides it.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Response header holding the upstream's own timing in milliseconds.
    #[serde(default)]
    pub timing_header: Option<String>,
    /// Circuit breaker, disabled when absent.
    #[serde(default)]
    pub circuit_breaker: Option<CircuitBreakerSettings>,
    /// Cache policy, disabled when absent. Also needs a store on the builder.
    #[serde(default)]
    pub cache: Option<CacheSettings>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            timing_header: None,
            circuit_breaker: None,
            cache: None,
        }
    }
}

impl ClientSettings {
    /// Checks every nested section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if let Some(breaker) = &self.circuit_breaker {
            breaker.validate()?;
        }
        Ok(())
    }
}

/// Circuit breaker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Error percentage the rolling window must exceed to open.
    pub error_threshold_percentage: f64,
    /// Time spent open before a trial call.
    #[serde(with = "humantime_serde")]
    pub reset_timeout: Duration,
    /// Rolling statistics window.
    #[serde(with = "humantime_serde")]
    pub rolling_window: Duration,
    /// Buckets in the window.
    pub rolling_buckets: u32,
    /// Minimum calls in the window before opening.
    pub volume_threshold: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        CircuitBreakerConfig::default().into()
    }
}

impl CircuitBreakerSettings {
    /// Checks threshold range and window geometry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.error_threshold_percentage) {
            return Err(ConfigError::InvalidThreshold(
                self.error_threshold_percentage,
            ));
        }
        if self.rolling_buckets == 0 {
            return Err(ConfigError::ZeroBuckets);
        }
        let window_ms = self.rolling_window.as_millis();
        if u128::from(self.rolling_buckets) > window_ms {
            return Err(ConfigError::BucketsExceedWindow {
                buckets: self.rolling_buckets,
                window_ms,
            });
        }
        Ok(())
    }
}

impl From<CircuitBreakerConfig> for CircuitBreakerSettings {
    fn from(config: CircuitBreakerConfig) -> Self {
        Self {
            error_threshold_percentage: config.error_threshold_percentage,
            reset_timeout: config.reset_timeout,
            rolling_window: config.rolling_window,
            rolling_buckets: config.rolling_buckets,
            volume_threshold: config.volume_threshold,
        }
    }
}

impl From<&CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &CircuitBreakerSettings) -> Self {
        Self {
            error_threshold_percentage: settings.error_threshold_percentage,
            reset_timeout: settings.reset_timeout,
            rolling_window: settings.rolling_window,
            rolling_buckets: settings.rolling_buckets,
            volume_threshold: settings.volume_threshold,
        }
    }
}

/// Cache policy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Upper bound on entry lifetime (e.g. `"2h"`).
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
    /// Request headers left out of the cache key. `x-correlation-id` is
    /// always added.
    pub do_not_vary: Vec<String>,
    /// Downgrade store failures to pass-through.
    pub ignore_errors: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            do_not_vary: Vec::new(),
            ignore_errors: false,
        }
    }
}

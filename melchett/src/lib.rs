#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! # melchett
//!
//! An HTTP client that runs every outbound call through a fixed middleware
//! pipeline:
//!
//! ```text
//! Cache → Json → Status → Timer → CircuitBreaker → transport
//! ```
//!
//! Each call resolves to [`Settled`] or fails with a [`Failure`] carrying one
//! of the symbolic error names from [`ErrorName`]. Transports and cache stores
//! are pluggable; see `melchett-reqwest` and `melchett-moka`.

/// Cache-control parsing, cacheability and TTL derivation.
pub mod cache_control;

/// The public client and its typestate builder.
pub mod client;

/// Serializable client settings and validation errors.
pub mod config;

mod executor;

/// Deterministic request fingerprints used as cache ids.
pub mod hash;

/// `tracing` backed log sink.
pub mod log;

/// Metrics collection.
///
/// When the `metrics` feature is enabled, this module records counters for
/// settled calls, cache hits and misses and circuit rejections, plus a
/// histogram of upstream durations. Without the feature every function is a
/// no-op.
pub mod metrics;

/// Stage list composition.
pub mod pipeline;

mod settle;

/// Built-in stages.
pub mod stages;

pub use client::{ClientBuilder, HttpClient, NotSet};
pub use config::{CacheSettings, CircuitBreakerSettings, ClientSettings, ConfigError};
pub use executor::TransportTerminal;
pub use log::TracingLogSink;
pub use pipeline::Pipeline;
pub use settle::{Failure, RequestSummary, ResponseSummary, Settled};

pub use melchett_core::{
    CORRELATION_ID_HEADER, CacheKey, CacheStore, CachedResponse, CircuitBreaker,
    CircuitBreakerConfig, CircuitState, ClientIdentity, ClientState, Context, ErrorName,
    ErrorRecord, LogRecord, LogSink, Next, Rejected, RequestDescriptor, ResponseBody,
    ResponseRecord, Stage, StageResult, StoreError, StoreResult, Terminal, TimingRecord, Transport,
    TransportError, TransportErrorKind,
};

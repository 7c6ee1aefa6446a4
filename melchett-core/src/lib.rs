#![warn(missing_docs)]
//! # melchett-core
//!
//! Core types and contracts for the melchett middleware HTTP client.
//!
//! This crate holds everything the request lifecycle engine and its
//! integrations agree on, without depending on any concrete transport or
//! storage engine:
//!
//! - **Data model**: [`RequestDescriptor`], [`ResponseRecord`], [`ErrorRecord`],
//!   [`TimingRecord`] and the per-call [`Context`] that carries them
//! - **Composition**: the [`Stage`] trait and the [`Next`] continuation that
//!   drives an ordered list of stages around a [`Terminal`]
//! - **Shared client state**: [`ClientState`] and the [`CircuitBreaker`] it owns
//! - **Collaborators**: [`Transport`], [`CacheStore`] and [`LogSink`]
//!
//! ## Lifecycle
//!
//! ```text
//! Context ──▶ stage 1 ──▶ stage 2 ──▶ … ──▶ Terminal (transport call)
//!                │           │                     │
//!                ◀───────────◀─────────────────────┘  post-logic, innermost first
//! ```

pub mod breaker;
pub mod context;
pub mod error;
pub mod log;
pub mod request;
pub mod response;
pub mod stage;
pub mod store;
pub mod timing;
pub mod transport;

pub use breaker::{
    BreakerPermit, CircuitBreaker, CircuitBreakerConfig, CircuitOpen, CircuitState, WindowCounts,
};
pub use context::{ClientIdentity, ClientState, Context};
pub use error::{ErrorName, ErrorRecord, StoreError, TransportError, TransportErrorKind};
pub use log::{LogRecord, LogSink};
pub use request::{CORRELATION_ID_HEADER, RequestDescriptor};
pub use response::{CachedResponse, ResponseBody, ResponseRecord};
pub use stage::{Next, Rejected, Stage, StageResult, Terminal};
pub use store::{CacheKey, CacheStore, StoreResult};
pub use timing::TimingRecord;
pub use transport::Transport;

#[doc(hidden)]
pub use smol_str::SmolStr;

//! # melchett-reqwest
//!
//! [`Transport`](melchett_core::Transport) implementation backed by
//! [`reqwest`].
//!
//! ```ignore
//! use melchett::HttpClient;
//! use melchett_reqwest::ReqwestTransport;
//!
//! let client = HttpClient::builder()
//!     .name("users")
//!     .transport(ReqwestTransport::new()?)
//!     .build()?;
//! ```
//!
//! The transport owns everything below the pipeline: connection pooling,
//! TLS and redirects. It never applies its own timeout; the client's timer
//! stage cancels the call through the request's cancellation token and the
//! transport drops the in-flight future when that happens.

mod options;
mod transport;

pub use options::{AgentOptions, BuildError};
pub use transport::ReqwestTransport;

//! Per-call context and long-lived client state.

use std::sync::{Arc, OnceLock};

use smol_str::SmolStr;

use crate::breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::error::ErrorRecord;
use crate::request::RequestDescriptor;
use crate::response::ResponseRecord;
use crate::stage::{Rejected, StageResult};
use crate::timing::TimingRecord;

/// State shared by every call issued through one client.
///
/// Concurrent calls only ever meet here, so everything inside is
/// synchronized.
#[derive(Debug, Default)]
pub struct ClientState {
    breaker: OnceLock<CircuitBreaker>,
}

impl ClientState {
    /// Creates empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the client's breaker, creating it from `config` on first use.
    ///
    /// Later calls return the same instance and ignore `config`.
    pub fn breaker_or_init(&self, config: &CircuitBreakerConfig) -> &CircuitBreaker {
        self.breaker
            .get_or_init(|| CircuitBreaker::new(config.clone()))
    }

    /// The breaker, if a request has created it yet.
    pub fn breaker(&self) -> Option<&CircuitBreaker> {
        self.breaker.get()
    }
}

/// Identity of the client a call was issued through.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    /// Client name, also the cache namespace.
    pub name: SmolStr,
    /// Configured user agent.
    pub user_agent: String,
    /// Shared mutable client state.
    pub state: Arc<ClientState>,
}

impl ClientIdentity {
    /// Creates an identity with fresh state.
    pub fn new(name: impl Into<SmolStr>, user_agent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            user_agent: user_agent.into(),
            state: Arc::new(ClientState::new()),
        }
    }
}

/// Mutable record of one call, threaded through every stage.
#[derive(Debug)]
pub struct Context {
    client: Arc<ClientIdentity>,
    request: RequestDescriptor,
    /// Response, from the transport or the cache.
    pub response: Option<ResponseRecord>,
    /// Error recorded by the transport or a stage.
    pub error: Option<ErrorRecord>,
    /// Timing of the transport leg.
    pub timing: Option<TimingRecord>,
}

impl Context {
    /// Creates a context for `request` issued through `client`.
    pub fn new(client: Arc<ClientIdentity>, request: RequestDescriptor) -> Self {
        Self {
            client,
            request,
            response: None,
            error: None,
            timing: None,
        }
    }

    /// Client the call belongs to.
    pub fn client(&self) -> &ClientIdentity {
        &self.client
    }

    /// The frozen request.
    pub fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    /// Records `error` and rejects the chain.
    pub fn reject(&mut self, error: ErrorRecord) -> StageResult {
        self.error = Some(error);
        Err(Rejected)
    }
}

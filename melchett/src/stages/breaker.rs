//! Circuit breaker stage.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use melchett_core::{
    CircuitBreakerConfig, CircuitState, Context, ErrorRecord, Next, Stage, StageResult,
};
use tracing::{debug, info, warn};

use super::{StatusPredicate, default_breaker_failure};
use crate::metrics;

/// Fast-fails calls while the client's circuit is open.
///
/// The breaker itself lives on the client state and is created by the first
/// call. A call counts as a failure when the inner chain rejects, the
/// transport recorded an error, or the response status matches the failure
/// predicate. Failing statuses are counted but not rejected here.
#[derive(Clone)]
pub struct CircuitBreakerStage {
    config: CircuitBreakerConfig,
    is_failure: StatusPredicate,
}

impl CircuitBreakerStage {
    /// Stage counting server errors as failures.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_failure_predicate(config, Arc::new(default_breaker_failure))
    }

    /// Stage with a custom failure predicate.
    pub fn with_failure_predicate(config: CircuitBreakerConfig, is_failure: StatusPredicate) -> Self {
        Self { config, is_failure }
    }
}

impl fmt::Debug for CircuitBreakerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerStage")
            .field("config", &self.config)
            .field("is_failure", &"...")
            .finish()
    }
}

#[async_trait]
impl Stage for CircuitBreakerStage {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> StageResult {
        let state = Arc::clone(&ctx.client().state);
        let breaker = state.breaker_or_init(&self.config);

        let Ok(permit) = breaker.try_acquire() else {
            debug!(client = %ctx.client().name, "circuit open, rejecting call");
            metrics::record_circuit_rejected(&ctx.client().name);
            let error = ErrorRecord::circuit_breaker(&ctx.client().name);
            return ctx.reject(error);
        };
        let trial = permit.is_trial();

        let result = next.run(ctx).await;

        let failed = result.is_err()
            || ctx.error.is_some()
            || ctx
                .response
                .as_ref()
                .is_some_and(|response| (self.is_failure)(response.status));

        match permit.record(failed) {
            Some(CircuitState::Open) if trial => {
                warn!(client = %ctx.client().name, "trial call failed, circuit re-opened")
            }
            Some(CircuitState::Open) => {
                let counts = breaker.counts();
                warn!(
                    client = %ctx.client().name,
                    failures = counts.failures,
                    total = counts.total(),
                    "circuit opened"
                )
            }
            Some(CircuitState::Closed) => info!(client = %ctx.client().name, "circuit closed"),
            _ => {}
        }

        result
    }
}

//! Status code validation.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use melchett_core::{Context, ErrorRecord, Next, Stage, StageResult};

use super::{StatusPredicate, default_success};

/// Rejects responses whose status fails the success predicate.
#[derive(Clone)]
pub struct StatusStage {
    is_success: StatusPredicate,
}

impl StatusStage {
    /// Stage with a custom predicate.
    pub fn new(is_success: StatusPredicate) -> Self {
        Self { is_success }
    }
}

impl Default for StatusStage {
    fn default() -> Self {
        Self::new(Arc::new(default_success))
    }
}

impl fmt::Debug for StatusStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusStage")
            .field("is_success", &"...")
            .finish()
    }
}

#[async_trait]
impl Stage for StatusStage {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> StageResult {
        next.run(ctx).await?;

        let Some(status) = ctx.response.as_ref().map(|response| response.status) else {
            return Ok(());
        };
        if (self.is_success)(status) {
            return Ok(());
        }

        let details = ctx
            .error
            .as_ref()
            .map(|error| error.message.clone())
            .unwrap_or_default();
        let error = ErrorRecord::status(status, ctx.request().url()).with_details(details);
        ctx.reject(error)
    }
}

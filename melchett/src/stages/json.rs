//! JSON body validation.

use async_trait::async_trait;
use melchett_core::{Context, ErrorRecord, Next, Rejected, Stage, StageResult};

/// Rejects responses whose body is not a JSON object or array.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStage;

#[async_trait]
impl Stage for JsonStage {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> StageResult {
        next.run(ctx).await?;

        match &ctx.response {
            Some(response) if response.body.is_structured() => Ok(()),
            // Keep the transport's own error.
            None if ctx.error.is_some() => Err(Rejected),
            _ => ctx.reject(ErrorRecord::not_json()),
        }
    }
}

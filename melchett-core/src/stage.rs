//! Stage and terminal traits, and the continuation that chains them.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::context::Context;

/// Marker returned when a stage rejects the call.
///
/// The reason lives on [`Context::error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request rejected by the pipeline")]
pub struct Rejected;

/// Outcome of running a stage.
pub type StageResult = Result<(), Rejected>;

/// A unit of request processing wrapped around the rest of the chain.
///
/// A stage may act before delegating, decide not to delegate at all (serving
/// from the cache, failing fast), and act after the inner stages finish.
#[async_trait]
pub trait Stage: Send + Sync + 'static {
    /// Processes `ctx`, calling [`Next::run`] to hand over to the inner chain.
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> StageResult;
}

/// Innermost step of the chain. Never rejects; failures are recorded on the
/// context.
#[async_trait]
pub trait Terminal: Send + Sync + 'static {
    /// Performs the call.
    async fn call(&self, ctx: &mut Context);
}

/// Remainder of the chain after the current stage.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    terminal: &'a dyn Terminal,
}

impl<'a> Next<'a> {
    /// Chain of `stages` ending in `terminal`.
    pub fn new(stages: &'a [Arc<dyn Stage>], terminal: &'a dyn Terminal) -> Self {
        Self { stages, terminal }
    }

    /// Runs the remaining stages and finally the terminal.
    pub fn run<'c>(mut self, ctx: &'c mut Context) -> BoxFuture<'c, StageResult>
    where
        'a: 'c,
    {
        if let Some((current, rest)) = self.stages.split_first() {
            self.stages = rest;
            current.handle(ctx, self)
        } else {
            let terminal = self.terminal;
            Box::pin(async move {
                terminal.call(ctx).await;
                Ok(())
            })
        }
    }

    /// Number of stages still ahead.
    pub fn remaining(&self) -> usize {
        self.stages.len()
    }
}

//! Request execution: building the context, running the pipeline, settling.

use std::sync::Arc;

use async_trait::async_trait;
use http::header::{HeaderMap, HeaderValue, USER_AGENT};
use http::Method;
use melchett_core::{ClientIdentity, Context, ErrorRecord, LogSink, RequestDescriptor, Terminal, Transport};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::pipeline::Pipeline;
use crate::settle::{Failure, Settled, settle};

/// Innermost step: hands the frozen request to the transport.
pub struct TransportTerminal {
    transport: Arc<dyn Transport>,
}

impl TransportTerminal {
    /// Wraps `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl Terminal for TransportTerminal {
    async fn call(&self, ctx: &mut Context) {
        match self.transport.execute(ctx.request()).await {
            Ok(response) => ctx.response = Some(response),
            Err(error) => {
                debug!(url = ctx.request().url(), kind = error.kind.as_str(), %error, "transport failed");
                ctx.error = Some(ErrorRecord::from(error));
            }
        }
    }
}

/// Runs calls for one client.
pub(crate) struct Executor {
    pub(crate) client: Arc<ClientIdentity>,
    pub(crate) user_agent: HeaderValue,
    pub(crate) pipeline: Pipeline,
    pub(crate) log_sink: Option<Arc<dyn LogSink>>,
}

impl Executor {
    pub(crate) async fn execute(
        &self,
        method: Method,
        url: String,
        mut headers: HeaderMap,
        body: Option<Value>,
    ) -> Result<Settled, Failure> {
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, self.user_agent.clone());
        }
        let request = RequestDescriptor::new(Uuid::new_v4(), method, url, headers, body);
        let mut ctx = Context::new(Arc::clone(&self.client), request);

        let outcome = self.pipeline.run(&mut ctx).await;
        settle(ctx, outcome, self.log_sink.as_deref())
    }
}

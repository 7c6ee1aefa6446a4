//! [`Transport`] over a pooled [`reqwest::Client`].

use async_trait::async_trait;
use http::header::{CONTENT_TYPE, HeaderValue};
use melchett_core::{
    RequestDescriptor, ResponseBody, ResponseRecord, Transport, TransportError,
    TransportErrorKind,
};
use tracing::debug;

use crate::options::{AgentOptions, BuildError};

/// Transport executing calls with `reqwest`.
///
/// Cloning is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Transport with a default client.
    pub fn new() -> Result<Self, BuildError> {
        Self::with_agent_options(&AgentOptions::default())
    }

    /// Transport whose client carries the given TLS material.
    pub fn with_agent_options(options: &AgentOptions) -> Result<Self, BuildError> {
        let builder = options.apply(reqwest::Client::builder())?;
        let client = builder.build().map_err(BuildError::Client)?;
        Ok(Self { client })
    }

    /// Wraps an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    async fn send(&self, request: &RequestDescriptor) -> Result<ResponseRecord, TransportError> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url())
            .headers(request.headers().clone());

        if let Some(body) = request.body() {
            let payload = serde_json::to_vec(body)
                .map_err(|error| TransportError::new(TransportErrorKind::Request, error.to_string()))?;
            if !request.headers().contains_key(CONTENT_TYPE) {
                builder = builder.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            builder = builder.body(payload);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(transport_error)?;

        Ok(ResponseRecord::new(status, headers, ResponseBody::from_bytes(bytes)))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &RequestDescriptor) -> Result<ResponseRecord, TransportError> {
        tokio::select! {
            biased;
            _ = request.cancellation().cancelled() => {
                debug!(request_id = %request.id(), url = request.url(), "request aborted");
                Err(TransportError::aborted())
            }
            result = self.send(request) => result,
        }
    }
}

fn transport_error(error: reqwest::Error) -> TransportError {
    let kind = if error.is_timeout() {
        TransportErrorKind::TimedOut
    } else if error.is_connect() {
        TransportErrorKind::Connect
    } else if error.is_body() || error.is_decode() {
        TransportErrorKind::Body
    } else if error.is_builder() || error.is_request() {
        TransportErrorKind::Request
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, error.to_string())
}

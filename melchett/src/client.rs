//! The public client and its builder.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use http::{Method, StatusCode};
use melchett_core::{
    CacheStore, CircuitBreakerConfig, ClientIdentity, ClientState, LogSink, Stage, Transport,
};
use serde_json::Value;

use crate::config::{
    CacheSettings, CircuitBreakerSettings, ClientSettings, ConfigError, DEFAULT_USER_AGENT,
};
use crate::executor::{Executor, TransportTerminal};
use crate::log::TracingLogSink;
use crate::pipeline::Pipeline;
use crate::settle::{Failure, Settled};
use crate::stages::{
    CacheStage, CircuitBreakerStage, JsonStage, StatusPredicate, StatusStage, TimerStage,
};

/// HTTP client running every call through the melchett pipeline.
///
/// Cheap to clone; clones share the circuit breaker and cache.
///
/// ```ignore
/// let client = HttpClient::builder()
///     .name("users")
///     .timeout(Duration::from_secs(2))
///     .transport(ReqwestTransport::new()?)
///     .build()?;
///
/// let settled = client.get("https://users.internal/users/1", None).await?;
/// println!("{}", settled.body());
/// ```
#[derive(Clone)]
pub struct HttpClient {
    executor: Arc<Executor>,
}

impl HttpClient {
    /// Starts building a client.
    pub fn builder() -> ClientBuilder<NotSet> {
        ClientBuilder::new()
    }

    /// Client name.
    pub fn name(&self) -> &str {
        &self.executor.client.name
    }

    /// State shared by every call of this client.
    pub fn state(&self) -> &ClientState {
        &self.executor.client.state
    }

    /// Issues a GET.
    pub async fn get(
        &self,
        url: impl Into<String>,
        headers: Option<HeaderMap>,
    ) -> Result<Settled, Failure> {
        self.request(Method::GET, url, headers, None).await
    }

    /// Issues a POST with a JSON body.
    pub async fn post(
        &self,
        url: impl Into<String>,
        body: Value,
        headers: Option<HeaderMap>,
    ) -> Result<Settled, Failure> {
        self.request(Method::POST, url, headers, Some(body)).await
    }

    /// Issues a DELETE.
    pub async fn delete(
        &self,
        url: impl Into<String>,
        headers: Option<HeaderMap>,
    ) -> Result<Settled, Failure> {
        self.request(Method::DELETE, url, headers, None).await
    }

    /// Issues a call with any method.
    pub async fn request(
        &self,
        method: Method,
        url: impl Into<String>,
        headers: Option<HeaderMap>,
        body: Option<Value>,
    ) -> Result<Settled, Failure> {
        self.executor
            .execute(method, url.into(), headers.unwrap_or_default(), body)
            .await
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("name", &self.executor.client.name)
            .field("pipeline", &self.executor.pipeline)
            .finish()
    }
}

/// Marker type for an unset builder field.
///
/// When you see `NotSet` in a compiler error, [`ClientBuilder::transport`]
/// has not been called yet.
#[derive(Debug, Clone, Copy)]
pub struct NotSet;

/// Builder for [`HttpClient`].
pub struct ClientBuilder<T> {
    settings: ClientSettings,
    transport: T,
    success_predicate: Option<StatusPredicate>,
    breaker_failure_predicate: Option<StatusPredicate>,
    cache_store: Option<Arc<dyn CacheStore>>,
    log_sink: Option<Arc<dyn LogSink>>,
}

impl ClientBuilder<NotSet> {
    /// Builder with default settings and no transport.
    pub fn new() -> Self {
        Self {
            settings: ClientSettings::default(),
            transport: NotSet,
            success_predicate: None,
            breaker_failure_predicate: None,
            cache_store: None,
            log_sink: None,
        }
    }
}

impl Default for ClientBuilder<NotSet> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ClientBuilder<T> {
    /// Replaces all serializable settings at once.
    pub fn settings(mut self, settings: ClientSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Client name, also the cache namespace.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.settings.name = name.into();
        self
    }

    /// Per-call deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// `user-agent` sent unless a call sets its own.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.settings.user_agent = Some(user_agent.into());
        self
    }

    /// Response header carrying the upstream's own duration in milliseconds.
    pub fn timing_header(mut self, name: impl Into<String>) -> Self {
        self.settings.timing_header = Some(name.into());
        self
    }

    /// Enables the circuit breaker.
    pub fn circuit_breaker(mut self, settings: CircuitBreakerSettings) -> Self {
        self.settings.circuit_breaker = Some(settings);
        self
    }

    /// Statuses the status stage accepts. Defaults to `200..400`.
    pub fn success_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(StatusCode) -> bool + Send + Sync + 'static,
    {
        self.success_predicate = Some(Arc::new(predicate));
        self
    }

    /// Statuses the circuit breaker counts as failures. Defaults to 5xx.
    pub fn breaker_failure_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(StatusCode) -> bool + Send + Sync + 'static,
    {
        self.breaker_failure_predicate = Some(Arc::new(predicate));
        self
    }

    /// Enables caching in `store` with `settings`.
    pub fn cache<S>(mut self, store: S, settings: CacheSettings) -> Self
    where
        S: CacheStore + 'static,
    {
        self.cache_store = Some(Arc::new(store));
        self.settings.cache = Some(settings);
        self
    }

    /// Sets the cache store, keeping cache settings from
    /// [`settings`](Self::settings) or the defaults.
    pub fn cache_store<S>(mut self, store: S) -> Self
    where
        S: CacheStore + 'static,
    {
        self.cache_store = Some(Arc::new(store));
        self
    }

    /// Receiver for per-call log records. Defaults to [`TracingLogSink`].
    pub fn log_sink<L>(mut self, sink: L) -> Self
    where
        L: LogSink + 'static,
    {
        self.log_sink = Some(Arc::new(sink));
        self
    }

    /// Sets the transport.
    pub fn transport<X>(self, transport: X) -> ClientBuilder<X>
    where
        X: Transport + 'static,
    {
        ClientBuilder {
            settings: self.settings,
            transport,
            success_predicate: self.success_predicate,
            breaker_failure_predicate: self.breaker_failure_predicate,
            cache_store: self.cache_store,
            log_sink: self.log_sink,
        }
    }
}

impl<X> ClientBuilder<X>
where
    X: Transport + 'static,
{
    /// Validates the settings and resolves the stage list.
    pub fn build(self) -> Result<HttpClient, ConfigError> {
        let Self {
            settings,
            transport,
            success_predicate,
            breaker_failure_predicate,
            cache_store,
            log_sink,
        } = self;
        settings.validate()?;

        let user_agent = settings
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());
        let user_agent_value =
            HeaderValue::from_str(&user_agent).map_err(|error| ConfigError::InvalidHeader {
                name: USER_AGENT.to_string(),
                reason: error.to_string(),
            })?;
        let timing_header = settings
            .timing_header
            .as_deref()
            .map(|name| {
                HeaderName::from_bytes(name.as_bytes()).map_err(|error| {
                    ConfigError::InvalidHeader {
                        name: name.to_owned(),
                        reason: error.to_string(),
                    }
                })
            })
            .transpose()?;

        let mut stages: Vec<Arc<dyn Stage>> = Vec::new();
        match (cache_store, settings.cache) {
            (Some(store), cache) => {
                stages.push(Arc::new(CacheStage::new(store, cache.unwrap_or_default())));
            }
            (None, Some(_)) => return Err(ConfigError::MissingCacheStore),
            (None, None) => {}
        }
        stages.push(Arc::new(JsonStage));
        stages.push(Arc::new(
            success_predicate.map(StatusStage::new).unwrap_or_default(),
        ));
        stages.push(Arc::new(TimerStage::new(settings.timeout, timing_header)));
        if let Some(breaker) = &settings.circuit_breaker {
            let config = CircuitBreakerConfig::from(breaker);
            let stage = match breaker_failure_predicate {
                Some(predicate) => CircuitBreakerStage::with_failure_predicate(config, predicate),
                None => CircuitBreakerStage::new(config),
            };
            stages.push(Arc::new(stage));
        }

        let terminal = TransportTerminal::new(Arc::new(transport));
        let executor = Executor {
            client: Arc::new(ClientIdentity::new(settings.name, user_agent)),
            user_agent: user_agent_value,
            pipeline: Pipeline::new(stages, Arc::new(terminal)),
            log_sink: Some(log_sink.unwrap_or_else(|| Arc::new(TracingLogSink) as Arc<dyn LogSink>)),
        };

        Ok(HttpClient {
            executor: Arc::new(executor),
        })
    }
}

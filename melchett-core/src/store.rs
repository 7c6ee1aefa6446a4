//! Cache store contract.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::StoreError;
use crate::response::CachedResponse;

/// Result of a cache store operation.
pub type StoreResult<T> = Result<T, StoreError>;

/// Cache entry key: a namespace segment plus the request hash.
///
/// Displayed as `{segment}:{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Namespace, the client name.
    pub segment: SmolStr,
    /// Request hash.
    pub id: String,
}

impl CacheKey {
    /// Creates a key.
    pub fn new(segment: impl Into<SmolStr>, id: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.segment, self.id)
    }
}

/// Storage engine for cached responses.
///
/// Implementations must be safe to share between concurrent calls.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Whether the store accepts reads and writes.
    fn is_ready(&self) -> bool;

    /// Starts the store. Called by the cache stage when [`is_ready`](Self::is_ready)
    /// returns `false`.
    async fn start(&self) -> StoreResult<()>;

    /// Reads the entry for `key`.
    async fn get(&self, key: &CacheKey) -> StoreResult<Option<CachedResponse>>;

    /// Writes `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &CacheKey, value: CachedResponse, ttl: Duration) -> StoreResult<()>;

    /// Name used in log fields.
    fn name(&self) -> &str {
        "store"
    }
}

#[async_trait]
impl<T: CacheStore + ?Sized> CacheStore for Arc<T> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    async fn start(&self) -> StoreResult<()> {
        (**self).start().await
    }

    async fn get(&self, key: &CacheKey) -> StoreResult<Option<CachedResponse>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &CacheKey, value: CachedResponse, ttl: Duration) -> StoreResult<()> {
        (**self).set(key, value, ttl).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

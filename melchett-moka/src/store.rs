//! Moka cache store.

use std::time::Duration;

use async_trait::async_trait;
use melchett_core::{CacheKey, CacheStore, CachedResponse, ResponseBody, StoreResult};
use moka::future::Cache;
use smol_str::SmolStr;
use tracing::trace;

use crate::builder::{MokaStoreBuilder, NoCapacity};
use crate::metrics;

/// Value held by the moka cache: the response and the TTL it was written with.
#[derive(Debug, Clone)]
pub(crate) struct StoredEntry {
    pub(crate) response: CachedResponse,
    pub(crate) ttl: Duration,
}

impl StoredEntry {
    // Fixed per-entry overhead for the key, the entry and moka's bookkeeping.
    const OVERHEAD: usize = 128;

    /// Approximate memory cost of `key` plus this entry.
    pub(crate) fn weight(&self, key: &CacheKey) -> u32 {
        let headers: usize = self
            .response
            .headers
            .iter()
            .map(|(name, value)| name.as_str().len() + value.len())
            .sum();
        let body = match &self.response.body {
            ResponseBody::Raw(bytes) => bytes.len(),
            ResponseBody::Json(value) => value.to_string().len(),
        };
        let total = Self::OVERHEAD + key.segment.len() + key.id.len() + headers + body;
        total.min(u32::MAX as usize) as u32
    }
}

/// In-memory [`CacheStore`] powered by Moka.
///
/// Clones share the same underlying cache.
///
/// ```
/// use melchett_moka::MokaStore;
///
/// let store = MokaStore::builder()
///     .label("users-cache")
///     .max_bytes(64 * 1024 * 1024)
///     .build();
/// ```
///
/// Expired entries are never returned, though they may occupy memory until
/// moka's housekeeping evicts them.
#[derive(Clone)]
pub struct MokaStore {
    pub(crate) cache: Cache<CacheKey, StoredEntry>,
    pub(crate) label: SmolStr,
}

impl std::fmt::Debug for MokaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaStore")
            .field("label", &self.label)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl MokaStore {
    /// Creates a builder with no capacity configured.
    pub fn builder() -> MokaStoreBuilder<NoCapacity> {
        MokaStoreBuilder::new()
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs moka's pending housekeeping (evictions, expirations, counters).
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

#[async_trait]
impl CacheStore for MokaStore {
    fn is_ready(&self) -> bool {
        true
    }

    async fn start(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> StoreResult<Option<CachedResponse>> {
        Ok(self.cache.get(key).await.map(|entry| entry.response))
    }

    async fn set(&self, key: &CacheKey, value: CachedResponse, ttl: Duration) -> StoreResult<()> {
        trace!(store = %self.label, %key, ?ttl, "moka insert");
        let entry = StoredEntry {
            response: value,
            ttl,
        };
        self.cache.insert(key.clone(), entry).await;
        metrics::record_capacity(
            &self.label,
            self.cache.entry_count(),
            self.cache.weighted_size(),
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}

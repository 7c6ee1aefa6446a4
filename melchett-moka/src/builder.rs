//! Builder for configuring [`MokaStore`].

use std::time::{Duration, Instant};

use melchett_core::CacheKey;
use moka::Expiry;
use moka::future::{Cache, CacheBuilder};
use moka::policy::EvictionPolicy;
use smol_str::SmolStr;

use crate::store::{MokaStore, StoredEntry};

/// Expires each entry after the TTL it was written with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Expiration;

impl Expiry<CacheKey, StoredEntry> for Expiration {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &StoredEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &StoredEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        // Moka's default keeps the old deadline; an overwrite restarts it.
        Some(value.ttl)
    }
}

/// Marker type: capacity has not been configured yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapacity;

/// Marker type: the store holds at most `n` entries.
#[derive(Debug, Clone, Copy)]
pub struct EntryCapacity(pub(crate) u64);

/// Marker type: the store holds at most `n` bytes (approximate).
#[derive(Debug, Clone, Copy)]
pub struct ByteCapacity(pub(crate) u64);

/// Builder for [`MokaStore`].
///
/// Capacity is required: call [`max_entries`](Self::max_entries) or
/// [`max_bytes`](Self::max_bytes) before `build()`.
///
/// ```
/// use melchett_moka::{EvictionPolicy, MokaStore};
///
/// let store = MokaStore::builder()
///     .max_entries(1_000)
///     .eviction_policy(EvictionPolicy::lru())
///     .build();
/// ```
pub struct MokaStoreBuilder<Cap> {
    capacity: Cap,
    label: SmolStr,
    eviction_policy: Option<EvictionPolicy>,
}

impl MokaStoreBuilder<NoCapacity> {
    /// Creates a builder with no capacity configured.
    pub fn new() -> Self {
        Self {
            capacity: NoCapacity,
            label: SmolStr::new_static("moka"),
            eviction_policy: None,
        }
    }

    /// Limits the store by entry count.
    pub fn max_entries(self, capacity: u64) -> MokaStoreBuilder<EntryCapacity> {
        MokaStoreBuilder {
            capacity: EntryCapacity(capacity),
            label: self.label,
            eviction_policy: self.eviction_policy,
        }
    }

    /// Limits the store by approximate memory use.
    ///
    /// An entry weighs its key, header names and values, its body and a fixed
    /// overhead.
    pub fn max_bytes(self, bytes: u64) -> MokaStoreBuilder<ByteCapacity> {
        MokaStoreBuilder {
            capacity: ByteCapacity(bytes),
            label: self.label,
            eviction_policy: self.eviction_policy,
        }
    }
}

impl Default for MokaStoreBuilder<NoCapacity> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Cap> MokaStoreBuilder<Cap> {
    /// Sets the store label used in logs and metrics.
    ///
    /// Defaults to `"moka"`.
    pub fn label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the eviction policy.
    ///
    /// Defaults to TinyLFU for entry capacity and LRU for byte capacity.
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }
}

impl MokaStoreBuilder<EntryCapacity> {
    /// Builds a store limited by entry count.
    pub fn build(self) -> MokaStore {
        let policy = self
            .eviction_policy
            .unwrap_or_else(EvictionPolicy::tiny_lfu);
        let cache: Cache<CacheKey, StoredEntry> = CacheBuilder::new(self.capacity.0)
            .name(&self.label)
            .eviction_policy(policy)
            .expire_after(Expiration)
            .build();

        MokaStore {
            cache,
            label: self.label,
        }
    }
}

impl MokaStoreBuilder<ByteCapacity> {
    /// Builds a store limited by approximate memory use.
    ///
    /// LRU is the default here: TinyLFU admission can refuse a new entry even
    /// when evicting would make room.
    pub fn build(self) -> MokaStore {
        let policy = self.eviction_policy.unwrap_or_else(EvictionPolicy::lru);
        let cache: Cache<CacheKey, StoredEntry> = CacheBuilder::new(self.capacity.0)
            .name(&self.label)
            .weigher(|key: &CacheKey, entry: &StoredEntry| entry.weight(key))
            .eviction_policy(policy)
            .expire_after(Expiration)
            .build();

        MokaStore {
            cache,
            label: self.label,
        }
    }
}

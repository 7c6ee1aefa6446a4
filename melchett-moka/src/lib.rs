//! # melchett-moka
//!
//! [`CacheStore`](melchett_core::CacheStore) backed by [`moka`]'s async
//! cache. Every entry carries the TTL it was written with, so responses with
//! different `max-age` values expire independently.
//!
//! ```
//! use melchett_moka::MokaStore;
//!
//! let store = MokaStore::builder().max_entries(10_000).build();
//! ```
//!
//! The store lives in process memory: it is ready as soon as it is built and
//! is not shared between processes.
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod builder;
pub mod metrics;
mod store;

pub use builder::{ByteCapacity, EntryCapacity, MokaStoreBuilder, NoCapacity};
pub use moka::policy::EvictionPolicy;
pub use store::MokaStore;

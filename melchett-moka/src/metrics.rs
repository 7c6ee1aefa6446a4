//! Capacity gauges for [`MokaStore`](crate::MokaStore).
//!
//! Without the `metrics` feature [`record_capacity`] compiles to nothing.
//! With it, every write reports two gauges labelled by `store`:
//! `melchett_moka_entries` and `melchett_moka_size_bytes`.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Entries held by a store.
    pub static ref MOKA_ENTRIES: &'static str = {
        metrics::describe_gauge!(
            "melchett_moka_entries",
            metrics::Unit::Count,
            "Responses held by a moka-backed melchett cache."
        );
        "melchett_moka_entries"
    };

    /// Weighed size of a store.
    pub static ref MOKA_SIZE_BYTES: &'static str = {
        metrics::describe_gauge!(
            "melchett_moka_size_bytes",
            metrics::Unit::Bytes,
            "Weighed size of a moka-backed melchett cache. Equals the entry count when no byte budget is set."
        );
        "melchett_moka_size_bytes"
    };
}

/// Publishes `entries` and `size` for the store labelled `store`.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_capacity(store: &str, entries: u64, size: u64) {
    let label = store.to_owned();
    metrics::gauge!(*MOKA_ENTRIES, "store" => label.clone()).set(entries as f64);
    metrics::gauge!(*MOKA_SIZE_BYTES, "store" => label).set(size as f64);
}

/// Does nothing without the `metrics` feature.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_capacity(_store: &str, _entries: u64, _size: u64) {}

//! Timestamp-ordered deduplication kernels for out-of-order ingestion.
//!
//! An out-of-order (O3) commit reconciles two row sources: the persisted,
//! timestamp-sorted partition and a timestamp-sorted batch of newly arrived
//! rows. The kernels in this crate produce the single index stream that
//! selects, for every timestamp, the winning row under a configurable
//! multi-column dedup key.
//!
//! All routines are synchronous and allocation-free apart from a reusable
//! conflict-band bitmap; every buffer is borrowed from the caller for the
//! duration of one call.

pub mod compare;
pub mod dedup;
pub mod merge;

mod probe;
mod sort;

pub use compare::{KeyColumn, KeyValues};
pub use dedup::{DedupOutcome, dedup_sorted_timestamp_index, dedup_sorted_timestamp_index_in_place};
pub use merge::{merge_dedup_timestamp_index, merge_dedup_timestamp_index_with_keys};

//! Common data types for the tempo storage engine.
//!
//! This crate hosts the core scalar and index types used throughout the
//! system, decoupled from the dedup kernels (`tempo-dedup`) so they can be
//! reused without pulling in the kernel crates.

pub mod entry;
pub mod int256;

pub use entry::{IndexEntry, ROW_ID_TAG, Timestamp, is_tagged, untag};
pub use int256::I256;

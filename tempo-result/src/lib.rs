//! Error types and result definitions for the tempo storage engine.
//!
//! This crate provides the unified error type ([`Error`]) and result type
//! alias ([`Result<T>`]) used throughout the tempo crates. All fallible
//! operations return `Result<T>` so errors propagate naturally with the `?`
//! operator across crate boundaries.
//!
//! # Error Categories
//!
//! - **Caller contract breaches** ([`Error::Unsorted`],
//!   [`Error::UnsupportedKeyWidth`]): the inputs violate a documented
//!   precondition. These are fatal to the call; no partial output is
//!   meaningful.
//! - **User input errors** ([`Error::InvalidArgumentError`]): malformed
//!   arguments such as misaligned raw buffers.
//! - **Internal errors** ([`Error::Internal`]): violated internal
//!   invariants; these indicate a bug.

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;

use crate::error::Error;

/// Result type used across the tempo crates.
pub type Result<T> = std::result::Result<T, Error>;

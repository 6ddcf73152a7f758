use thiserror::Error;

/// Unified error type for tempo operations.
///
/// Errors propagate upward through the call stack with Rust's `?` operator.
/// Internal code can match on specific variants for fine-grained handling.
#[derive(Error, Debug)]
pub enum Error {
    /// An input index stream is not sorted by timestamp.
    ///
    /// Sorted inputs are a caller contract; a strictly decreasing timestamp
    /// anywhere in an input stream aborts the call. No partial output is
    /// guaranteed to be meaningful after this error.
    #[error("input index is not timestamp-sorted: {0}")]
    Unsorted(String),

    /// A dedup key column declared a value width the engine cannot compare.
    ///
    /// Supported fixed widths are 1, 2, 4, 8, 16 and 32 bytes. Anything else
    /// is a programmer error in the caller's column metadata.
    #[error("unsupported dedup key width: {0} bytes")]
    UnsupportedKeyWidth(usize),

    /// Invalid caller input, e.g. a raw column buffer whose length or
    /// alignment does not match its declared value width.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Internal error indicating a bug or unexpected state.
    ///
    /// This should never occur during normal operation; it means an internal
    /// invariant was violated (for example, a stable sort produced an
    /// unsorted tie range).
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

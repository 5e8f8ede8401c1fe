//! Error types for the `commons-memory` crate.
//!
//! All fallible operations return [`MemoryError`]. Note that retrieval
//! itself is infallible -- an empty store or a filter that matches nothing
//! yields empty results, not errors. Errors are reserved for genuine
//! misuse (mismatched batch lengths) and I/O.

/// Errors that can occur during memory operations.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Parallel batch arguments had inconsistent lengths.
    ///
    /// Scalar (length-1) arguments broadcast across the batch; any other
    /// length must match the number of texts exactly.
    #[error("batch field '{field}' has length {actual}, expected 1 or {expected}")]
    BatchLengthMismatch {
        /// Which argument was malformed.
        field: &'static str,
        /// The batch size implied by the texts.
        expected: usize,
        /// The length actually supplied.
        actual: usize,
    },

    /// A created-at string was not valid `%Y-%m-%d %H:%M:%S` game time.
    #[error("unparseable game time: {0}")]
    InvalidTimestamp(String),

    /// A snapshot file could not be read or written.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot file could not be serialized or deserialized.
    #[error("snapshot serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

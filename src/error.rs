//! Error taxonomy for the store and segmenter.
//!
//! One enum covers both subsystems because callers of either one see the
//! same shape of failure: a programmer error at construction, a dimension
//! mismatch at the data boundary, a codec/I/O failure on persistence, an
//! external-contract failure (tokenizer/embedder), or cooperative
//! cancellation. None of these are retried inside the crate; callers decide
//! whether and how to retry.

use thiserror::Error;

/// Errors raised by the vector store and the segmentation pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// Raised by [`crate::CosineVectorStore::new`] when `dimension == 0`.
    #[error("invalid dimension: {0}")]
    InvalidDimension(usize),

    /// Raised when a vector's length does not match the store's dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured on the store.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// A `load` payload ended before the declared count/length was satisfied.
    #[error("truncated payload: expected at least {expected} more bytes")]
    Truncated {
        /// Bytes still required when the stream ended.
        expected: usize,
    },

    /// A `load` payload had a structurally invalid header or vector length.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// I/O failure during `save`/`load`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The external tokenizer contract failed.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// The external embedder contract failed.
    #[error("embedder error: {0}")]
    Embedder(String),

    /// The metadata store contract failed.
    #[error("metadata store error: {0}")]
    MetadataStore(String),

    /// A cooperative cancellation token fired at a suspension point. This is
    /// a non-error shutdown signal, not a failure, but it still needs to
    /// propagate through `Result` plumbing like everything else.
    #[error("operation cancelled")]
    Cancelled,
}

/// Result alias used throughout the crate.
pub type RagResult<T> = Result<T, RagError>;

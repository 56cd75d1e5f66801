/// Errors from document and item operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DocError {
    /// Input bytes are not the expected JSON shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// An item has no `id` field, or its `id` is not a string.
    #[error("item has no string `id` field")]
    MissingId,

    /// Serializing a document failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for document results.
pub type DocResult<T> = Result<T, DocError>;

//! Error types for the entry crate.

use std::fmt;

use shadow_doc::DocError;
use shadow_index::IndexError;
use shadow_store::StoreError;

/// Errors returned by [`EntryManager`](crate::EntryManager) operations.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    /// Input bytes are not a valid document or item.
    #[error("decode error: {0}")]
    Decode(String),

    /// The item has no string `id` field.
    #[error("item has no string `id` field")]
    MissingId,

    /// The entry (or the stored key) does not exist.
    #[error("entry not found: {0}")]
    NotFound(String),

    /// An entry or section name that cannot be used.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The backing store is closed or failed with an I/O error.
    #[error("store error: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// The backing store found damaged data it could not recover.
    #[error(transparent)]
    CorruptedStore(StoreError),

    /// Poisoned lock or an unexpected serialization failure.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by transports to pick a status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    NotFound,
    Unavailable,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadInput => write!(f, "bad input"),
            Self::NotFound => write!(f, "not found"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

impl EntryError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(_) | Self::MissingId | Self::InvalidName(_) => ErrorKind::BadInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::StoreUnavailable(_) | Self::CorruptedStore(_) => ErrorKind::Unavailable,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<DocError> for EntryError {
    fn from(e: DocError) -> Self {
        match e {
            DocError::Decode(msg) => Self::Decode(msg),
            DocError::MissingId => Self::MissingId,
            DocError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<IndexError> for EntryError {
    fn from(e: IndexError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<StoreError> for EntryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(key) => Self::NotFound(key),
            StoreError::InvalidKey { key, reason } => {
                Self::InvalidName(format!("{key:?}: {reason}"))
            }
            e @ StoreError::Corrupted { .. } => Self::CorruptedStore(e),
            e => Self::StoreUnavailable(e),
        }
    }
}

/// Convenience alias for entry results.
pub type EntryResult<T> = Result<T, EntryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn doc_errors_are_bad_input() {
        assert_eq!(EntryError::from(DocError::MissingId).kind(), ErrorKind::BadInput);
        assert_eq!(
            EntryError::from(DocError::Decode("eof".into())).kind(),
            ErrorKind::BadInput
        );
        assert_eq!(
            EntryError::from(DocError::Serialization("x".into())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn store_errors_map_by_variant() {
        let not_found = EntryError::from(StoreError::NotFound("k".into()));
        assert!(matches!(not_found, EntryError::NotFound(ref k) if k == "k"));

        let invalid = EntryError::from(StoreError::InvalidKey {
            key: "a/b".into(),
            reason: "separator".into(),
        });
        assert_eq!(invalid.kind(), ErrorKind::BadInput);

        let corrupted = EntryError::from(StoreError::Corrupted {
            path: PathBuf::from("/db/shadow.log"),
            offset: 8,
            reason: "crc".into(),
        });
        assert!(matches!(corrupted, EntryError::CorruptedStore(_)));
        assert_eq!(corrupted.kind(), ErrorKind::Unavailable);

        let io = EntryError::from(StoreError::Io(io::Error::new(io::ErrorKind::Other, "disk")));
        assert!(matches!(io, EntryError::StoreUnavailable(_)));
    }

    #[test]
    fn messages_include_cause() {
        let e = EntryError::from(StoreError::Unavailable("closed".into()));
        assert_eq!(e.to_string(), "store error: store unavailable: closed");
        assert_eq!(EntryError::NotFound("x".into()).to_string(), "entry not found: x");
    }
}

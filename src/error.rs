//! Error types for indexing and search.
//!
//! Library code returns [`IndexError`]; the CLI and config layers wrap it in
//! `anyhow` the same way they wrap I/O and parse failures.

use crate::models::RecordType;

/// Result alias used throughout the indexing pipeline.
pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Errors raised by the codec, synchronizer, rebuilder and search executor.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Malformed input, e.g. a non-positive object id or a garbled term set.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The referenced content item does not exist (anymore).
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    /// The index database rejected or could not run a statement.
    #[error("index store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    /// The content store could not be reached.
    #[error("content store unavailable: {0}")]
    ContentUnavailable(String),

    /// A full rebuild failed after the index was cleared.
    #[error("rebuild interrupted after {indexed} records: {source}")]
    RebuildInterrupted {
        indexed: usize,
        #[source]
        source: Box<IndexError>,
    },
}

impl IndexError {
    pub fn not_found(record_type: RecordType, id: i64) -> Self {
        IndexError::NotFound {
            kind: record_type.as_str(),
            id,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, IndexError::NotFound { .. })
    }
}

/// Errors reported by a [`ContentStore`](crate::content::ContentStore).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ContentError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    #[error("content store unavailable: {0}")]
    Unavailable(String),
}

impl From<ContentError> for IndexError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::NotFound { kind, id } => IndexError::NotFound { kind, id },
            ContentError::Unavailable(msg) => IndexError::ContentUnavailable(msg),
        }
    }
}

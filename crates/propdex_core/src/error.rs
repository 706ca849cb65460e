//! Error types for propdex core.

use std::io;
use thiserror::Error;

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors that can occur while mapping, indexing or searching.
#[derive(Debug, Error)]
pub enum IndexError {
    /// An entity could not be flattened into a document.
    #[error("cannot map {entity}.{attribute}: {reason}")]
    Mapping {
        /// Entity class being mapped.
        entity: String,
        /// Attribute that failed.
        attribute: String,
        /// What went wrong.
        reason: String,
    },

    /// Query syntax error or backing-store failure during search.
    #[error("query failed for `{query}`: {reason}")]
    Query {
        /// The query text as given.
        query: String,
        /// What went wrong.
        reason: String,
    },

    /// Backing-store failure during index, update, remove or commit.
    #[error("index write failed: {reason}")]
    Write {
        /// What went wrong.
        reason: String,
    },

    /// The entity class has no registered metadata.
    #[error("unknown entity class: {class}")]
    UnknownEntity {
        /// The class that was looked up.
        class: String,
    },

    /// The index directory is held by another writer.
    #[error("index at {location} is locked by another writer")]
    Locked {
        /// Storage location.
        location: String,
    },

    /// The index directory still has live handles.
    #[error("index at {location} is still in use")]
    InUse {
        /// Storage location.
        location: String,
    },

    /// The index log failed validation.
    #[error("index corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// A descriptor or configuration value is out of range.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] propdex_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl IndexError {
    /// Creates a mapping error.
    pub fn mapping(
        entity: impl Into<String>,
        attribute: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Mapping {
            entity: entity.into(),
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    /// Creates a query error.
    pub fn query(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Query {
            query: query.into(),
            reason: reason.into(),
        }
    }

    /// Creates a write error.
    pub fn write(reason: impl Into<String>) -> Self {
        Self::Write {
            reason: reason.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns true for syntax or search-time failures.
    #[must_use]
    pub fn is_query_error(&self) -> bool {
        matches!(self, Self::Query { .. })
    }

    /// Returns true for failures while changing the index.
    #[must_use]
    pub fn is_write_error(&self) -> bool {
        matches!(self, Self::Write { .. })
    }
}

//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of a file.
    #[error("read beyond end of file: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current file size.
        size: u64,
    },

    /// Truncation target lies past the end of the file.
    #[error("cannot truncate to {requested} bytes, file has {size}")]
    TruncatePastEnd {
        /// The requested size.
        requested: u64,
        /// The current file size.
        size: u64,
    },

    /// The named file does not exist in the directory.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// The directory does not exist and creation was not requested.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// Another owner holds the directory lock.
    #[error("directory locked: {0}")]
    Locked(String),
}

//! Directory and file traits.

use crate::error::StorageResult;
use std::fmt;

/// An append-only file inside a [`Directory`].
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `sync` makes all appended data durable
pub trait IndexFile: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::ReadPastEnd`] if the range extends past
    /// the end of the file, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Reads the whole file.
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        self.read_at(0, size as usize)
    }

    /// Appends data and returns the offset it was written at.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Returns the current size in bytes.
    fn size(&self) -> StorageResult<u64>;

    /// Pushes buffered writes to the operating system.
    fn flush(&mut self) -> StorageResult<()>;

    /// Flushes data and metadata to durable storage.
    fn sync(&mut self) -> StorageResult<()>;

    /// Cuts the file down to `new_size` bytes.
    ///
    /// Used to drop a torn or uncommitted tail after recovery.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::TruncatePastEnd`] if `new_size` is
    /// larger than the current size.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}

/// Exclusive ownership of a directory. Released when dropped.
pub trait DirectoryLock: Send + Sync + fmt::Debug {}

/// A flat namespace of index files.
///
/// Implementations must be `Send + Sync`; the index that owns a directory
/// serializes its own writers.
pub trait Directory: Send + Sync + fmt::Debug {
    /// Human-readable location (path or `ram://` name).
    fn location(&self) -> String;

    /// Opens the named file, creating it empty if missing.
    fn open_file(&self, name: &str) -> StorageResult<Box<dyn IndexFile>>;

    /// Returns true if the named file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Deletes the named file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::FileNotFound`] if it does not exist.
    fn delete_file(&self, name: &str) -> StorageResult<()>;

    /// Atomically replaces `to` with `from`.
    fn rename_file(&self, from: &str, to: &str) -> StorageResult<()>;

    /// Lists file names, sorted.
    fn list_files(&self) -> StorageResult<Vec<String>>;

    /// Takes the exclusive lock named `name` without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::Locked`] if the lock is already held.
    fn obtain_lock(&self, name: &str) -> StorageResult<Box<dyn DirectoryLock>>;
}

//! # propdex storage
//!
//! Directory abstraction for propdex index data.
//!
//! An index lives in a *directory*: a flat namespace of named, append-only
//! files plus an exclusive write lock. The directory does not interpret
//! the bytes it holds; the index log format belongs to `propdex_core`.
//!
//! ## Available Directories
//!
//! - [`FsDirectory`] - one OS file per name, locked with an advisory lock file
//! - [`RamDirectory`] - shared in-memory buffers, for tests and ephemeral indexes
//!
//! ## Example
//!
//! ```rust
//! use propdex_storage::{Directory, RamDirectory};
//!
//! let dir = RamDirectory::new();
//! let mut file = dir.open_file("index.log").unwrap();
//! let offset = file.append(b"hello world").unwrap();
//! assert_eq!(file.read_at(offset, 5).unwrap(), b"hello");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod directory;
mod error;
mod fs;
mod ram;

pub use directory::{Directory, DirectoryLock, IndexFile};
pub use error::{StorageError, StorageResult};
pub use fs::{FsDirectory, FsFile};
pub use ram::{RamDirectory, RamFile};

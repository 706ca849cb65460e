//! File-system directory.
//!
//! Layout of an index directory:
//!
//! ```text
//! <index_path>/
//! ├─ write.lock        # Advisory lock held by the single writer
//! ├─ index.log         # Framed index operations
//! └─ index.log.tmp     # Present only while compaction rewrites the log
//! ```

use crate::directory::{Directory, DirectoryLock, IndexFile};
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A directory backed by the operating system's file system.
///
/// # Example
///
/// ```no_run
/// use propdex_storage::{Directory, FsDirectory};
/// use std::path::Path;
///
/// let dir = FsDirectory::open(Path::new("./lucene"), true).unwrap();
/// let _lock = dir.obtain_lock("write.lock").unwrap();
/// let mut log = dir.open_file("index.log").unwrap();
/// log.append(b"record").unwrap();
/// log.sync().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FsDirectory {
    path: PathBuf,
}

impl FsDirectory {
    /// Opens a directory, creating it when `create_if_missing` is set.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DirectoryNotFound`] if the path is missing and
    /// creation was not requested, or an I/O error.
    pub fn open(path: &Path, create_if_missing: bool) -> StorageResult<Self> {
        if !path.exists() {
            if !create_if_missing {
                return Err(StorageError::DirectoryNotFound(path.display().to_string()));
            }
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(StorageError::DirectoryNotFound(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes an index directory and everything in it.
    ///
    /// Returns `false` when there was nothing to remove.
    pub fn destroy(path: &Path) -> StorageResult<bool> {
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(path)?;
        debug!(path = %path.display(), "removed index directory");
        Ok(true)
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl Directory for FsDirectory {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn open_file(&self, name: &str) -> StorageResult<Box<dyn IndexFile>> {
        Ok(Box::new(FsFile::open(&self.path.join(name))?))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.path.join(name).is_file()
    }

    fn delete_file(&self, name: &str) -> StorageResult<()> {
        let path = self.path.join(name);
        if !path.is_file() {
            return Err(StorageError::FileNotFound(name.to_string()));
        }
        fs::remove_file(path)?;
        self.sync_directory()
    }

    fn rename_file(&self, from: &str, to: &str) -> StorageResult<()> {
        let source = self.path.join(from);
        if !source.is_file() {
            return Err(StorageError::FileNotFound(from.to_string()));
        }
        fs::rename(source, self.path.join(to))?;
        self.sync_directory()
    }

    fn list_files(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn obtain_lock(&self, name: &str) -> StorageResult<Box<dyn DirectoryLock>> {
        let lock_path = self.path.join(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked(self.location()));
        }

        Ok(Box::new(FsLock { _file: file }))
    }
}

/// Lock file handle; the advisory lock is released when the file closes.
#[derive(Debug)]
struct FsLock {
    _file: File,
}

impl DirectoryLock for FsLock {}

/// A file inside an [`FsDirectory`].
#[derive(Debug)]
pub struct FsFile {
    file: RwLock<File>,
    size: RwLock<u64>,
}

impl FsFile {
    /// Opens or creates the file at `path`.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            file: RwLock::new(file),
            size: RwLock::new(size),
        })
    }
}

impl IndexFile for FsFile {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let size = *self.size.read();
        let end = offset.saturating_add(len as u64);
        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }
        if len == 0 {
            return Ok(Vec::new());
        }

        // Seeking mutates the cursor, so reads take the write side.
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let mut file = self.file.write();
        let mut size = self.size.write();
        let offset = *size;
        if data.is_empty() {
            return Ok(offset);
        }

        file.seek(SeekFrom::End(0))?;
        file.write_all(data)?;
        *size += data.len() as u64;
        Ok(offset)
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(*self.size.read())
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.write().flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        let mut file = self.file.write();
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let file = self.file.write();
        let mut size = self.size.write();
        if new_size > *size {
            return Err(StorageError::TruncatePastEnd {
                requested: new_size,
                size: *size,
            });
        }

        file.set_len(new_size)?;
        file.sync_all()?;
        *size = new_size;
        Ok(())
    }
}

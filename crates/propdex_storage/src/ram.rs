//! In-memory directory for tests and ephemeral indexes.

use crate::directory::{Directory, DirectoryLock, IndexFile};
use crate::error::{StorageError, StorageResult};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

type Buffer = Arc<RwLock<Vec<u8>>>;

/// A directory held entirely in memory.
///
/// Clones share the same files and locks, so an index can be closed and
/// reopened over a `RamDirectory` to exercise recovery without touching disk.
#[derive(Debug, Clone)]
pub struct RamDirectory {
    name: Arc<str>,
    files: Arc<RwLock<BTreeMap<String, Buffer>>>,
    locks: Arc<Mutex<HashSet<String>>>,
}

impl RamDirectory {
    /// Creates an empty anonymous directory.
    #[must_use]
    pub fn new() -> Self {
        Self::named("anonymous")
    }

    /// Creates an empty directory reported as `ram://<name>`.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            files: Arc::new(RwLock::new(BTreeMap::new())),
            locks: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Returns a copy of a file's bytes, if it exists.
    #[must_use]
    pub fn file_bytes(&self, name: &str) -> Option<Vec<u8>> {
        self.files.read().get(name).map(|b| b.read().clone())
    }

    /// Overwrites a file's bytes; used to simulate torn writes in tests.
    pub fn set_file_bytes(&self, name: &str, bytes: Vec<u8>) {
        self.files
            .write()
            .insert(name.to_string(), Arc::new(RwLock::new(bytes)));
    }
}

impl Default for RamDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl Directory for RamDirectory {
    fn location(&self) -> String {
        format!("ram://{}", self.name)
    }

    fn open_file(&self, name: &str) -> StorageResult<Box<dyn IndexFile>> {
        let buffer = self
            .files
            .write()
            .entry(name.to_string())
            .or_default()
            .clone();
        Ok(Box::new(RamFile { data: buffer }))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.files.read().contains_key(name)
    }

    fn delete_file(&self, name: &str) -> StorageResult<()> {
        self.files
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()))
    }

    fn rename_file(&self, from: &str, to: &str) -> StorageResult<()> {
        let mut files = self.files.write();
        let buffer = files
            .remove(from)
            .ok_or_else(|| StorageError::FileNotFound(from.to_string()))?;
        // Open handles on the old target keep reading their own buffer.
        files.insert(to.to_string(), buffer);
        Ok(())
    }

    fn list_files(&self) -> StorageResult<Vec<String>> {
        Ok(self.files.read().keys().cloned().collect())
    }

    fn obtain_lock(&self, name: &str) -> StorageResult<Box<dyn DirectoryLock>> {
        let mut held = self.locks.lock();
        if !held.insert(name.to_string()) {
            return Err(StorageError::Locked(self.location()));
        }
        Ok(Box::new(RamLock {
            name: name.to_string(),
            locks: Arc::clone(&self.locks),
        }))
    }
}

#[derive(Debug)]
struct RamLock {
    name: String,
    locks: Arc<Mutex<HashSet<String>>>,
}

impl DirectoryLock for RamLock {}

impl Drop for RamLock {
    fn drop(&mut self) {
        self.locks.lock().remove(&self.name);
    }
}

/// A file inside a [`RamDirectory`].
#[derive(Debug)]
pub struct RamFile {
    data: Buffer,
}

impl IndexFile for RamFile {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let end = offset.saturating_add(len as u64);
        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }
        Ok(data[offset as usize..end as usize].to_vec())
    }

    fn append(&mut self, bytes: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(bytes);
        Ok(offset)
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;
        if new_size > size {
            return Err(StorageError::TruncatePastEnd {
                requested: new_size,
                size,
            });
        }
        data.truncate(new_size as usize);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_files() {
        let dir = RamDirectory::named("shared");
        let other = dir.clone();

        dir.open_file("index.log").unwrap().append(b"abc").unwrap();
        let file = other.open_file("index.log").unwrap();
        assert_eq!(file.read_all().unwrap(), b"abc");
        assert_eq!(other.location(), "ram://shared");
    }

    #[test]
    fn lock_released_on_drop() {
        let dir = RamDirectory::new();
        let lock = dir.obtain_lock("write.lock").unwrap();
        assert!(matches!(
            dir.clone().obtain_lock("write.lock"),
            Err(StorageError::Locked(_))
        ));
        drop(lock);
        assert!(dir.obtain_lock("write.lock").is_ok());
    }

    #[test]
    fn rename_replaces_target() {
        let dir = RamDirectory::new();
        dir.open_file("index.log").unwrap().append(b"old").unwrap();
        dir.open_file("index.log.tmp").unwrap().append(b"new").unwrap();

        dir.rename_file("index.log.tmp", "index.log").unwrap();
        assert_eq!(dir.file_bytes("index.log").unwrap(), b"new");
        assert!(!dir.file_exists("index.log.tmp"));
        assert_eq!(dir.list_files().unwrap(), vec!["index.log"]);
    }

    #[test]
    fn truncate_and_read_bounds() {
        let dir = RamDirectory::new();
        let mut file = dir.open_file("f").unwrap();
        file.append(b"hello world").unwrap();
        file.truncate(5).unwrap();

        assert_eq!(file.read_all().unwrap(), b"hello");
        assert!(matches!(
            file.read_at(3, 4),
            Err(StorageError::ReadPastEnd { .. })
        ));
    }
}

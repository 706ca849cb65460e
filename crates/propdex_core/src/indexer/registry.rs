//! Registry of open full-text indexers.
//!
//! Opening the same directory twice through one registry returns the same
//! [`FullTextIndexer`]. Entries are weak, so an indexer is closed when its
//! last handle drops and the next `acquire` opens it afresh.
//!
//! An indexer whose last handle has just dropped may still be writing its
//! final commit. `acquire` and `cleanup` wait for it to release the
//! directory before reopening or deleting it.

use crate::config::IndexerConfig;
use crate::error::{IndexError, IndexResult};
use crate::indexer::fulltext::{ReleaseSignal, LOCK_FILE};
use crate::indexer::FullTextIndexer;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use propdex_storage::{Directory, FsDirectory, StorageError};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

static GLOBAL: Lazy<IndexerRegistry> = Lazy::new(IndexerRegistry::new);

#[derive(Debug)]
struct Entry {
    indexer: Weak<FullTextIndexer>,
    release: Arc<ReleaseSignal>,
}

impl Entry {
    fn handles(&self) -> usize {
        self.indexer.strong_count()
    }
}

/// Canonical path to weak indexer handle.
#[derive(Debug, Default)]
pub struct IndexerRegistry {
    open: Mutex<HashMap<PathBuf, Entry>>,
}

impl IndexerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static IndexerRegistry {
        &GLOBAL
    }

    /// Returns the live indexer for `path`, opening it if needed.
    ///
    /// `config` only applies when a new indexer is opened.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Locked`] if another process or registry holds
    /// the directory, or any error from [`FullTextIndexer::open`].
    pub fn acquire(
        &self,
        path: impl AsRef<Path>,
        config: IndexerConfig,
    ) -> IndexResult<Arc<FullTextIndexer>> {
        let path = path.as_ref();
        if config.create_if_missing && !path.exists() {
            fs::create_dir_all(path)?;
        }
        let key = canonical(path);

        let mut open = self.open.lock();
        if let Some(entry) = open.get(&key) {
            if let Some(indexer) = entry.indexer.upgrade() {
                info!(path = %key.display(), "reusing open index");
                return Ok(indexer);
            }
            entry.release.wait();
        }

        let indexer = Arc::new(FullTextIndexer::open(&key, config)?);
        let entry = Entry {
            indexer: Arc::downgrade(&indexer),
            release: indexer.release_signal(),
        };
        open.insert(key, entry);
        open.retain(|_, entry| entry.handles() > 0);
        Ok(indexer)
    }

    /// Number of live handles to the indexer at `path`.
    #[must_use]
    pub fn open_handles(&self, path: impl AsRef<Path>) -> usize {
        let key = canonical(path.as_ref());
        self.open
            .lock()
            .get(&key)
            .map_or(0, Entry::handles)
    }

    /// Deletes the index directory at `path`.
    ///
    /// Returns `false` when the directory did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InUse`] while any handle from this registry is
    /// alive, and [`IndexError::Locked`] while an indexer opened elsewhere
    /// holds the directory.
    pub fn cleanup(&self, path: impl AsRef<Path>) -> IndexResult<bool> {
        let key = canonical(path.as_ref());
        let mut open = self.open.lock();
        if let Some(entry) = open.get(&key) {
            if entry.handles() > 0 {
                return Err(IndexError::InUse {
                    location: key.display().to_string(),
                });
            }
            entry.release.wait();
        }
        open.remove(&key);

        if key.is_dir() {
            let directory = FsDirectory::open(&key, false)?;
            let lock = directory.obtain_lock(LOCK_FILE).map_err(|e| match e {
                StorageError::Locked(location) => IndexError::Locked { location },
                other => other.into(),
            })?;
            drop(lock);
        }
        let removed = FsDirectory::destroy(&key)?;
        debug!(path = %key.display(), removed, "cleaned up index directory");
        Ok(removed)
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, ENTITY_CLASS_FIELD, ENTITY_ID_FIELD};
    use crate::indexer::Indexer;
    use tempfile::tempdir;

    fn doc(id: &str) -> Document {
        let mut doc = Document::new();
        doc.add_keyword(ENTITY_CLASS_FIELD, "Person");
        doc.add_keyword(ENTITY_ID_FIELD, id);
        doc
    }

    #[test]
    fn same_path_same_instance() {
        let tmp = tempdir().unwrap();
        let registry = IndexerRegistry::new();
        let a = registry.acquire(tmp.path(), IndexerConfig::default()).unwrap();
        let b = registry
            .acquire(tmp.path().join("."), IndexerConfig::default())
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.open_handles(tmp.path()), 2);
        drop(b);
        assert_eq!(registry.open_handles(tmp.path()), 1);
    }

    #[test]
    fn reopens_after_last_handle_drops() {
        let tmp = tempdir().unwrap();
        let registry = IndexerRegistry::new();
        let indexer = registry.acquire(tmp.path(), IndexerConfig::default()).unwrap();
        indexer.index(doc("p1")).unwrap();
        drop(indexer);
        assert_eq!(registry.open_handles(tmp.path()), 0);

        let reopened = registry.acquire(tmp.path(), IndexerConfig::default()).unwrap();
        assert_eq!(reopened.document_count(), 1);
    }

    #[test]
    fn cleanup_waits_for_handles() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("lucene");
        let registry = IndexerRegistry::new();
        let indexer = registry.acquire(&path, IndexerConfig::default()).unwrap();

        let err = registry.cleanup(&path).unwrap_err();
        assert!(matches!(err, IndexError::InUse { .. }));

        drop(indexer);
        assert!(registry.cleanup(&path).unwrap());
        assert!(!path.exists());
        assert!(!registry.cleanup(&path).unwrap());
    }

    #[test]
    fn concurrent_acquire_and_drop_share_one_writer() {
        let tmp = tempdir().unwrap();
        let registry = IndexerRegistry::new();
        let config = IndexerConfig::new().sync_on_commit(false);

        std::thread::scope(|scope| {
            for t in 0..4 {
                let registry = &registry;
                let config = config.clone();
                let path = tmp.path();
                scope.spawn(move || {
                    for i in 0..50 {
                        let indexer = registry.acquire(path, config.clone()).unwrap();
                        indexer.index(doc(&format!("t{t}-{i}"))).unwrap();
                    }
                });
            }
        });

        assert_eq!(registry.open_handles(tmp.path()), 0);
        let indexer = registry.acquire(tmp.path(), IndexerConfig::default()).unwrap();
        assert_eq!(indexer.document_count(), 200);
    }

    #[test]
    fn cleanup_after_concurrent_drops_leaves_nothing_behind() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("lucene");
        let registry = IndexerRegistry::new();
        let handles: Vec<_> = (0..4)
            .map(|_| registry.acquire(&path, IndexerConfig::default()).unwrap())
            .collect();
        handles[0].index(doc("p1")).unwrap();

        std::thread::scope(|scope| {
            for handle in handles {
                scope.spawn(move || drop(handle));
            }
            scope.spawn(|| loop {
                match registry.cleanup(&path) {
                    Ok(_) => break,
                    Err(IndexError::InUse { .. }) => std::thread::yield_now(),
                    Err(other) => panic!("unexpected cleanup error: {other}"),
                }
            });
        });

        assert!(!path.exists());
    }

    #[test]
    fn cleanup_refuses_a_directory_held_outside_the_registry() {
        let tmp = tempdir().unwrap();
        let registry = IndexerRegistry::new();
        let held = FullTextIndexer::open(tmp.path(), IndexerConfig::default()).unwrap();

        let err = registry.cleanup(tmp.path()).unwrap_err();
        assert!(matches!(err, IndexError::Locked { .. }));
        assert!(tmp.path().exists());

        drop(held);
        assert!(registry.cleanup(tmp.path()).unwrap());
    }

    #[test]
    fn separate_registries_contend_for_the_lock() {
        let tmp = tempdir().unwrap();
        let first = IndexerRegistry::new();
        let second = IndexerRegistry::new();
        let _held = first.acquire(tmp.path(), IndexerConfig::default()).unwrap();
        let err = second
            .acquire(tmp.path(), IndexerConfig::default())
            .unwrap_err();
        assert!(matches!(err, IndexError::Locked { .. }));
    }
}

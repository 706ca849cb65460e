//! Temporary index directories.

use propdex_core::{
    FullTextIndexer, IndexManager, IndexerConfig, IndexerRegistry, MemoryIndexer,
    MetadataRegistry,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A full-text index in a temporary directory, removed on drop.
///
/// Each `TestIndex` owns a private [`IndexerRegistry`] so tests running in
/// parallel never share handles through the global one.
pub struct TestIndex {
    /// The open indexer.
    pub indexer: Arc<FullTextIndexer>,
    registry: IndexerRegistry,
    path: PathBuf,
    config: IndexerConfig,
    _temp_dir: TempDir,
}

impl TestIndex {
    /// Opens an index with the default configuration.
    pub fn new() -> Self {
        Self::with_config(IndexerConfig::default())
    }

    /// Opens an index with a custom configuration.
    pub fn with_config(config: IndexerConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("lucene");
        let registry = IndexerRegistry::new();
        let indexer = registry
            .acquire(&path, config.clone())
            .expect("Failed to open index");
        Self {
            indexer,
            registry,
            path,
            config,
            _temp_dir: temp_dir,
        }
    }

    /// Directory holding the index files.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The registry the indexer was acquired from.
    pub fn registry(&self) -> &IndexerRegistry {
        &self.registry
    }

    /// Drops the current handle and opens the directory again.
    ///
    /// Panics if another handle to the indexer is still alive.
    #[must_use]
    pub fn reopen(self) -> Self {
        let Self {
            indexer,
            registry,
            path,
            config,
            _temp_dir,
        } = self;
        assert_eq!(Arc::strong_count(&indexer), 1, "index handle still shared");
        drop(indexer);
        let indexer = registry
            .acquire(&path, config.clone())
            .expect("Failed to reopen index");
        Self {
            indexer,
            registry,
            path,
            config,
            _temp_dir,
        }
    }

    /// An index manager over this index.
    pub fn manager(&self, metadata: Arc<MetadataRegistry>) -> IndexManager {
        IndexManager::new(self.indexer.clone(), metadata)
    }
}

impl Default for TestIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// An index manager over a fresh [`MemoryIndexer`], returned alongside it.
pub fn memory_manager(metadata: Arc<MetadataRegistry>) -> (IndexManager, Arc<MemoryIndexer>) {
    let indexer = Arc::new(MemoryIndexer::new());
    (IndexManager::new(indexer.clone(), metadata), indexer)
}

/// Runs `f` with a manager over a temporary full-text index.
pub fn with_temp_index<F, R>(metadata: Arc<MetadataRegistry>, f: F) -> R
where
    F: FnOnce(&IndexManager, &TestIndex) -> R,
{
    let index = TestIndex::new();
    let manager = index.manager(metadata);
    f(&manager, &index)
}

//! Durable full-text indexer.

use crate::analysis::Analyzer;
use crate::config::IndexerConfig;
use crate::document::Document;
use crate::error::{IndexError, IndexResult};
use crate::indexer::inverted::InvertedIndex;
use crate::indexer::log::{self, IndexLog, IndexOp, COMPACT_FILE, LOG_FILE};
use crate::indexer::{Indexer, SearchResults};
use crate::query;
use parking_lot::{Condvar, Mutex, RwLock};
use propdex_storage::{Directory, DirectoryLock, FsDirectory, StorageError};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the lock file guarding the single writer.
pub(crate) const LOCK_FILE: &str = "write.lock";

/// Deleted slots needed before a commit considers compacting.
const MIN_COMPACT_DELETES: usize = 32;

/// Point-in-time statistics of a [`FullTextIndexer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    /// Storage location.
    pub location: String,
    /// Live documents.
    pub documents: usize,
    /// Deleted documents not yet compacted away.
    pub deleted: usize,
    /// Distinct field names.
    pub fields: usize,
    /// Distinct (field, term) pairs.
    pub terms: usize,
    /// Operations waiting for a commit.
    pub pending: usize,
    /// Number of commits so far.
    pub generation: u64,
    /// Size of the operation log in bytes.
    pub log_bytes: u64,
}

/// Set once a dropped indexer has written its last commit and released
/// its directory lock.
#[derive(Debug, Default)]
pub(crate) struct ReleaseSignal {
    released: Mutex<bool>,
    cond: Condvar,
}

impl ReleaseSignal {
    fn notify(&self) {
        *self.released.lock() = true;
        self.cond.notify_all();
    }

    /// Blocks until the owning indexer has been fully dropped.
    pub(crate) fn wait(&self) {
        let mut released = self.released.lock();
        while !*released {
            self.cond.wait(&mut released);
        }
    }
}

struct Writer {
    log: Option<IndexLog>,
    lock: Option<Box<dyn DirectoryLock>>,
    pending: Vec<IndexOp>,
    generation: u64,
}

/// An inverted index persisted as an operation log in a directory.
///
/// # Concurrency
///
/// Writers are serialized by a mutex. Searches read the last committed
/// snapshot under a shared lock and never see buffered operations. A
/// commit applies the whole batch to the snapshot under one write lock, so
/// an update's delete and add become visible together.
///
/// # Durability
///
/// Each commit appends the batch and a commit marker to `index.log` and,
/// with `sync_on_commit`, syncs it. Dropping the indexer commits pending
/// operations and releases the directory lock.
pub struct FullTextIndexer {
    location: String,
    config: IndexerConfig,
    directory: Box<dyn Directory>,
    writer: Mutex<Writer>,
    snapshot: RwLock<InvertedIndex>,
    release: Arc<ReleaseSignal>,
}

impl FullTextIndexer {
    /// Opens or creates an index in a file-system directory.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Locked`] if another writer holds the directory,
    /// [`IndexError::Corrupted`] if the log fails validation, or a storage
    /// error.
    pub fn open(path: impl AsRef<Path>, config: IndexerConfig) -> IndexResult<Self> {
        config.validate()?;
        let directory = FsDirectory::open(path.as_ref(), config.create_if_missing)?;
        Self::open_in(Box::new(directory), config)
    }

    /// Opens or creates an index in any [`Directory`].
    pub fn open_in(directory: Box<dyn Directory>, config: IndexerConfig) -> IndexResult<Self> {
        config.validate()?;
        let location = directory.location();
        let lock = directory.obtain_lock(LOCK_FILE).map_err(|e| match e {
            StorageError::Locked(_) => IndexError::Locked {
                location: location.clone(),
            },
            other => other.into(),
        })?;

        if directory.file_exists(COMPACT_FILE) {
            warn!(location = %location, "removing leftover compaction file");
            directory.delete_file(COMPACT_FILE)?;
        }

        let mut file = directory.open_file(LOG_FILE)?;
        let bytes = file.read_all()?;
        let recovered = log::recover(&bytes)?;
        if recovered.committed_len < bytes.len() as u64 {
            file.truncate(recovered.committed_len)?;
            file.sync()?;
        }

        let mut snapshot = InvertedIndex::new(Analyzer::new(config.tokenizer.clone()));
        for op in recovered.ops {
            snapshot.apply(op);
        }
        info!(
            location = %location,
            documents = snapshot.live_count(),
            generation = recovered.generation,
            "opened full-text index"
        );

        Ok(Self {
            writer: Mutex::new(Writer {
                log: Some(IndexLog::from_file(file, config.sync_on_commit)),
                lock: Some(lock),
                pending: Vec::new(),
                generation: recovered.generation,
            }),
            snapshot: RwLock::new(snapshot),
            release: Arc::new(ReleaseSignal::default()),
            location,
            config,
            directory,
        })
    }

    /// The configuration the index was opened with.
    #[must_use]
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Current statistics.
    pub fn stats(&self) -> IndexResult<IndexStats> {
        let writer = self.writer.lock();
        let log_bytes = match &writer.log {
            Some(log) => log.size()?,
            None => 0,
        };
        let snapshot = self.snapshot.read();
        Ok(IndexStats {
            location: self.location.clone(),
            documents: snapshot.live_count(),
            deleted: snapshot.deleted_count(),
            fields: snapshot.field_count(),
            terms: snapshot.term_count(),
            pending: writer.pending.len(),
            generation: writer.generation,
            log_bytes,
        })
    }

    /// Copies of the committed live documents, in insertion order.
    #[must_use]
    pub fn documents(&self) -> Vec<Document> {
        self.snapshot.read().documents().cloned().collect()
    }

    /// Commits pending work and rewrites the log with live documents only.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Write`] if the index is closed or the rewrite
    /// fails; the previous log stays in place on failure.
    pub fn compact(&self) -> IndexResult<()> {
        let mut writer = self.writer.lock();
        self.commit_locked(&mut writer)?;
        self.compact_locked(&mut writer)
    }

    /// Commits pending work and releases the directory.
    ///
    /// Searches keep working on the last snapshot; writes fail afterwards.
    /// Closing twice is a no-op.
    pub fn close(&self) -> IndexResult<()> {
        let mut writer = self.writer.lock();
        if writer.log.is_none() {
            return Ok(());
        }
        self.commit_locked(&mut writer)?;
        if let Some(log) = writer.log.as_mut() {
            log.sync()?;
        }
        writer.log = None;
        writer.lock = None;
        info!(location = %self.location, "closed full-text index");
        Ok(())
    }

    pub(crate) fn release_signal(&self) -> Arc<ReleaseSignal> {
        Arc::clone(&self.release)
    }

    /// Returns true once [`FullTextIndexer::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.writer.lock().log.is_none()
    }

    fn submit(&self, op: IndexOp) -> IndexResult<()> {
        let mut writer = self.writer.lock();
        if writer.log.is_none() {
            return Err(self.closed_error());
        }
        writer.pending.push(op);
        if self.config.auto_commit || writer.pending.len() >= self.config.max_buffered_ops {
            self.commit_locked(&mut writer)?;
        }
        Ok(())
    }

    fn commit_locked(&self, writer: &mut Writer) -> IndexResult<()> {
        if writer.pending.is_empty() {
            return Ok(());
        }
        let ops = std::mem::take(&mut writer.pending);
        let generation = writer.generation + 1;
        let Some(log) = writer.log.as_mut() else {
            return Err(self.closed_error());
        };
        log.append_commit(&ops, generation)?;
        writer.generation = generation;

        let count = ops.len();
        {
            let mut snapshot = self.snapshot.write();
            for op in ops {
                snapshot.apply(op);
            }
        }
        debug!(location = %self.location, generation, ops = count, "committed");

        if self.should_compact() {
            self.compact_locked(writer)?;
        }
        Ok(())
    }

    fn should_compact(&self) -> bool {
        if self.config.compact_ratio <= 0.0 {
            return false;
        }
        let snapshot = self.snapshot.read();
        let deleted = snapshot.deleted_count();
        let total = deleted + snapshot.live_count();
        deleted >= MIN_COMPACT_DELETES && deleted as f64 / total as f64 >= self.config.compact_ratio
    }

    fn compact_locked(&self, writer: &mut Writer) -> IndexResult<()> {
        if writer.log.is_none() {
            return Err(self.closed_error());
        }
        let compacted = self.snapshot.read().compacted();
        let ops: Vec<IndexOp> = compacted.documents().cloned().map(IndexOp::Add).collect();

        if self.directory.file_exists(COMPACT_FILE) {
            self.directory.delete_file(COMPACT_FILE)?;
        }
        let mut rewritten = IndexLog::open(
            self.directory.as_ref(),
            COMPACT_FILE,
            self.config.sync_on_commit,
        )?;
        rewritten.append_commit(&ops, writer.generation)?;
        rewritten.sync()?;

        // The open handle follows the file through the rename. The old log
        // stays in place until the swap succeeds.
        if let Err(e) = self.directory.rename_file(COMPACT_FILE, LOG_FILE) {
            drop(rewritten);
            if let Err(cleanup) = self.directory.delete_file(COMPACT_FILE) {
                warn!(location = %self.location, error = %cleanup, "cannot remove compaction file");
            }
            return Err(IndexError::write(format!("cannot swap compacted log: {e}")));
        }
        writer.log = Some(rewritten);

        let before = {
            let mut snapshot = self.snapshot.write();
            let before = snapshot.deleted_count();
            *snapshot = compacted;
            before
        };
        info!(
            location = %self.location,
            documents = ops.len(),
            reclaimed = before,
            "compacted index log"
        );
        Ok(())
    }

    fn closed_error(&self) -> IndexError {
        IndexError::write(format!("index at {} is closed", self.location))
    }
}

impl Indexer for FullTextIndexer {
    fn index(&self, document: Document) -> IndexResult<()> {
        self.submit(IndexOp::Add(document))
    }

    fn update(&self, id_field: &str, document: Document) -> IndexResult<()> {
        if document.entity_class().is_none() {
            return Err(IndexError::write("document has no entity class"));
        }
        if !document.has_field(id_field) {
            return Err(IndexError::write(format!("document has no {id_field} value")));
        }
        self.submit(IndexOp::Update {
            id_field: id_field.to_string(),
            document,
        })
    }

    fn remove(&self, id: &str, entity_class: &str) -> IndexResult<()> {
        self.submit(IndexOp::Delete {
            id: id.to_string(),
            class: entity_class.to_string(),
        })
    }

    fn search(
        &self,
        entity_class: &str,
        query: &str,
        offset: usize,
        limit: usize,
        fetch_raw: bool,
    ) -> IndexResult<SearchResults> {
        let parsed = query::parse(query)?;
        let results = self
            .snapshot
            .read()
            .search(entity_class, &parsed, offset, limit, fetch_raw);
        debug!(
            location = %self.location,
            entity_class,
            query,
            hits = results.total_hits(),
            "searched"
        );
        Ok(results)
    }

    fn commit(&self) -> IndexResult<()> {
        let mut writer = self.writer.lock();
        if writer.log.is_none() {
            return Err(self.closed_error());
        }
        self.commit_locked(&mut writer)
    }

    fn document_count(&self) -> usize {
        self.snapshot.read().live_count()
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}

impl fmt::Debug for FullTextIndexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FullTextIndexer")
            .field("location", &self.location)
            .field("documents", &self.document_count())
            .finish_non_exhaustive()
    }
}

impl Drop for FullTextIndexer {
    fn drop(&mut self) {
        let writer = self.writer.get_mut();
        if let Some(log) = writer.log.as_mut() {
            let ops = std::mem::take(&mut writer.pending);
            if !ops.is_empty() {
                if let Err(e) = log.append_commit(&ops, writer.generation + 1) {
                    warn!(location = %self.location, error = %e, "failed to commit on drop");
                }
            }
            if let Err(e) = log.sync() {
                warn!(location = %self.location, error = %e, "failed to sync on drop");
            }
            debug!(location = %self.location, "released full-text index");
        }
        writer.log = None;
        writer.lock = None;
        self.release.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ENTITY_CLASS_FIELD, ENTITY_ID_FIELD};
    use propdex_storage::{IndexFile, RamDirectory, StorageResult};
    use tempfile::tempdir;

    const PERSON: &str = "com.example.Person";

    fn person(id: &str, age: i32) -> Document {
        let mut doc = Document::new();
        doc.add_keyword(ENTITY_CLASS_FIELD, PERSON);
        doc.add_keyword(ENTITY_ID_FIELD, id);
        doc.add_text("Person.AGE", age, 1.0);
        doc
    }

    fn hits(indexer: &FullTextIndexer, query: &str) -> Vec<String> {
        indexer
            .search(PERSON, query, 0, 100, false)
            .unwrap()
            .ids()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn open_ram(dir: &RamDirectory, config: IndexerConfig) -> FullTextIndexer {
        FullTextIndexer::open_in(Box::new(dir.clone()), config).unwrap()
    }

    #[test]
    fn write_update_remove_cycle() {
        let dir = RamDirectory::new();
        let indexer = open_ram(&dir, IndexerConfig::default());

        indexer.index(person("p1", 32)).unwrap();
        assert_eq!(hits(&indexer, "Person.AGE:32"), vec!["p1"]);

        indexer.update(ENTITY_ID_FIELD, person("p1", 35)).unwrap();
        assert!(hits(&indexer, "Person.AGE:32").is_empty());
        assert_eq!(hits(&indexer, "Person.AGE:35"), vec!["p1"]);

        indexer.remove("p1", PERSON).unwrap();
        assert!(hits(&indexer, "Person.AGE:35").is_empty());
        indexer.remove("p1", PERSON).unwrap();
        assert_eq!(indexer.document_count(), 0);
    }

    #[test]
    fn committed_documents_survive_reopen() {
        let tmp = tempdir().unwrap();
        {
            let indexer = FullTextIndexer::open(tmp.path(), IndexerConfig::default()).unwrap();
            indexer.index(person("p1", 32)).unwrap();
            indexer.index(person("p2", 40)).unwrap();
            indexer.remove("p2", PERSON).unwrap();
        }
        let indexer = FullTextIndexer::open(tmp.path(), IndexerConfig::default()).unwrap();
        assert_eq!(indexer.document_count(), 1);
        assert_eq!(hits(&indexer, "Person.AGE:32"), vec!["p1"]);
        assert_eq!(indexer.stats().unwrap().generation, 3);
    }

    #[test]
    fn buffered_writes_are_invisible_until_commit() {
        let dir = RamDirectory::new();
        let indexer = open_ram(&dir, IndexerConfig::new().auto_commit(false));
        indexer.index(person("p1", 32)).unwrap();
        assert!(hits(&indexer, "Person.AGE:32").is_empty());
        assert_eq!(indexer.stats().unwrap().pending, 1);

        indexer.commit().unwrap();
        assert_eq!(hits(&indexer, "Person.AGE:32"), vec!["p1"]);
        assert_eq!(indexer.stats().unwrap().pending, 0);
    }

    #[test]
    fn buffer_limit_forces_commit() {
        let dir = RamDirectory::new();
        let indexer = open_ram(
            &dir,
            IndexerConfig::new().auto_commit(false).max_buffered_ops(2),
        );
        indexer.index(person("p1", 32)).unwrap();
        assert_eq!(indexer.document_count(), 0);
        indexer.index(person("p2", 32)).unwrap();
        assert_eq!(indexer.document_count(), 2);
    }

    #[test]
    fn drop_commits_pending_work() {
        let dir = RamDirectory::new();
        {
            let indexer = open_ram(&dir, IndexerConfig::new().auto_commit(false));
            indexer.index(person("p1", 32)).unwrap();
        }
        let indexer = open_ram(&dir, IndexerConfig::default());
        assert_eq!(indexer.document_count(), 1);
    }

    #[test]
    fn uncommitted_tail_is_dropped_on_open() {
        let dir = RamDirectory::new();
        {
            let indexer = open_ram(&dir, IndexerConfig::default());
            indexer.index(person("p1", 32)).unwrap();
        }
        let mut bytes = dir.file_bytes(LOG_FILE).unwrap();
        let committed = bytes.len();
        bytes.extend_from_slice(&log::encode_record(&IndexOp::Add(person("p2", 1))).unwrap());
        bytes.extend_from_slice(b"PDXL\x10");
        dir.set_file_bytes(LOG_FILE, bytes);

        let indexer = open_ram(&dir, IndexerConfig::default());
        assert_eq!(indexer.document_count(), 1);
        drop(indexer);
        assert_eq!(dir.file_bytes(LOG_FILE).unwrap().len(), committed);
    }

    #[test]
    fn corrupted_log_fails_to_open() {
        let dir = RamDirectory::new();
        {
            let indexer = open_ram(&dir, IndexerConfig::default());
            indexer.index(person("p1", 32)).unwrap();
            indexer.index(person("p2", 33)).unwrap();
        }
        let mut bytes = dir.file_bytes(LOG_FILE).unwrap();
        bytes[10] ^= 0xFF;
        dir.set_file_bytes(LOG_FILE, bytes);

        let err = FullTextIndexer::open_in(Box::new(dir.clone()), IndexerConfig::default())
            .unwrap_err();
        assert!(matches!(err, IndexError::Corrupted { .. }));
    }

    #[test]
    fn second_writer_is_locked_out() {
        let dir = RamDirectory::new();
        let _first = open_ram(&dir, IndexerConfig::default());
        let err = FullTextIndexer::open_in(Box::new(dir.clone()), IndexerConfig::default())
            .unwrap_err();
        assert!(matches!(err, IndexError::Locked { .. }));
    }

    #[test]
    fn close_releases_lock_and_rejects_writes() {
        let dir = RamDirectory::new();
        let indexer = open_ram(&dir, IndexerConfig::new().auto_commit(false));
        indexer.index(person("p1", 32)).unwrap();
        indexer.close().unwrap();
        indexer.close().unwrap();
        assert!(indexer.is_closed());
        assert!(indexer.index(person("p2", 1)).unwrap_err().is_write_error());
        assert_eq!(hits(&indexer, "Person.AGE:32"), vec!["p1"]);

        let reopened = open_ram(&dir, IndexerConfig::default());
        assert_eq!(reopened.document_count(), 1);
    }

    #[test]
    fn compaction_keeps_live_documents() {
        let dir = RamDirectory::new();
        let indexer = open_ram(&dir, IndexerConfig::new().compact_ratio(0.0));
        for i in 0..10 {
            indexer.index(person(&format!("p{i}"), i)).unwrap();
        }
        for i in 0..8 {
            indexer.remove(&format!("p{i}"), PERSON).unwrap();
        }
        let before = indexer.stats().unwrap();
        assert_eq!(before.deleted, 10 - 2);

        indexer.compact().unwrap();
        let after = indexer.stats().unwrap();
        assert_eq!(after.documents, 2);
        assert_eq!(after.deleted, 0);
        assert!(after.log_bytes < before.log_bytes);
        assert_eq!(hits(&indexer, "Person.AGE:9"), vec!["p9"]);

        drop(indexer);
        let reopened = open_ram(&dir, IndexerConfig::default());
        assert_eq!(reopened.document_count(), 2);
        assert!(!dir.file_exists(COMPACT_FILE));
    }

    /// Delegates to a RAM directory but refuses every rename.
    #[derive(Debug)]
    struct NoRename(RamDirectory);

    impl Directory for NoRename {
        fn location(&self) -> String {
            self.0.location()
        }

        fn open_file(&self, name: &str) -> StorageResult<Box<dyn IndexFile>> {
            self.0.open_file(name)
        }

        fn file_exists(&self, name: &str) -> bool {
            self.0.file_exists(name)
        }

        fn delete_file(&self, name: &str) -> StorageResult<()> {
            self.0.delete_file(name)
        }

        fn rename_file(&self, _from: &str, _to: &str) -> StorageResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }

        fn list_files(&self) -> StorageResult<Vec<String>> {
            self.0.list_files()
        }

        fn obtain_lock(&self, name: &str) -> StorageResult<Box<dyn DirectoryLock>> {
            self.0.obtain_lock(name)
        }
    }

    #[test]
    fn failed_compaction_swap_keeps_the_index_writable() {
        let dir = RamDirectory::new();
        let indexer = FullTextIndexer::open_in(
            Box::new(NoRename(dir.clone())),
            IndexerConfig::new().compact_ratio(0.0),
        )
        .unwrap();
        indexer.index(person("p1", 32)).unwrap();
        indexer.index(person("p2", 35)).unwrap();
        indexer.remove("p2", PERSON).unwrap();

        let err = indexer.compact().unwrap_err();
        assert!(err.is_write_error());
        assert!(err.to_string().contains("swap"), "{err}");
        assert!(!indexer.is_closed());
        assert!(!dir.file_exists(COMPACT_FILE));

        indexer.index(person("p3", 41)).unwrap();
        assert_eq!(hits(&indexer, "Person.AGE:41"), vec!["p3"]);
        drop(indexer);

        let reopened = open_ram(&dir, IndexerConfig::default());
        assert_eq!(reopened.document_count(), 2);
        assert_eq!(hits(&reopened, "Person.AGE:32"), vec!["p1"]);
    }

    #[test]
    fn automatic_compaction_on_commit() {
        let dir = RamDirectory::new();
        let indexer = open_ram(&dir, IndexerConfig::new().compact_ratio(0.5));
        for i in 0..MIN_COMPACT_DELETES + 4 {
            indexer.index(person(&format!("p{i}"), 1)).unwrap();
        }
        for i in 0..MIN_COMPACT_DELETES {
            indexer.remove(&format!("p{i}"), PERSON).unwrap();
        }
        let stats = indexer.stats().unwrap();
        assert_eq!(stats.documents, 4);
        assert_eq!(stats.deleted, 0);
    }

    #[test]
    fn rejects_invalid_config() {
        let dir = RamDirectory::new();
        let err = FullTextIndexer::open_in(
            Box::new(dir),
            IndexerConfig::new().max_buffered_ops(0),
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::InvalidArgument { .. }));
    }

    #[test]
    fn missing_directory_without_create() {
        let tmp = tempdir().unwrap();
        let err = FullTextIndexer::open(
            tmp.path().join("absent"),
            IndexerConfig::new().create_if_missing(false),
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::Storage(StorageError::DirectoryNotFound(_))));
    }
}

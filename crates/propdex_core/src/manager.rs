//! Index manager.

use crate::document::{DocumentMapper, ENTITY_ID_FIELD};
use crate::error::{IndexError, IndexResult};
use crate::indexer::{Indexer, SearchResults};
use crate::metadata::{EntityMetadata, MetadataRegistry};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Keeps an [`Indexer`] in step with entity mutations.
///
/// The manager maps entities through [`DocumentMapper`] and forwards the
/// documents to whichever indexer it was built with. It holds no state of
/// its own between calls.
///
/// # Example
///
/// ```
/// use propdex_core::{
///     EntityMetadata, IndexManager, IndexType, MemoryIndexer, MetadataRegistry, PropertyIndex,
/// };
/// use std::sync::Arc;
///
/// struct Person {
///     id: String,
///     age: i32,
/// }
///
/// let metadata = EntityMetadata::builder("com.example.Person")
///     .id("id", "PERSON_ID", |p: &Person| p.id.clone())
///     .property(PropertyIndex::new("age", "AGE", IndexType::None), |p: &Person| p.age)
///     .build()
///     .unwrap();
/// let mut registry = MetadataRegistry::new();
/// let metadata = registry.register(metadata).unwrap();
///
/// let manager = IndexManager::new(Arc::new(MemoryIndexer::new()), Arc::new(registry));
/// manager.write(&metadata, &Person { id: "p1".into(), age: 32 }).unwrap();
///
/// let hits = manager
///     .search("com.example.Person", "Person.AGE:32", 0, 10, false)
///     .unwrap();
/// assert!(hits.contains("p1"));
/// ```
#[derive(Clone)]
pub struct IndexManager {
    indexer: Arc<dyn Indexer>,
    registry: Arc<MetadataRegistry>,
}

impl IndexManager {
    /// Creates a manager over an indexer and a metadata registry.
    pub fn new(indexer: Arc<dyn Indexer>, registry: Arc<MetadataRegistry>) -> Self {
        Self { indexer, registry }
    }

    /// The indexer given at construction.
    #[must_use]
    pub fn indexer(&self) -> &Arc<dyn Indexer> {
        &self.indexer
    }

    /// The metadata registry given at construction.
    #[must_use]
    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }

    /// Indexes an entity. Writing the same entity twice leaves two
    /// documents; use [`IndexManager::update`] to replace.
    pub fn write<E>(&self, metadata: &EntityMetadata<E>, entity: &E) -> IndexResult<()> {
        let document = DocumentMapper::map(metadata, entity)?;
        debug!(
            class = metadata.class_name(),
            id = %document.entity_id().unwrap_or_default(),
            fields = document.len(),
            "indexing entity"
        );
        self.indexer.index(document)
    }

    /// Indexes a batch of entities, stopping at the first failure.
    pub fn write_all<'a, E: 'a>(
        &self,
        metadata: &EntityMetadata<E>,
        entities: impl IntoIterator<Item = &'a E>,
    ) -> IndexResult<usize> {
        let mut written = 0;
        for entity in entities {
            self.write(metadata, entity)?;
            written += 1;
        }
        Ok(written)
    }

    /// Replaces the indexed state of an entity.
    ///
    /// When `previous_id` is given and differs from the entity's current
    /// identifier, the documents of `previous_id` in `entity_class` are
    /// removed first. The entity's own documents are then replaced in one
    /// step. Both steps are scoped to `entity_class`, which must be the
    /// metadata's class.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidArgument`] when `entity_class` is not
    /// the metadata's class. Mapping happens before anything is removed, so
    /// a mapping error
    /// leaves the index untouched. If the removal succeeds and the
    /// replacement fails, the old documents stay deleted and the caller
    /// must write the entity again.
    pub fn update<E>(
        &self,
        metadata: &EntityMetadata<E>,
        entity: &E,
        previous_id: Option<&str>,
        entity_class: &str,
    ) -> IndexResult<()> {
        if entity_class != metadata.class_name() {
            return Err(IndexError::invalid_argument(format!(
                "cannot update {} as {entity_class}",
                metadata.class_name()
            )));
        }
        let document = DocumentMapper::map(metadata, entity)?;
        let id = document.entity_id().unwrap_or_default();

        if let Some(previous) = previous_id.filter(|p| *p != id) {
            debug!(class = entity_class, previous, id = %id, "identifier changed");
            self.indexer.remove(previous, entity_class)?;
        }
        debug!(class = entity_class, id = %id, "updating entity");
        self.indexer.update(ENTITY_ID_FIELD, document)
    }

    /// Removes every document indexed for `identifier` under the
    /// metadata's class.
    pub fn remove<E>(
        &self,
        metadata: &EntityMetadata<E>,
        entity: &E,
        identifier: &str,
    ) -> IndexResult<()> {
        debug!(
            class = metadata.class_name(),
            identifier,
            entity_id = %metadata.id().value(entity).to_index_text(),
            "removing entity"
        );
        self.indexer.remove(identifier, metadata.class_name())
    }

    /// Searches the documents of a registered class.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::UnknownEntity`] when `entity_class` has no
    /// metadata, or [`IndexError::Query`] for malformed query text.
    pub fn search(
        &self,
        entity_class: &str,
        query: &str,
        offset: usize,
        limit: usize,
        fetch_raw: bool,
    ) -> IndexResult<SearchResults> {
        self.check_class(entity_class)?;
        self.indexer
            .search(entity_class, query, offset, limit, fetch_raw)
    }

    /// The `n` best hits for a registered class, identifiers only.
    pub fn search_top(&self, entity_class: &str, query: &str, n: usize) -> IndexResult<SearchResults> {
        self.check_class(entity_class)?;
        self.indexer.search_top(entity_class, query, n)
    }

    /// Commits buffered operations of the indexer.
    pub fn flush(&self) -> IndexResult<()> {
        self.indexer.commit()
    }

    fn check_class(&self, entity_class: &str) -> IndexResult<()> {
        if self.registry.contains(entity_class) {
            Ok(())
        } else {
            Err(IndexError::UnknownEntity {
                class: entity_class.to_string(),
            })
        }
    }
}

impl fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexManager")
            .field("indexer", &self.indexer.location())
            .field("classes", &self.registry.class_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexerConfig;
    use crate::descriptor::{IndexType, PropertyIndex};
    use crate::indexer::{FullTextIndexer, MemoryIndexer};
    use propdex_storage::RamDirectory;

    const PERSON: &str = "com.example.Person";

    #[derive(Clone)]
    struct Person {
        id: Option<String>,
        name: String,
        age: i32,
    }

    fn person(id: &str, age: i32) -> Person {
        Person {
            id: Some(id.to_string()),
            name: "alice".to_string(),
            age,
        }
    }

    fn setup(indexer: Arc<dyn Indexer>) -> (IndexManager, Arc<EntityMetadata<Person>>) {
        let metadata = EntityMetadata::builder(PERSON)
            .id("id", "PERSON_ID", |p: &Person| p.id.clone())
            .property(
                PropertyIndex::new("name", "PERSON_NAME", IndexType::None),
                |p: &Person| p.name.clone(),
            )
            .property(
                PropertyIndex::new("age", "AGE", IndexType::Asc),
                |p: &Person| p.age,
            )
            .build()
            .unwrap();
        let mut registry = MetadataRegistry::new();
        let metadata = registry.register(metadata).unwrap();
        (IndexManager::new(indexer, Arc::new(registry)), metadata)
    }

    fn age_query(age: i32) -> String {
        format!("+{}:{PERSON} AND +Person.AGE:{age}", crate::document::ENTITY_CLASS_FIELD)
    }

    fn lifecycle(indexer: Arc<dyn Indexer>) {
        let (manager, metadata) = setup(indexer);
        let mut p1 = person("p1", 32);

        manager.write(&metadata, &p1).unwrap();
        assert!(manager.search(PERSON, &age_query(32), 0, 100, false).unwrap().contains("p1"));

        p1.age = 35;
        manager.update(&metadata, &p1, Some("p1"), PERSON).unwrap();
        assert!(manager.search(PERSON, &age_query(32), 0, 100, false).unwrap().is_empty());
        assert!(manager.search(PERSON, &age_query(35), 0, 100, false).unwrap().contains("p1"));

        manager.remove(&metadata, &p1, "p1").unwrap();
        assert!(manager.search(PERSON, &age_query(35), 0, 100, false).unwrap().is_empty());
    }

    #[test]
    fn lifecycle_on_memory_indexer() {
        lifecycle(Arc::new(MemoryIndexer::new()));
    }

    #[test]
    fn lifecycle_on_full_text_indexer() {
        let indexer =
            FullTextIndexer::open_in(Box::new(RamDirectory::new()), IndexerConfig::default())
                .unwrap();
        lifecycle(Arc::new(indexer));
    }

    #[test]
    fn hands_back_the_same_indexer() {
        let indexer: Arc<dyn Indexer> = Arc::new(MemoryIndexer::new());
        let (manager, _) = setup(Arc::clone(&indexer));
        assert!(Arc::ptr_eq(manager.indexer(), &indexer));
    }

    #[test]
    fn repeated_writes_duplicate_until_update() {
        let indexer = Arc::new(MemoryIndexer::new());
        let (manager, metadata) = setup(indexer.clone());
        let p1 = person("p1", 32);
        assert_eq!(manager.write_all(&metadata, [&p1, &p1]).unwrap(), 2);
        assert_eq!(indexer.document_count(), 2);

        let hits = manager.search(PERSON, "Person.AGE:32", 0, 10, false).unwrap();
        assert_eq!(hits.len(), 1);

        manager.update(&metadata, &p1, None, PERSON).unwrap();
        assert_eq!(indexer.document_count(), 1);
    }

    #[test]
    fn identifier_change_drops_old_documents() {
        let indexer = Arc::new(MemoryIndexer::new());
        let (manager, metadata) = setup(indexer.clone());
        manager.write(&metadata, &person("old", 40)).unwrap();

        manager
            .update(&metadata, &person("new", 41), Some("old"), PERSON)
            .unwrap();
        let hits = manager.search(PERSON, "Person.AGE:40 Person.AGE:41", 0, 10, false).unwrap();
        assert_eq!(hits.ids(), vec!["new"]);
        assert_eq!(indexer.remove_calls(), 1);
    }

    #[test]
    fn update_rejects_a_foreign_class() {
        let indexer = Arc::new(MemoryIndexer::new());
        let (manager, metadata) = setup(indexer.clone());
        manager.write(&metadata, &person("p1", 32)).unwrap();

        let err = manager
            .update(&metadata, &person("p2", 33), Some("p1"), "com.example.Robot")
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidArgument { .. }));
        assert_eq!(indexer.remove_calls(), 0);
        assert_eq!(
            manager.search(PERSON, "Person.AGE:32", 0, 10, false).unwrap().ids(),
            vec!["p1"]
        );
    }

    #[test]
    fn unknown_class_is_rejected() {
        let (manager, _) = setup(Arc::new(MemoryIndexer::new()));
        let err = manager.search("com.example.Robot", "*:*", 0, 10, false).unwrap_err();
        assert!(matches!(err, IndexError::UnknownEntity { class } if class == "com.example.Robot"));
        assert!(manager.search_top("Robot", "*:*", 1).is_err());
    }

    #[test]
    fn mapping_failure_leaves_index_untouched() {
        let indexer = Arc::new(MemoryIndexer::new());
        let (manager, metadata) = setup(indexer.clone());
        manager.write(&metadata, &person("p1", 32)).unwrap();

        let nameless = Person {
            id: None,
            name: "bob".into(),
            age: 1,
        };
        let err = manager
            .update(&metadata, &nameless, Some("p1"), PERSON)
            .unwrap_err();
        assert!(matches!(err, IndexError::Mapping { .. }));
        assert_eq!(indexer.document_count(), 1);
        assert_eq!(indexer.remove_calls(), 0);
    }

    #[test]
    fn removing_unknown_identifier_is_a_no_op() {
        let (manager, metadata) = setup(Arc::new(MemoryIndexer::new()));
        manager.remove(&metadata, &person("ghost", 1), "ghost").unwrap();
        manager.flush().unwrap();
    }

    #[test]
    fn search_top_limits_hits() {
        let (manager, metadata) = setup(Arc::new(MemoryIndexer::new()));
        for i in 0..5 {
            manager.write(&metadata, &person(&format!("p{i}"), 20)).unwrap();
        }
        let top = manager.search_top(PERSON, "Person.AGE:20", 3).unwrap();
        assert_eq!(top.ids(), vec!["p0", "p1", "p2"]);
        assert_eq!(top.total_hits(), 5);
    }
}

//! A minimal persistence client.
//!
//! [`TestClient`] keeps entities in a map and calls the [`IndexManager`]
//! around every mutation, the way a real data-store client would. Query
//! results come back as identifiers and are hydrated from the map.

use parking_lot::RwLock;
use propdex_core::{EntityMetadata, FieldValue, IndexError, IndexManager, IndexResult};
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type Key = (String, String);

/// Stores entities in memory and keeps the index in step.
pub struct TestClient {
    manager: RwLock<IndexManager>,
    store: RwLock<HashMap<Key, Box<dyn Any + Send + Sync>>>,
}

impl TestClient {
    /// Creates a client that indexes through `manager`.
    pub fn new(manager: IndexManager) -> Self {
        Self {
            manager: RwLock::new(manager),
            store: RwLock::new(HashMap::new()),
        }
    }

    /// Replaces the index manager; later mutations go to the new one.
    pub fn set_index_manager(&self, manager: IndexManager) {
        *self.manager.write() = manager;
    }

    /// The current index manager.
    pub fn index_manager(&self) -> IndexManager {
        self.manager.read().clone()
    }

    /// Stores a new entity and indexes it.
    ///
    /// Persisting an identifier that is already stored replaces it and
    /// updates the index instead of adding a second document.
    pub fn persist<E>(&self, entity: E) -> IndexResult<()>
    where
        E: Clone + Send + Sync + 'static,
    {
        let metadata = self.metadata::<E>()?;
        let key = key_of(&metadata, &entity)?;
        let existed = self.store.read().contains_key(&key);
        let manager = self.index_manager();
        if existed {
            manager.update(&metadata, &entity, Some(&key.1), &key.0)?;
        } else {
            manager.write(&metadata, &entity)?;
        }
        debug!(class = %key.0, id = %key.1, existed, "persisted");
        self.store.write().insert(key, Box::new(entity));
        Ok(())
    }

    /// Replaces a stored entity, possibly under a new identifier.
    pub fn merge<E>(&self, previous_id: &str, entity: E) -> IndexResult<()>
    where
        E: Clone + Send + Sync + 'static,
    {
        let metadata = self.metadata::<E>()?;
        let key = key_of(&metadata, &entity)?;
        self.index_manager()
            .update(&metadata, &entity, Some(previous_id), &key.0)?;
        let mut store = self.store.write();
        store.remove(&(key.0.clone(), previous_id.to_string()));
        store.insert(key, Box::new(entity));
        Ok(())
    }

    /// Deletes a stored entity and its documents. Returns the entity if it
    /// was stored.
    pub fn remove<E>(&self, id: &str) -> IndexResult<Option<E>>
    where
        E: Clone + Send + Sync + 'static,
    {
        let metadata = self.metadata::<E>()?;
        let key = (metadata.class_name().to_string(), id.to_string());
        let removed = self
            .store
            .write()
            .remove(&key)
            .and_then(|boxed| boxed.downcast::<E>().ok())
            .map(|boxed| *boxed);
        if let Some(entity) = removed.as_ref() {
            self.index_manager().remove(&metadata, entity, id)?;
        }
        Ok(removed)
    }

    /// Loads a stored entity.
    pub fn find<E>(&self, id: &str) -> IndexResult<Option<E>>
    where
        E: Clone + Send + Sync + 'static,
    {
        let metadata = self.metadata::<E>()?;
        let key = (metadata.class_name().to_string(), id.to_string());
        Ok(self
            .store
            .read()
            .get(&key)
            .and_then(|boxed| boxed.downcast_ref::<E>())
            .cloned())
    }

    /// Runs an index query and loads the matching entities in rank order.
    ///
    /// Hits whose entity is no longer stored are skipped.
    pub fn find_by_query<E>(&self, query: &str, offset: usize, limit: usize) -> IndexResult<Vec<E>>
    where
        E: Clone + Send + Sync + 'static,
    {
        let metadata = self.metadata::<E>()?;
        let results =
            self.index_manager()
                .search(metadata.class_name(), query, offset, limit, false)?;
        let mut entities = Vec::with_capacity(results.len());
        for id in results.ids() {
            if let Some(entity) = self.find::<E>(id)? {
                entities.push(entity);
            }
        }
        Ok(entities)
    }

    /// Number of stored entities of every type.
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    fn metadata<E: Send + Sync + 'static>(&self) -> IndexResult<Arc<EntityMetadata<E>>> {
        self.manager
            .read()
            .registry()
            .get::<E>()
            .ok_or_else(|| IndexError::UnknownEntity {
                class: type_name::<E>().to_string(),
            })
    }
}

fn key_of<E>(metadata: &EntityMetadata<E>, entity: &E) -> IndexResult<Key> {
    match metadata.id().value(entity) {
        FieldValue::Null => Err(IndexError::mapping(
            metadata.class_name(),
            metadata.id().name(),
            "identifier is null",
        )),
        id => Ok((metadata.class_name().to_string(), id.to_index_text())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Fixtures, Person};
    use crate::harness::memory_manager;
    use propdex_core::Indexer;

    #[test]
    fn persist_indexes_and_find_by_query_hydrates() {
        let fixtures = Fixtures::new();
        let (manager, indexer) = memory_manager(fixtures.registry.clone());
        let client = TestClient::new(manager);

        client.persist(Person::new("p1", 32).named("alice")).unwrap();
        client.persist(Person::new("p2", 40)).unwrap();
        assert_eq!(indexer.index_calls(), 2);

        let found: Vec<Person> = client.find_by_query("Person.AGE:32", 0, 10).unwrap();
        assert_eq!(found, vec![Person::new("p1", 32).named("alice")]);
    }

    #[test]
    fn persisting_again_updates() {
        let fixtures = Fixtures::new();
        let (manager, indexer) = memory_manager(fixtures.registry.clone());
        let client = TestClient::new(manager);

        client.persist(Person::new("p1", 32)).unwrap();
        client.persist(Person::new("p1", 33)).unwrap();
        assert_eq!(indexer.update_calls(), 1);
        assert_eq!(indexer.document_count(), 1);
        assert_eq!(client.len(), 1);
    }

    #[test]
    fn merge_moves_identifier() {
        let fixtures = Fixtures::new();
        let (manager, _) = memory_manager(fixtures.registry.clone());
        let client = TestClient::new(manager);

        client.persist(Person::new("old", 50)).unwrap();
        client.merge("old", Person::new("new", 50)).unwrap();
        assert!(client.find::<Person>("old").unwrap().is_none());
        let ids: Vec<_> = client
            .find_by_query::<Person>("Person.AGE:50", 0, 10)
            .unwrap()
            .into_iter()
            .filter_map(|p| p.person_id)
            .collect();
        assert_eq!(ids, vec!["new"]);
    }

    #[test]
    fn swapping_the_index_manager() {
        let fixtures = Fixtures::new();
        let (first, first_indexer) = memory_manager(fixtures.registry.clone());
        let (second, second_indexer) = memory_manager(fixtures.registry.clone());
        let client = TestClient::new(first);

        client.persist(Person::new("p1", 1)).unwrap();
        client.set_index_manager(second);
        client.persist(Person::new("p2", 2)).unwrap();
        assert_eq!(first_indexer.document_count(), 1);
        assert_eq!(second_indexer.document_count(), 1);
    }

    #[test]
    fn remove_returns_entity_and_unindexes() {
        let fixtures = Fixtures::new();
        let (manager, indexer) = memory_manager(fixtures.registry.clone());
        let client = TestClient::new(manager);

        client.persist(Person::new("p1", 32)).unwrap();
        let removed = client.remove::<Person>("p1").unwrap();
        assert_eq!(removed, Some(Person::new("p1", 32)));
        assert_eq!(indexer.document_count(), 0);
        assert_eq!(client.remove::<Person>("p1").unwrap(), None);
        assert!(client.is_empty());
    }

    #[test]
    fn unregistered_type_is_unknown() {
        #[derive(Clone)]
        struct Robot;

        let fixtures = Fixtures::new();
        let (manager, _) = memory_manager(fixtures.registry.clone());
        let client = TestClient::new(manager);
        let err = client.persist(Robot).unwrap_err();
        assert!(matches!(err, IndexError::UnknownEntity { .. }));
    }
}

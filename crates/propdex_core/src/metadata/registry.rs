//! Registry of entity metadata.

use crate::error::{IndexError, IndexResult};
use crate::metadata::entity::{EntityInfo, EntityMetadata};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Owns the metadata of every indexed entity type.
///
/// Typed lookups go through the Rust type; the index manager only sees
/// class names coming back from queries and resolves them through
/// [`MetadataRegistry::info`].
#[derive(Default)]
pub struct MetadataRegistry {
    by_type: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    by_class: HashMap<String, Arc<EntityInfo>>,
}

impl MetadataRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers metadata for `E`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidArgument`] if `E` or its class name is
    /// already registered.
    pub fn register<E: Send + Sync + 'static>(
        &mut self,
        metadata: EntityMetadata<E>,
    ) -> IndexResult<Arc<EntityMetadata<E>>> {
        let type_id = TypeId::of::<E>();
        if self.by_type.contains_key(&type_id) || self.by_class.contains_key(metadata.class_name())
        {
            return Err(IndexError::invalid_argument(format!(
                "{} is already registered",
                metadata.class_name()
            )));
        }

        let metadata = Arc::new(metadata);
        self.by_class
            .insert(metadata.class_name().to_string(), Arc::new(metadata.info()));
        self.by_type.insert(type_id, metadata.clone());
        Ok(metadata)
    }

    /// Metadata for `E`, if registered.
    #[must_use]
    pub fn get<E: Send + Sync + 'static>(&self) -> Option<Arc<EntityMetadata<E>>> {
        let any = Arc::clone(self.by_type.get(&TypeId::of::<E>())?);
        any.downcast::<EntityMetadata<E>>().ok()
    }

    /// Summary for a class name, if registered.
    #[must_use]
    pub fn info(&self, class_name: &str) -> Option<Arc<EntityInfo>> {
        self.by_class.get(class_name).cloned()
    }

    /// Returns true if the class name is registered.
    #[must_use]
    pub fn contains(&self, class_name: &str) -> bool {
        self.by_class.contains_key(class_name)
    }

    /// Registered class names, sorted.
    #[must_use]
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_class.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered entity types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_class.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_class.is_empty()
    }
}

impl std::fmt::Debug for MetadataRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataRegistry")
            .field("classes", &self.class_names())
            .finish()
    }
}

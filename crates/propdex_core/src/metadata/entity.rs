//! Entity metadata.

use crate::descriptor::PropertyIndex;
use crate::error::{IndexError, IndexResult};
use crate::metadata::attributes::{AttributeTable, EmbeddableMetadata};
use crate::value::{EnumLabel, FieldValue};
use std::fmt;
use std::sync::Arc;

type IdAccessor<E> = Arc<dyn Fn(&E) -> FieldValue + Send + Sync>;

/// The identifier attribute of an entity.
pub struct IdAttribute<E> {
    name: String,
    column: String,
    accessor: IdAccessor<E>,
}

impl<E> IdAttribute<E> {
    /// Attribute name on the entity.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column alias the identifier is indexed under.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Reads the identifier from an instance.
    pub fn value(&self, entity: &E) -> FieldValue {
        (self.accessor)(entity)
    }
}

/// Describes how instances of `E` are indexed.
///
/// Built once per entity type through [`EntityMetadata::builder`] and then
/// read-only. Field values are read through closures captured at build
/// time, one per attribute.
pub struct EntityMetadata<E> {
    class_name: String,
    simple_name: String,
    index_name: String,
    id: IdAttribute<E>,
    attributes: AttributeTable<E>,
}

impl<E: 'static> EntityMetadata<E> {
    /// Starts metadata for the entity with the given fully qualified class
    /// name (dot separated, e.g. `com.example.query.Person`).
    pub fn builder(class_name: impl Into<String>) -> EntityMetadataBuilder<E> {
        EntityMetadataBuilder {
            class_name: class_name.into(),
            index_name: None,
            id: None,
            attributes: AttributeTable::default(),
        }
    }
}

impl<E> EntityMetadata<E> {
    /// Fully qualified class name, stamped into `entity.class`.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Class name without its package, used to qualify field names.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    /// Logical index (table) name.
    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// The identifier attribute.
    #[must_use]
    pub fn id(&self) -> &IdAttribute<E> {
        &self.id
    }

    /// Indexed properties and embedded attributes.
    #[must_use]
    pub fn attributes(&self) -> &AttributeTable<E> {
        &self.attributes
    }

    /// Qualified document field name for a column: `<SimpleName>.<column>`.
    #[must_use]
    pub fn field_name(&self, column: &str) -> String {
        format!("{}.{}", self.simple_name, column)
    }

    /// Non-generic summary used for lookups by class name.
    #[must_use]
    pub fn info(&self) -> EntityInfo {
        let mut fields = vec![self.field_name(self.id.column())];
        fields.extend(
            self.attributes
                .columns()
                .iter()
                .map(|column| self.field_name(column)),
        );
        EntityInfo {
            class_name: self.class_name.clone(),
            simple_name: self.simple_name.clone(),
            index_name: self.index_name.clone(),
            id_field: self.field_name(self.id.column()),
            fields,
        }
    }
}

impl<E> fmt::Debug for EntityMetadata<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMetadata")
            .field("class_name", &self.class_name)
            .field("index_name", &self.index_name)
            .field("id", &self.id.name)
            .field("columns", &self.attributes.columns())
            .finish_non_exhaustive()
    }
}

/// Type-independent facts about a registered entity class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfo {
    /// Fully qualified class name.
    pub class_name: String,
    /// Class name without its package.
    pub simple_name: String,
    /// Logical index (table) name.
    pub index_name: String,
    /// Qualified document field holding the identifier.
    pub id_field: String,
    /// Every qualified document field the entity can produce.
    pub fields: Vec<String>,
}

/// Builder for [`EntityMetadata`].
pub struct EntityMetadataBuilder<E> {
    class_name: String,
    index_name: Option<String>,
    id: Option<IdAttribute<E>>,
    attributes: AttributeTable<E>,
}

impl<E: 'static> EntityMetadataBuilder<E> {
    /// Sets the logical index name (defaults to the simple class name).
    #[must_use]
    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    /// Declares the identifier attribute.
    #[must_use]
    pub fn id<V, F>(mut self, name: &str, column: &str, accessor: F) -> Self
    where
        V: Into<FieldValue>,
        F: Fn(&E) -> V + Send + Sync + 'static,
    {
        self.id = Some(IdAttribute {
            name: name.to_string(),
            column: column.to_string(),
            accessor: Arc::new(move |e: &E| accessor(e).into()),
        });
        self
    }

    /// Adds an indexed property.
    #[must_use]
    pub fn property<V, F>(mut self, descriptor: PropertyIndex, accessor: F) -> Self
    where
        V: Into<FieldValue>,
        F: Fn(&E) -> V + Send + Sync + 'static,
    {
        self.attributes.push_property(descriptor, accessor);
        self
    }

    /// Adds an indexed property whose read may fail.
    #[must_use]
    pub fn try_property<V, F>(mut self, descriptor: PropertyIndex, accessor: F) -> Self
    where
        V: Into<FieldValue>,
        F: Fn(&E) -> Result<V, String> + Send + Sync + 'static,
    {
        self.attributes.push_fallible(descriptor, accessor);
        self
    }

    /// Adds an enum property indexed by variant name.
    #[must_use]
    pub fn enumerated<L, F>(mut self, descriptor: PropertyIndex, accessor: F) -> Self
    where
        L: EnumLabel,
        F: Fn(&E) -> Option<L> + Send + Sync + 'static,
    {
        self.attributes.push_enum(descriptor, accessor);
        self
    }

    /// Adds an optional embedded attribute.
    #[must_use]
    pub fn embedded<U, F>(mut self, name: &str, metadata: EmbeddableMetadata<U>, accessor: F) -> Self
    where
        U: 'static,
        F: Fn(&E) -> Option<&U> + Send + Sync + 'static,
    {
        self.attributes
            .push_embedded(name, false, metadata, accessor);
        self
    }

    /// Adds an embedded attribute that must be present when mapping.
    #[must_use]
    pub fn required_embedded<U, F>(
        mut self,
        name: &str,
        metadata: EmbeddableMetadata<U>,
        accessor: F,
    ) -> Self
    where
        U: 'static,
        F: Fn(&E) -> Option<&U> + Send + Sync + 'static,
    {
        self.attributes.push_embedded(name, true, metadata, accessor);
        self
    }

    /// Finishes the metadata.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidArgument`] when the class name is empty,
    /// no identifier was declared, or attribute names repeat.
    pub fn build(self) -> IndexResult<EntityMetadata<E>> {
        let class_name = self.class_name.trim().to_string();
        if class_name.is_empty() {
            return Err(IndexError::invalid_argument("entity class name is empty"));
        }
        let id = self.id.ok_or_else(|| {
            IndexError::invalid_argument(format!("{class_name} declares no identifier"))
        })?;
        self.attributes.validate(&class_name)?;

        let simple_name = class_name
            .rsplit('.')
            .next()
            .unwrap_or(class_name.as_str())
            .to_string();
        let index_name = self.index_name.unwrap_or_else(|| simple_name.clone());

        Ok(EntityMetadata {
            class_name,
            simple_name,
            index_name,
            id,
            attributes: self.attributes,
        })
    }
}

//! Accessor tables for indexable attributes.
//!
//! An [`AttributeTable`] is built once per type and holds, for every
//! indexable attribute, its descriptor and a closure that reads the value
//! from an instance. Embedded attributes resolve to a type-erased
//! [`EmbeddedValue`] so tables of different embeddable types can nest.

use crate::descriptor::PropertyIndex;
use crate::error::{IndexError, IndexResult};
use crate::value::{EnumLabel, FieldValue};
use std::collections::HashSet;
use std::sync::Arc;

type ValueAccessor<T> = Arc<dyn Fn(&T) -> Result<FieldValue, String> + Send + Sync>;

type EmbeddedResolver<T> =
    Arc<dyn for<'a> Fn(&'a T) -> Option<Box<dyn EmbeddedValue + 'a>> + Send + Sync>;

/// Receives the attributes of an instance as a table walks them.
pub trait AttributeVisitor {
    /// Called for each indexed scalar property.
    fn property(
        &mut self,
        descriptor: &PropertyIndex,
        value: Result<FieldValue, String>,
    ) -> IndexResult<()>;

    /// Called for each embedded attribute; `value` is `None` when absent.
    fn embedded(
        &mut self,
        attribute: &EmbeddedAttributeInfo,
        value: Option<Box<dyn EmbeddedValue + '_>>,
    ) -> IndexResult<()>;
}

/// An embedded object bound to its metadata.
pub trait EmbeddedValue {
    /// Name of the embeddable type.
    fn type_name(&self) -> &str;

    /// Walks the embedded object's own attributes.
    fn visit(&self, visitor: &mut dyn AttributeVisitor) -> IndexResult<()>;
}

/// Static facts about an embedded attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedAttributeInfo {
    /// Attribute name on the owner.
    pub name: String,
    /// Whether an absent value is a mapping error.
    pub required: bool,
    /// Index names contributed by the embeddable, recursively.
    pub columns: Vec<String>,
}

struct IndexedProperty<T> {
    descriptor: PropertyIndex,
    accessor: ValueAccessor<T>,
}

struct EmbeddedAttribute<T> {
    info: EmbeddedAttributeInfo,
    resolve: EmbeddedResolver<T>,
}

/// Indexed properties and embedded attributes of one type.
pub struct AttributeTable<T> {
    properties: Vec<IndexedProperty<T>>,
    embedded: Vec<EmbeddedAttribute<T>>,
}

impl<T> Default for AttributeTable<T> {
    fn default() -> Self {
        Self {
            properties: Vec::new(),
            embedded: Vec::new(),
        }
    }
}

impl<T: 'static> AttributeTable<T> {
    pub(crate) fn push_property<V, F>(&mut self, descriptor: PropertyIndex, accessor: F)
    where
        V: Into<FieldValue>,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.properties.push(IndexedProperty {
            descriptor,
            accessor: Arc::new(move |t: &T| Ok(accessor(t).into())),
        });
    }

    pub(crate) fn push_fallible<V, F>(&mut self, descriptor: PropertyIndex, accessor: F)
    where
        V: Into<FieldValue>,
        F: Fn(&T) -> Result<V, String> + Send + Sync + 'static,
    {
        self.properties.push(IndexedProperty {
            descriptor,
            accessor: Arc::new(move |t: &T| accessor(t).map(Into::into)),
        });
    }

    pub(crate) fn push_enum<L, F>(&mut self, descriptor: PropertyIndex, accessor: F)
    where
        L: EnumLabel,
        F: Fn(&T) -> Option<L> + Send + Sync + 'static,
    {
        self.properties.push(IndexedProperty {
            descriptor,
            accessor: Arc::new(move |t: &T| {
                Ok(accessor(t).map_or(FieldValue::Null, |l| FieldValue::from_enum(&l)))
            }),
        });
    }

    pub(crate) fn push_embedded<U, F>(
        &mut self,
        name: &str,
        required: bool,
        metadata: EmbeddableMetadata<U>,
        accessor: F,
    ) where
        U: 'static,
        F: Fn(&T) -> Option<&U> + Send + Sync + 'static,
    {
        let info = EmbeddedAttributeInfo {
            name: name.to_string(),
            required,
            columns: metadata.attributes.columns(),
        };
        let metadata = Arc::new(metadata);
        let resolve = resolver(move |owner: &T| {
            accessor(owner).map(|value| {
                Box::new(BoundEmbeddable {
                    metadata: Arc::clone(&metadata),
                    value,
                }) as Box<dyn EmbeddedValue + '_>
            })
        });
        self.embedded.push(EmbeddedAttribute { info, resolve });
    }
}

impl<T> AttributeTable<T> {
    /// Walks the attributes of `instance`, properties first.
    pub fn visit(&self, instance: &T, visitor: &mut dyn AttributeVisitor) -> IndexResult<()> {
        for property in &self.properties {
            visitor.property(&property.descriptor, (property.accessor)(instance))?;
        }
        for attribute in &self.embedded {
            visitor.embedded(&attribute.info, (attribute.resolve)(instance))?;
        }
        Ok(())
    }

    /// Descriptors of the scalar properties, in declaration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &PropertyIndex> {
        self.properties.iter().map(|p| &p.descriptor)
    }

    /// Facts about the embedded attributes, in declaration order.
    pub fn embedded_attributes(&self) -> impl Iterator<Item = &EmbeddedAttributeInfo> {
        self.embedded.iter().map(|e| &e.info)
    }

    /// Every index name this table contributes, embedded ones included.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .descriptors()
            .map(|d| d.index_name().to_string())
            .collect();
        for attribute in self.embedded_attributes() {
            columns.extend(attribute.columns.iter().cloned());
        }
        columns
    }

    /// Finds the descriptor for an attribute name.
    #[must_use]
    pub fn descriptor(&self, field_name: &str) -> Option<&PropertyIndex> {
        self.descriptors().find(|d| d.field_name() == field_name)
    }

    /// Checks that attribute names are unique within this table.
    pub(crate) fn validate(&self, owner: &str) -> IndexResult<()> {
        let mut seen = HashSet::new();
        let names = self
            .descriptors()
            .map(PropertyIndex::field_name)
            .chain(self.embedded_attributes().map(|e| e.name.as_str()));
        for name in names {
            if name.is_empty() {
                return Err(IndexError::invalid_argument(format!(
                    "{owner} declares an attribute with an empty name"
                )));
            }
            if !seen.insert(name) {
                return Err(IndexError::invalid_argument(format!(
                    "{owner} declares attribute {name} twice"
                )));
            }
        }
        Ok(())
    }
}

fn resolver<T, F>(f: F) -> EmbeddedResolver<T>
where
    F: for<'a> Fn(&'a T) -> Option<Box<dyn EmbeddedValue + 'a>> + Send + Sync + 'static,
{
    Arc::new(f)
}

struct BoundEmbeddable<'a, U> {
    metadata: Arc<EmbeddableMetadata<U>>,
    value: &'a U,
}

impl<U> EmbeddedValue for BoundEmbeddable<'_, U> {
    fn type_name(&self) -> &str {
        &self.metadata.type_name
    }

    fn visit(&self, visitor: &mut dyn AttributeVisitor) -> IndexResult<()> {
        self.metadata.attributes.visit(self.value, visitor)
    }
}

/// Metadata for an embeddable value type.
///
/// Embeddables have no identity of their own; their properties are indexed
/// under the owning entity's name.
pub struct EmbeddableMetadata<U> {
    type_name: String,
    attributes: AttributeTable<U>,
}

impl<U: 'static> EmbeddableMetadata<U> {
    /// Starts metadata for an embeddable type.
    pub fn builder(type_name: impl Into<String>) -> EmbeddableMetadataBuilder<U> {
        EmbeddableMetadataBuilder {
            metadata: EmbeddableMetadata {
                type_name: type_name.into(),
                attributes: AttributeTable::default(),
            },
        }
    }

    /// Name of the embeddable type.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The accessor table.
    #[must_use]
    pub fn attributes(&self) -> &AttributeTable<U> {
        &self.attributes
    }
}

/// Builder for [`EmbeddableMetadata`].
pub struct EmbeddableMetadataBuilder<U> {
    metadata: EmbeddableMetadata<U>,
}

impl<U: 'static> EmbeddableMetadataBuilder<U> {
    /// Adds an indexed property.
    #[must_use]
    pub fn property<V, F>(mut self, descriptor: PropertyIndex, accessor: F) -> Self
    where
        V: Into<FieldValue>,
        F: Fn(&U) -> V + Send + Sync + 'static,
    {
        self.metadata.attributes.push_property(descriptor, accessor);
        self
    }

    /// Adds an indexed property whose read may fail.
    #[must_use]
    pub fn try_property<V, F>(mut self, descriptor: PropertyIndex, accessor: F) -> Self
    where
        V: Into<FieldValue>,
        F: Fn(&U) -> Result<V, String> + Send + Sync + 'static,
    {
        self.metadata.attributes.push_fallible(descriptor, accessor);
        self
    }

    /// Adds an enum property indexed by variant name.
    #[must_use]
    pub fn enumerated<L, F>(mut self, descriptor: PropertyIndex, accessor: F) -> Self
    where
        L: EnumLabel,
        F: Fn(&U) -> Option<L> + Send + Sync + 'static,
    {
        self.metadata.attributes.push_enum(descriptor, accessor);
        self
    }

    /// Adds an optional nested embeddable.
    #[must_use]
    pub fn embedded<W, F>(mut self, name: &str, metadata: EmbeddableMetadata<W>, accessor: F) -> Self
    where
        W: 'static,
        F: Fn(&U) -> Option<&W> + Send + Sync + 'static,
    {
        self.metadata
            .attributes
            .push_embedded(name, false, metadata, accessor);
        self
    }

    /// Adds a nested embeddable that must be present.
    #[must_use]
    pub fn required_embedded<W, F>(
        mut self,
        name: &str,
        metadata: EmbeddableMetadata<W>,
        accessor: F,
    ) -> Self
    where
        W: 'static,
        F: Fn(&U) -> Option<&W> + Send + Sync + 'static,
    {
        self.metadata
            .attributes
            .push_embedded(name, true, metadata, accessor);
        self
    }

    /// Finishes the metadata.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidArgument`] for empty or repeated
    /// attribute names.
    pub fn build(self) -> IndexResult<EmbeddableMetadata<U>> {
        self.metadata
            .attributes
            .validate(&self.metadata.type_name)?;
        Ok(self.metadata)
    }
}

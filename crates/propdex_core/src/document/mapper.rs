//! Entity to document mapping.

use crate::descriptor::{PropertyIndex, DEFAULT_BOOST};
use crate::document::{
    Document, ENTITY_CLASS_FIELD, ENTITY_ID_FIELD, ENTITY_INDEX_NAME_FIELD,
};
use crate::error::{IndexError, IndexResult};
use crate::metadata::{AttributeVisitor, EmbeddedAttributeInfo, EmbeddedValue, EntityMetadata};
use crate::value::FieldValue;

/// Flattens entities, embeddables included, into documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentMapper;

impl DocumentMapper {
    /// Maps `entity` into a document.
    ///
    /// Properties are written as `<SimpleName>.<COLUMN>`; the properties of
    /// embedded objects are written under the owning entity's simple name,
    /// at any nesting depth. Null values are left out.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Mapping`] when the identifier is null, a
    /// required embedded object is absent, or an accessor fails.
    pub fn map<E>(metadata: &EntityMetadata<E>, entity: &E) -> IndexResult<Document> {
        let id = metadata.id().value(entity);
        if id.is_null() {
            return Err(IndexError::mapping(
                metadata.class_name(),
                metadata.id().name(),
                "identifier is null",
            ));
        }

        let mut doc = Document::new();
        doc.add_keyword(ENTITY_CLASS_FIELD, metadata.class_name());
        doc.add_keyword(ENTITY_ID_FIELD, id.to_index_text());
        doc.add_keyword(ENTITY_INDEX_NAME_FIELD, metadata.index_name());
        doc.add_text(metadata.field_name(metadata.id().column()), id, DEFAULT_BOOST);

        let mut flattener = Flattener {
            doc: &mut doc,
            class_name: metadata.class_name(),
            simple_name: metadata.simple_name(),
            path: Vec::new(),
        };
        metadata.attributes().visit(entity, &mut flattener)?;

        Ok(doc)
    }
}

struct Flattener<'a> {
    doc: &'a mut Document,
    class_name: &'a str,
    simple_name: &'a str,
    path: Vec<String>,
}

impl Flattener<'_> {
    fn attribute_path(&self, name: &str) -> String {
        let mut path = self.path.join(".");
        if !path.is_empty() {
            path.push('.');
        }
        path.push_str(name);
        path
    }
}

impl AttributeVisitor for Flattener<'_> {
    fn property(
        &mut self,
        descriptor: &PropertyIndex,
        value: Result<FieldValue, String>,
    ) -> IndexResult<()> {
        let value = value.map_err(|reason| {
            IndexError::mapping(
                self.class_name,
                self.attribute_path(descriptor.field_name()),
                reason,
            )
        })?;
        self.doc.add_text(
            format!("{}.{}", self.simple_name, descriptor.index_name()),
            value,
            descriptor.boost(),
        );
        Ok(())
    }

    fn embedded(
        &mut self,
        attribute: &EmbeddedAttributeInfo,
        value: Option<Box<dyn EmbeddedValue + '_>>,
    ) -> IndexResult<()> {
        let Some(value) = value else {
            if attribute.required {
                return Err(IndexError::mapping(
                    self.class_name,
                    self.attribute_path(&attribute.name),
                    "required embedded object is absent",
                ));
            }
            return Ok(());
        };

        self.path.push(attribute.name.clone());
        let result = value.visit(&mut *self);
        self.path.pop();
        result
    }
}

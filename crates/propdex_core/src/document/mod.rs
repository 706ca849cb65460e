//! Flat documents handed to indexers.
//!
//! A [`Document`] is an ordered multi-map from field name to [`Field`].
//! Adding a field under a name that already exists keeps both values; the
//! field becomes multi-valued and every value is searchable.

mod mapper;

pub use mapper::DocumentMapper;

use crate::descriptor::DEFAULT_BOOST;
use crate::value::FieldValue;
use serde::{Deserialize, Serialize};

/// Reserved field holding the fully qualified entity class name.
pub const ENTITY_CLASS_FIELD: &str = "entity.class";

/// Reserved field holding the entity identifier as text.
pub const ENTITY_ID_FIELD: &str = "entity.id";

/// Reserved field holding the logical index (table) name.
pub const ENTITY_INDEX_NAME_FIELD: &str = "entity.indexname";

/// How a field value is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Matched exactly, without analysis.
    Keyword,
    /// Analyzed into tokens.
    Text,
}

/// A single field value with its boost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// The value.
    pub value: FieldValue,
    /// Relevance multiplier for matches in this field.
    pub boost: f32,
    /// Matching mode.
    pub kind: FieldKind,
}

impl Field {
    /// Value rendered as index text.
    #[must_use]
    pub fn text(&self) -> String {
        self.value.to_index_text()
    }
}

/// An ordered collection of named fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    fields: Vec<(String, Field)>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an analyzed field. Null values are ignored.
    pub fn add_text(&mut self, name: impl Into<String>, value: impl Into<FieldValue>, boost: f32) {
        self.add(name, value.into(), boost, FieldKind::Text);
    }

    /// Adds an exact-match field. Null values are ignored.
    pub fn add_keyword(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.add(name, value.into(), DEFAULT_BOOST, FieldKind::Keyword);
    }

    fn add(&mut self, name: impl Into<String>, value: FieldValue, boost: f32, kind: FieldKind) {
        if value.is_null() {
            return;
        }
        self.fields.push((name.into(), Field { value, boost, kind }));
    }

    /// First field with the given name.
    #[must_use]
    pub fn get<'a>(&'a self, name: &'a str) -> Option<&'a Field> {
        self.get_all(name).next()
    }

    /// Every field with the given name, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, f)| f)
    }

    /// Text of the first field with the given name.
    #[must_use]
    pub fn get_text(&self, name: &str) -> Option<String> {
        self.get(name).map(Field::text)
    }

    /// Returns true if at least one field has the given name.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    /// Distinct field names in first-seen order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (name, _) in &self.fields {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }

    /// Number of field values, counting every value of multi-valued fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the document has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The `entity.class` value.
    #[must_use]
    pub fn entity_class(&self) -> Option<String> {
        self.get_text(ENTITY_CLASS_FIELD)
    }

    /// The `entity.id` value.
    #[must_use]
    pub fn entity_id(&self) -> Option<String> {
        self.get_text(ENTITY_ID_FIELD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_valued_fields_keep_order() {
        let mut doc = Document::new();
        doc.add_text("Person.NAME", "ann", 1.0);
        doc.add_text("Person.NAME", "bob", 2.0);
        doc.add_keyword(ENTITY_ID_FIELD, "p1");

        let names: Vec<String> = doc.get_all("Person.NAME").map(Field::text).collect();
        assert_eq!(names, vec!["ann", "bob"]);
        assert_eq!(doc.get("Person.NAME").unwrap().boost, 1.0);
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.field_names(), vec!["Person.NAME", ENTITY_ID_FIELD]);
        assert_eq!(doc.entity_id().as_deref(), Some("p1"));
    }

    #[test]
    fn null_values_are_skipped() {
        let mut doc = Document::new();
        doc.add_text("Person.NAME", None::<String>, 1.0);
        assert!(doc.is_empty());
        assert!(!doc.has_field("Person.NAME"));
    }

    #[test]
    fn survives_cbor() {
        let mut doc = Document::new();
        doc.add_keyword(ENTITY_CLASS_FIELD, "com.example.Person");
        doc.add_text("Person.AGE", 32, 1.5);

        let mut buf = Vec::new();
        ciborium::into_writer(&doc, &mut buf).unwrap();
        let back: Document = ciborium::from_reader(buf.as_slice()).unwrap();
        assert_eq!(back, doc);
        assert_eq!(back.get("Person.AGE").unwrap().kind, FieldKind::Text);
    }
}

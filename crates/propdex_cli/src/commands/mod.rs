//! CLI command implementations.

pub mod clean;
pub mod compact;
pub mod dump;
pub mod search;
pub mod stats;

use propdex_core::{Document, FullTextIndexer, IndexerConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Opens an existing index; never creates one.
pub fn open_index(path: &Path) -> Result<FullTextIndexer, Box<dyn std::error::Error>> {
    if !path.join("index.log").exists() {
        return Err(format!("No index found at {}", path.display()).into());
    }
    Ok(FullTextIndexer::open(
        path,
        IndexerConfig::new().create_if_missing(false),
    )?)
}

/// A stored document in printable form.
#[derive(Debug, Serialize, PartialEq)]
pub struct DocumentView {
    /// Entity identifier.
    pub id: String,
    /// Entity class.
    pub class: String,
    /// Field values by name, in index text form.
    pub fields: BTreeMap<String, Vec<String>>,
}

impl From<&Document> for DocumentView {
    fn from(doc: &Document) -> Self {
        let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, field) in doc.fields() {
            fields.entry(name.to_string()).or_default().push(field.text());
        }
        Self {
            id: doc.entity_id().unwrap_or_default(),
            class: doc.entity_class().unwrap_or_default(),
            fields,
        }
    }
}

/// Prints a document view as indented text.
pub fn print_document(view: &DocumentView) {
    println!("{} ({})", view.id, view.class);
    for (name, values) in &view.fields {
        println!("  {:<32} {}", name, values.join(" | "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propdex_core::{ENTITY_CLASS_FIELD, ENTITY_ID_FIELD};

    #[test]
    fn view_groups_repeated_fields() {
        let mut doc = Document::new();
        doc.add_keyword(ENTITY_CLASS_FIELD, "Car");
        doc.add_keyword(ENTITY_ID_FIELD, "c1");
        doc.add_text("Car.label", "sport", 1.0);
        doc.add_text("Car.label", "winter", 1.0);

        let view = DocumentView::from(&doc);
        assert_eq!(view.id, "c1");
        assert_eq!(view.class, "Car");
        assert_eq!(view.fields["Car.label"], vec!["sport", "winter"]);
    }

    #[test]
    fn missing_index_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_index(dir.path()).unwrap_err();
        assert!(err.to_string().contains("No index found"));
        assert!(!dir.path().join("index.log").exists());
    }
}

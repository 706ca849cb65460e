//! Scan-based in-memory indexer.

use crate::analysis::{Analyzer, TokenizerConfig};
use crate::document::{Document, ENTITY_ID_FIELD};
use crate::error::{IndexError, IndexResult};
use crate::indexer::inverted::InvertedIndex;
use crate::indexer::{Indexer, SearchResults};
use crate::query;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Keeps documents in a vector and re-analyzes all of them on every search.
///
/// Nothing is persisted and every operation is immediately visible. Call
/// counters make it usable as a test double for the [`Indexer`] seam.
#[derive(Debug)]
pub struct MemoryIndexer {
    name: String,
    analyzer: Analyzer,
    documents: RwLock<Vec<Document>>,
    calls: CallCounters,
}

#[derive(Debug, Default)]
struct CallCounters {
    index: AtomicUsize,
    update: AtomicUsize,
    remove: AtomicUsize,
    search: AtomicUsize,
}

impl MemoryIndexer {
    /// Creates an empty indexer with the default analyzer.
    #[must_use]
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// Creates an empty indexer reporting `mem://<name>` as its location.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self::with_tokenizer(name, TokenizerConfig::default())
    }

    /// Creates an empty indexer with a custom tokenizer.
    #[must_use]
    pub fn with_tokenizer(name: &str, tokenizer: TokenizerConfig) -> Self {
        Self {
            name: name.to_string(),
            analyzer: Analyzer::new(tokenizer),
            documents: RwLock::new(Vec::new()),
            calls: CallCounters::default(),
        }
    }

    /// Copies of every stored document, in insertion order.
    #[must_use]
    pub fn documents(&self) -> Vec<Document> {
        self.documents.read().clone()
    }

    /// Number of `index` calls so far.
    #[must_use]
    pub fn index_calls(&self) -> usize {
        self.calls.index.load(Ordering::Relaxed)
    }

    /// Number of `update` calls so far.
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.calls.update.load(Ordering::Relaxed)
    }

    /// Number of `remove` calls so far.
    #[must_use]
    pub fn remove_calls(&self) -> usize {
        self.calls.remove.load(Ordering::Relaxed)
    }

    /// Number of `search` calls so far, `search_top` included.
    #[must_use]
    pub fn search_calls(&self) -> usize {
        self.calls.search.load(Ordering::Relaxed)
    }
}

impl Default for MemoryIndexer {
    fn default() -> Self {
        Self::new()
    }
}

fn same_entity(doc: &Document, class: &str, field: &str, value: &str) -> bool {
    doc.entity_class().as_deref() == Some(class)
        && doc.get_all(field).any(|f| f.text() == value)
}

impl Indexer for MemoryIndexer {
    fn index(&self, document: Document) -> IndexResult<()> {
        self.calls.index.fetch_add(1, Ordering::Relaxed);
        self.documents.write().push(document);
        Ok(())
    }

    fn update(&self, id_field: &str, document: Document) -> IndexResult<()> {
        self.calls.update.fetch_add(1, Ordering::Relaxed);
        let class = document
            .entity_class()
            .ok_or_else(|| IndexError::write("document has no entity class"))?;
        let value = document
            .get_text(id_field)
            .ok_or_else(|| IndexError::write(format!("document has no {id_field} value")))?;

        let mut documents = self.documents.write();
        documents.retain(|doc| !same_entity(doc, &class, id_field, &value));
        documents.push(document);
        Ok(())
    }

    fn remove(&self, id: &str, entity_class: &str) -> IndexResult<()> {
        self.calls.remove.fetch_add(1, Ordering::Relaxed);
        self.documents
            .write()
            .retain(|doc| !same_entity(doc, entity_class, ENTITY_ID_FIELD, id));
        Ok(())
    }

    fn search(
        &self,
        entity_class: &str,
        query: &str,
        offset: usize,
        limit: usize,
        fetch_raw: bool,
    ) -> IndexResult<SearchResults> {
        self.calls.search.fetch_add(1, Ordering::Relaxed);
        let parsed = query::parse(query)?;
        let documents = self.documents.read();
        let index = InvertedIndex::from_documents(self.analyzer.clone(), documents.iter());
        Ok(index.search(entity_class, &parsed, offset, limit, fetch_raw))
    }

    fn document_count(&self) -> usize {
        self.documents.read().len()
    }

    fn location(&self) -> String {
        format!("mem://{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ENTITY_CLASS_FIELD;

    fn doc(id: &str, age: i32) -> Document {
        let mut doc = Document::new();
        doc.add_keyword(ENTITY_CLASS_FIELD, "Person");
        doc.add_keyword(ENTITY_ID_FIELD, id);
        doc.add_text("Person.AGE", age, 1.0);
        doc
    }

    #[test]
    fn index_update_remove() {
        let indexer = MemoryIndexer::new();
        indexer.index(doc("p1", 32)).unwrap();
        indexer.index(doc("p1", 32)).unwrap();
        assert_eq!(indexer.document_count(), 2);

        indexer.update(ENTITY_ID_FIELD, doc("p1", 35)).unwrap();
        assert_eq!(indexer.document_count(), 1);
        assert!(indexer.search("Person", "Person.AGE:32", 0, 10, false).unwrap().is_empty());
        assert!(indexer
            .search("Person", "Person.AGE:35", 0, 10, false)
            .unwrap()
            .contains("p1"));

        indexer.remove("p1", "Person").unwrap();
        indexer.remove("p1", "Person").unwrap();
        assert_eq!(indexer.document_count(), 0);

        assert_eq!(indexer.index_calls(), 2);
        assert_eq!(indexer.update_calls(), 1);
        assert_eq!(indexer.remove_calls(), 2);
        assert_eq!(indexer.search_calls(), 2);
    }

    #[test]
    fn raw_fetch_returns_documents() {
        let indexer = MemoryIndexer::named("people");
        indexer.index(doc("p1", 32)).unwrap();
        let results = indexer.search("Person", "Person.AGE:32", 0, 10, true).unwrap();
        let stored = results.get("p1").and_then(|v| v.document()).unwrap();
        assert_eq!(stored.get_text("Person.AGE").as_deref(), Some("32"));
        assert_eq!(indexer.location(), "mem://people");
    }

    #[test]
    fn update_requires_identifier_value() {
        let indexer = MemoryIndexer::new();
        let err = indexer.update("Person.MISSING", doc("p1", 1)).unwrap_err();
        assert!(err.is_write_error());
    }

    #[test]
    fn malformed_query() {
        let indexer = MemoryIndexer::new();
        assert!(indexer
            .search("Person", "(Person.AGE:32", 0, 10, false)
            .unwrap_err()
            .is_query_error());
    }
}

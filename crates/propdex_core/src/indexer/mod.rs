//! Pluggable indexers.
//!
//! The [`Indexer`] trait is the seam between the index manager and a
//! backing store. Two implementations ship with the crate:
//!
//! - [`FullTextIndexer`]: a durable inverted index over a directory, with
//!   an operation log, commits and compaction
//! - [`MemoryIndexer`]: a scan-based in-memory double for tests and
//!   embedding
//!
//! Both evaluate the same query language with the same analyzer, so a
//! query behaves identically whichever indexer is plugged in.

mod fulltext;
mod inverted;
mod log;
mod memory;
mod registry;

pub use fulltext::{FullTextIndexer, IndexStats};
pub use memory::MemoryIndexer;
pub use registry::IndexerRegistry;

use crate::document::Document;
use crate::error::IndexResult;

/// A backing store that indexes documents and answers queries.
///
/// Implementations must be safe to share between threads; every method
/// takes `&self`.
pub trait Indexer: Send + Sync {
    /// Adds a document. Documents are not deduplicated by identifier.
    fn index(&self, document: Document) -> IndexResult<()>;

    /// Replaces the documents of the same class whose `id_field` value
    /// equals the document's own value for that field.
    ///
    /// Searchers never observe the state between the delete and the add.
    fn update(&self, id_field: &str, document: Document) -> IndexResult<()>;

    /// Deletes every document with the given `entity.id` and
    /// `entity.class`. Removing an unknown identifier is not an error.
    fn remove(&self, id: &str, entity_class: &str) -> IndexResult<()>;

    /// Runs `query` against the documents of `entity_class`.
    ///
    /// Hits are ranked by score, ties in insertion order, and then sliced
    /// by `offset` and `limit`. With `fetch_raw` every hit carries its
    /// stored document instead of the bare identifier.
    ///
    /// # Errors
    ///
    /// Returns [`crate::IndexError::Query`] for malformed query text.
    fn search(
        &self,
        entity_class: &str,
        query: &str,
        offset: usize,
        limit: usize,
        fetch_raw: bool,
    ) -> IndexResult<SearchResults>;

    /// Returns the `n` best hits, identifiers only.
    fn search_top(&self, entity_class: &str, query: &str, n: usize) -> IndexResult<SearchResults> {
        self.search(entity_class, query, 0, n, false)
    }

    /// Makes buffered operations searchable and durable.
    fn commit(&self) -> IndexResult<()> {
        Ok(())
    }

    /// Number of live documents.
    fn document_count(&self) -> usize;

    /// Where the index lives.
    fn location(&self) -> String;
}

/// What a hit carries back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum HitValue {
    /// The entity identifier; the caller loads the entity itself.
    Identifier(String),
    /// The stored document.
    Stored(Document),
}

impl HitValue {
    /// The stored document, if raw fetching was requested.
    #[must_use]
    pub fn document(&self) -> Option<&Document> {
        match self {
            Self::Identifier(_) => None,
            Self::Stored(doc) => Some(doc),
        }
    }
}

/// One ranked hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Entity identifier.
    pub id: String,
    /// Relevance score.
    pub score: f32,
    /// Identifier or stored document.
    pub value: HitValue,
}

/// A page of ranked hits keyed by entity identifier.
///
/// An identifier appears at most once, at its best rank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    hits: Vec<SearchHit>,
    total_hits: usize,
}

impl SearchResults {
    /// Creates results from a ranked page and the unpaginated hit count.
    #[must_use]
    pub fn new(hits: Vec<SearchHit>, total_hits: usize) -> Self {
        Self { hits, total_hits }
    }

    /// Looks up the hit for an identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&HitValue> {
        self.hits.iter().find(|h| h.id == id).map(|h| &h.value)
    }

    /// Returns true if the identifier is on this page.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Identifiers in rank order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.id.as_str()).collect()
    }

    /// Hits in rank order.
    #[must_use]
    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    /// Number of hits on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if this page has no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Number of matching identifiers before pagination.
    #[must_use]
    pub fn total_hits(&self) -> usize {
        self.total_hits
    }
}

impl IntoIterator for SearchResults {
    type Item = SearchHit;
    type IntoIter = std::vec::IntoIter<SearchHit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, score: f32) -> SearchHit {
        SearchHit {
            id: id.to_string(),
            score,
            value: HitValue::Identifier(id.to_string()),
        }
    }

    #[test]
    fn map_like_lookup() {
        let results = SearchResults::new(vec![hit("p2", 2.0), hit("p1", 1.0)], 5);
        assert_eq!(results.ids(), vec!["p2", "p1"]);
        assert_eq!(
            results.get("p1"),
            Some(&HitValue::Identifier("p1".to_string()))
        );
        assert!(!results.contains("p3"));
        assert_eq!(results.len(), 2);
        assert_eq!(results.total_hits(), 5);
        assert!(results.get("p1").and_then(HitValue::document).is_none());
    }

    #[test]
    fn empty_results() {
        let results = SearchResults::default();
        assert!(results.is_empty());
        assert_eq!(results.into_iter().count(), 0);
    }
}

//! # propdex core
//!
//! Keeps a full-text index in step with mutating domain entities.
//!
//! This crate provides:
//! - Property index descriptors and entity metadata built from closures
//! - A document mapper that flattens entities and their embeddables
//! - The [`Indexer`] seam with a durable [`FullTextIndexer`] and an
//!   in-memory [`MemoryIndexer`]
//! - A Lucene-style query language
//! - The [`IndexManager`] that ties mapping and indexing together
//!
//! ## Example
//!
//! ```
//! use propdex_core::{
//!     EntityMetadata, FullTextIndexer, IndexManager, IndexType, IndexerConfig,
//!     MetadataRegistry, PropertyIndex,
//! };
//! use std::sync::Arc;
//!
//! struct Person {
//!     id: String,
//!     age: i32,
//! }
//!
//! let dir = tempfile::tempdir().unwrap();
//! let indexer = FullTextIndexer::open(dir.path(), IndexerConfig::default()).unwrap();
//!
//! let mut registry = MetadataRegistry::new();
//! let person = registry
//!     .register(
//!         EntityMetadata::builder("com.example.Person")
//!             .id("id", "PERSON_ID", |p: &Person| p.id.clone())
//!             .property(PropertyIndex::new("age", "AGE", IndexType::None), |p: &Person| p.age)
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//!
//! let manager = IndexManager::new(Arc::new(indexer), Arc::new(registry));
//! manager.write(&person, &Person { id: "p1".into(), age: 32 }).unwrap();
//!
//! let hits = manager
//!     .search("com.example.Person", "+Person.AGE:32", 0, 10, false)
//!     .unwrap();
//! assert_eq!(hits.ids(), vec!["p1"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod analysis;
mod config;
mod descriptor;
mod document;
mod error;
mod indexer;
mod manager;
mod metadata;
pub mod query;
mod value;

pub use analysis::{Analyzer, Token, TokenizerConfig};
pub use config::IndexerConfig;
pub use descriptor::{IndexType, PropertyIndex, DEFAULT_BOOST};
pub use document::{
    Document, DocumentMapper, Field, FieldKind, ENTITY_CLASS_FIELD, ENTITY_ID_FIELD,
    ENTITY_INDEX_NAME_FIELD,
};
pub use error::{IndexError, IndexResult};
pub use indexer::{
    FullTextIndexer, HitValue, IndexStats, Indexer, IndexerRegistry, MemoryIndexer, SearchHit,
    SearchResults,
};
pub use manager::IndexManager;
pub use metadata::{
    AttributeTable, AttributeVisitor, EmbeddableMetadata, EmbeddableMetadataBuilder,
    EmbeddedAttributeInfo, EmbeddedValue, EntityInfo, EntityMetadata, EntityMetadataBuilder,
    IdAttribute, MetadataRegistry,
};
pub use propdex_storage::{Directory, FsDirectory, RamDirectory, StorageError};
pub use value::{EnumLabel, FieldValue};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

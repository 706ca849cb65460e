//! Entity and embeddable metadata.
//!
//! Metadata replaces runtime reflection: each indexed type declares its
//! identifier, indexed properties and embedded attributes once, as
//! closures over the concrete type.

mod attributes;
mod entity;
mod registry;

pub use attributes::{
    AttributeTable, AttributeVisitor, EmbeddableMetadata, EmbeddableMetadataBuilder,
    EmbeddedAttributeInfo, EmbeddedValue,
};
pub use entity::{EntityInfo, EntityMetadata, EntityMetadataBuilder, IdAttribute};
pub use registry::MetadataRegistry;

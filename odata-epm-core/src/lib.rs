//! Entity Property Mapping (EPM) for OData ATOM entries.
//!
//! EPM moves selected property values of an entity out of the
//! `m:properties` payload and into ATOM syndication elements (title, author,
//! updated, ...) or into custom namespaced elements of the entry.
//!
//! Core concepts:
//! - **MappingDescriptor**: A single declaration mapping a source property path to a target
//! - **EntityMappings**: The source and target path trees built from a type's declarations
//! - **MappingRegistry**: Per entity type mappings, with inheritance applied
//! - **EntryWriter** / **EntryReader**: Write and read whole entries through the mappings
//! - **ValueCache**: Enumerates each complex or collection value at most once per entry
//!
//! # Example
//!
//! ```
//! use odata_epm_core::{
//!     Entry, EntryWriter, MappingDescriptor, MappingRegistry, ProjectedProperties, Property,
//!     SyndicationItem, WriterBehavior,
//! };
//! use odata_epm_core::xml::XmlBuffer;
//!
//! let mut registry = MappingRegistry::new();
//! registry
//!     .register(
//!         "NS.Product",
//!         vec![MappingDescriptor::syndication("Name", SyndicationItem::Title).with_keep_in_content(false)],
//!     )
//!     .unwrap();
//!
//! let entry = Entry::new("NS.Product", vec![Property::new("Name", "Widget")]);
//! let mut buffer = XmlBuffer::new();
//! EntryWriter::new(&registry, WriterBehavior::default())
//!     .write_entry(&mut buffer, &entry, None, &ProjectedProperties::All)
//!     .unwrap();
//!
//! let xml = buffer.to_xml_string();
//! assert!(xml.contains("<title>Widget</title>"));
//! assert!(!xml.contains("<d:Name>"));
//! ```

pub mod atom;
mod behavior;
mod cache;
mod complex;
mod config;
mod error;
mod identity;
mod mapping;
mod merge;
mod projection;
pub mod reader;
mod registry;
pub mod schema;
pub mod tree;
mod value;
pub mod writer;
pub mod xml;

pub use atom::{AtomCategory, AtomEntryMetadata, AtomLink, AtomPerson, AtomSourceMetadata, AtomTextConstruct};
pub use behavior::{FormatBehavior, ReaderBehavior, WriterBehavior};
pub use cache::{EnumerateValues, LiveValues, ValueCache};
pub use complex::{ComplexType, ToPropertyValue};
pub use config::{EpmConfig, MappingConfig, PropertyConfig, TypeConfig};
pub use error::{EpmError, InternalError, Result};
pub use identity::ValueId;
pub use mapping::{CustomTarget, MappingDescriptor, MappingTarget, PersonKind, SyndicationItem, TextContentKind};
pub use merge::merge;
pub use projection::ProjectedProperties;
pub use reader::{EntryReader, ReadEntry};
pub use registry::MappingRegistry;
pub use schema::{EdmSchema, InMemorySchema, PropertyType, StructuredType};
pub use tree::EntityMappings;
pub use value::{
    format_timestamp, parse_timestamp, CollectionValue, ComplexValue, Entry, Enumerable, Primitive, PrimitiveKind,
    Property, PropertyValue,
};
pub use writer::EntryWriter;

#[cfg(feature = "derive")]
pub use odata_epm_derive::ComplexType;

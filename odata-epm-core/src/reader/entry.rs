use chrono::{DateTime, FixedOffset};
use tracing::{debug, instrument, trace};

use crate::atom::*;
use crate::behavior::ReaderBehavior;
use crate::error::{EpmError, Result};
use crate::mapping::{PersonKind, TextContentKind};
use crate::reader::{EntryPropertyBuilder, EpmCustomReader, EpmSyndicationReader, EpmValueStore};
use crate::registry::MappingRegistry;
use crate::schema::{EdmSchema, PropertyType};
use crate::value::{Entry, Primitive, Property, PropertyValue, parse_timestamp};
use crate::xml::{TokenReader, XmlBuffer, XmlError, XmlNodeType, XmlReader, XmlToken, XmlWriter};

/// An entry as read from an ATOM payload.
#[derive(Debug, Clone)]
pub struct ReadEntry {
    pub entry: Entry,
    pub metadata: AtomEntryMetadata,
}

/// Reads a single `atom:entry`: ATOM metadata, custom mapped elements and
/// `m:properties` content, then applies mapped values to the properties.
pub struct EntryReader<'a, S: EdmSchema + ?Sized> {
    schema: &'a S,
    registry: &'a MappingRegistry,
    behavior: ReaderBehavior,
}

/// Per-entry state shared by the element handlers.
struct EntryState {
    type_name: Option<String>,
    metadata: AtomEntryMetadata,
    properties: Vec<Property>,
    store: EpmValueStore,
}

impl<'a, S: EdmSchema + ?Sized> EntryReader<'a, S> {
    pub fn new(schema: &'a S, registry: &'a MappingRegistry, behavior: ReaderBehavior) -> Self {
        Self {
            schema,
            registry,
            behavior,
        }
    }

    /// The reader must be positioned on the `entry` start element; on return
    /// it is positioned after the matching end element.
    #[instrument(skip_all)]
    pub fn read_entry<R: XmlReader + ?Sized>(&self, reader: &mut R) -> Result<ReadEntry> {
        expect_element(reader, ATOM_NAMESPACE, ENTRY)?;

        let mut state = EntryState {
            type_name: None,
            metadata: AtomEntryMetadata::new(),
            properties: Vec::new(),
            store: EpmValueStore::new(),
        };
        // Elements that need the entity type, seen before the type category.
        let mut deferred: Vec<Vec<XmlToken>> = Vec::new();

        reader.read()?;
        loop {
            match reader.node_type() {
                XmlNodeType::Element => {}
                XmlNodeType::Text => {
                    reader.read()?;
                    continue;
                }
                XmlNodeType::EndElement => {
                    reader.read()?;
                    break;
                }
                XmlNodeType::None => return Err(XmlError::UnexpectedEof.into()),
            }

            let is_typed = reader.namespace_uri() != ATOM_NAMESPACE || reader.local_name() == CONTENT;
            if !is_typed {
                self.read_atom_element(reader, &mut state)?;
                continue;
            }
            match state.type_name.clone() {
                Some(type_name) => self.read_typed_element(reader, &type_name, &mut state)?,
                None => {
                    trace!(element = reader.local_name(), "buffering element until the entity type is known");
                    deferred.push(capture_element(reader)?);
                }
            }
        }

        let type_name = state.type_name.clone().ok_or(XmlError::Unexpected {
            expected: "entity type category",
            found: "entry without one".to_string(),
        })?;
        for tokens in deferred {
            self.read_typed_element(&mut TokenReader::new(tokens), &type_name, &mut state)?;
        }

        let EntryState {
            metadata,
            properties,
            mut store,
            ..
        } = state;
        let mut entry = Entry::new(type_name, properties);
        if let Some(mappings) = self.registry.mappings(&entry.type_name) {
            EpmSyndicationReader::new(mappings, self.behavior).read(&metadata, &mut store)?;
            EntryPropertyBuilder::new(self.schema).apply(&mut entry, &store)?;
        }
        debug!(
            entity_type = %entry.type_name,
            properties = entry.properties.len(),
            mapped_values = store.len(),
            "read entry"
        );
        Ok(ReadEntry { entry, metadata })
    }

    fn read_atom_element<R: XmlReader + ?Sized>(&self, reader: &mut R, state: &mut EntryState) -> Result<()> {
        let metadata = &mut state.metadata;
        let local_name = reader.local_name().to_string();
        match local_name.as_str() {
            TITLE => metadata.title = Some(read_text_construct(reader)?),
            SUMMARY => metadata.summary = Some(read_text_construct(reader)?),
            RIGHTS => metadata.rights = Some(read_text_construct(reader)?),
            UPDATED => {
                let (parsed, literal) = self.read_timestamp(reader)?;
                metadata.updated = parsed;
                metadata.updated_string = Some(literal);
            }
            PUBLISHED => {
                let (parsed, literal) = self.read_timestamp(reader)?;
                metadata.published = parsed;
                metadata.published_string = Some(literal);
            }
            AUTHOR => {
                let person = read_person(reader, PersonKind::Author)?;
                metadata.authors.get_or_insert_with(Vec::new).push(person);
            }
            CONTRIBUTOR => {
                let person = read_person(reader, PersonKind::Contributor)?;
                metadata.contributors.get_or_insert_with(Vec::new).push(person);
            }
            CATEGORY => {
                let category = read_category(reader)?;
                if category.scheme.as_deref() == Some(ODATA_SCHEME_NAMESPACE) {
                    state.type_name = category.term;
                } else {
                    metadata.categories.get_or_insert_with(Vec::new).push(category);
                }
            }
            LINK => {
                let link = AtomLink {
                    href: reader.attribute("", HREF).map(str::to_string),
                    relation: reader.attribute("", REL).map(str::to_string),
                    media_type: reader.attribute("", TYPE).map(str::to_string),
                    title: reader.attribute("", TITLE).map(str::to_string),
                };
                reader.skip()?;
                metadata.links.get_or_insert_with(Vec::new).push(link);
            }
            _ => reader.skip()?,
        }
        Ok(())
    }

    /// Content, `m:properties` and custom elements, read once the entity
    /// type is known.
    fn read_typed_element<R: XmlReader + ?Sized>(
        &self,
        reader: &mut R,
        type_name: &str,
        state: &mut EntryState,
    ) -> Result<()> {
        let (is_content, is_properties) = match reader.name() {
            Some(name) => (
                name.matches(ATOM_NAMESPACE, CONTENT),
                name.matches(ODATA_METADATA_NAMESPACE, PROPERTIES),
            ),
            None => (false, false),
        };
        if is_content {
            return self.read_content(reader, type_name, state);
        }
        if is_properties {
            state.properties = self.read_properties(reader, type_name)?;
            return Ok(());
        }
        match self.registry.mappings(type_name) {
            Some(mappings) => EpmCustomReader::new(mappings).read_element(reader, &mut state.store),
            None => {
                reader.skip()?;
                Ok(())
            }
        }
    }

    fn read_timestamp<R: XmlReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<(Option<DateTime<FixedOffset>>, String)> {
        let literal = reader.read_element_text()?;
        let parsed = parse_timestamp(&literal);
        if parsed.is_none() && !self.behavior.uses_string_timestamps() {
            return Err(EpmError::InvalidTimestamp { value: literal });
        }
        Ok((parsed, literal))
    }

    fn read_content<R: XmlReader + ?Sized>(
        &self,
        reader: &mut R,
        type_name: &str,
        state: &mut EntryState,
    ) -> Result<()> {
        reader.read()?;
        loop {
            match reader.node_type() {
                XmlNodeType::Element
                    if reader
                        .name()
                        .is_some_and(|n| n.matches(ODATA_METADATA_NAMESPACE, PROPERTIES)) =>
                {
                    state.properties = self.read_properties(reader, type_name)?;
                }
                XmlNodeType::Element => reader.skip()?,
                XmlNodeType::Text => {
                    reader.read()?;
                }
                XmlNodeType::EndElement => {
                    reader.read()?;
                    return Ok(());
                }
                XmlNodeType::None => return Err(XmlError::UnexpectedEof.into()),
            }
        }
    }

    /// Reads the `d:` children of the current element as properties of
    /// `owning_type`.
    fn read_properties<R: XmlReader + ?Sized>(&self, reader: &mut R, owning_type: &str) -> Result<Vec<Property>> {
        reader.read()?;
        let mut properties = Vec::new();
        loop {
            match reader.node_type() {
                XmlNodeType::Element if reader.namespace_uri() == ODATA_DATA_NAMESPACE => {
                    let name = reader.local_name().to_string();
                    let declared = self.schema.property(owning_type, &name).map(|d| d.ty.clone());
                    let value = self.read_value(reader, &name, declared)?;
                    properties.push(Property::new(name, value));
                }
                XmlNodeType::Element => reader.skip()?,
                XmlNodeType::Text => {
                    reader.read()?;
                }
                XmlNodeType::EndElement => {
                    reader.read()?;
                    return Ok(properties);
                }
                XmlNodeType::None => return Err(XmlError::UnexpectedEof.into()),
            }
        }
    }

    fn read_value<R: XmlReader + ?Sized>(
        &self,
        reader: &mut R,
        name: &str,
        declared: Option<PropertyType>,
    ) -> Result<PropertyValue> {
        if reader.attribute(ODATA_METADATA_NAMESPACE, NULL) == Some("true") {
            reader.skip()?;
            return Ok(PropertyValue::Null);
        }
        let declared = declared.or_else(|| {
            reader
                .attribute(ODATA_METADATA_NAMESPACE, TYPE)
                .map(PropertyType::parse)
        });
        match declared {
            Some(PropertyType::Primitive(kind)) => {
                let text = reader.read_element_text()?;
                kind.parse(&text)
                    .map(PropertyValue::Primitive)
                    .ok_or_else(|| EpmError::InvalidPrimitive {
                        property: name.to_string(),
                        value: text,
                        kind: kind.edm_name(),
                    })
            }
            Some(PropertyType::Complex(type_name)) => {
                let properties = self.read_properties(reader, &type_name)?;
                Ok(PropertyValue::complex(type_name, properties))
            }
            Some(PropertyType::Collection(item_type)) => {
                let item = PropertyType::parse(&item_type);
                let items = self.read_items(reader, name, &item)?;
                Ok(PropertyValue::collection(Some(format!("Collection({item_type})")), items))
            }
            None => Ok(PropertyValue::Primitive(Primitive::String(reader.read_element_text()?))),
        }
    }

    fn read_items<R: XmlReader + ?Sized>(
        &self,
        reader: &mut R,
        name: &str,
        item: &PropertyType,
    ) -> Result<Vec<PropertyValue>> {
        reader.read()?;
        let mut items = Vec::new();
        loop {
            match reader.node_type() {
                XmlNodeType::Element
                    if reader
                        .name()
                        .is_some_and(|n| n.matches(ODATA_DATA_NAMESPACE, COLLECTION_ELEMENT)) =>
                {
                    items.push(self.read_value(reader, name, Some(item.clone()))?);
                }
                XmlNodeType::Element => reader.skip()?,
                XmlNodeType::Text => {
                    reader.read()?;
                }
                XmlNodeType::EndElement => {
                    reader.read()?;
                    return Ok(items);
                }
                XmlNodeType::None => return Err(XmlError::UnexpectedEof.into()),
            }
        }
    }
}

fn expect_element<R: XmlReader + ?Sized>(reader: &R, namespace_uri: &str, local_name: &'static str) -> Result<()> {
    if reader.name().is_some_and(|n| n.matches(namespace_uri, local_name)) {
        return Ok(());
    }
    let found = match reader.name() {
        Some(name) => format!("element `{}`", name.qualified()),
        None => format!("{:?}", reader.node_type()),
    };
    Err(XmlError::Unexpected {
        expected: local_name,
        found,
    }
    .into())
}

/// Copies the current element into a token buffer and moves past it.
fn capture_element<R: XmlReader + ?Sized>(reader: &mut R) -> Result<Vec<XmlToken>> {
    let mut buffer = XmlBuffer::new();
    let mut depth = 0usize;
    loop {
        match reader.node_type() {
            XmlNodeType::Element => {
                let name = reader.name().cloned().ok_or(XmlError::UnexpectedEof)?;
                buffer.start_element(name.prefix.as_deref(), &name.local_name, &name.namespace_uri)?;
                for attribute in reader.attributes() {
                    buffer.attribute(
                        attribute.name.prefix.as_deref(),
                        &attribute.name.local_name,
                        &attribute.name.namespace_uri,
                        &attribute.value,
                    )?;
                }
                depth += 1;
            }
            XmlNodeType::Text => buffer.text(reader.value().unwrap_or_default())?,
            XmlNodeType::EndElement => {
                buffer.end_element()?;
                depth = depth.checked_sub(1).ok_or(XmlError::Unbalanced)?;
            }
            XmlNodeType::None => return Err(XmlError::UnexpectedEof.into()),
        }
        reader.read()?;
        if depth == 0 {
            return Ok(buffer.into_tokens());
        }
    }
}

fn read_text_construct<R: XmlReader + ?Sized>(reader: &mut R) -> Result<AtomTextConstruct> {
    let kind = reader
        .attribute("", TYPE)
        .and_then(TextContentKind::from_type_attribute)
        .unwrap_or_default();
    let text = reader.read_element_text()?;
    Ok(AtomTextConstruct { kind, text: Some(text) })
}

fn read_person<R: XmlReader + ?Sized>(reader: &mut R, kind: PersonKind) -> Result<AtomPerson> {
    expect_element(reader, ATOM_NAMESPACE, kind.element_name())?;
    let mut person = AtomPerson::default();
    reader.read()?;
    loop {
        match reader.node_type() {
            XmlNodeType::Element if reader.namespace_uri() == ATOM_NAMESPACE => {
                let local_name = reader.local_name().to_string();
                let field = match local_name.as_str() {
                    NAME => &mut person.name,
                    EMAIL => &mut person.email,
                    URI => &mut person.uri,
                    _ => {
                        reader.skip()?;
                        continue;
                    }
                };
                *field = Some(reader.read_element_text()?);
            }
            XmlNodeType::Element => reader.skip()?,
            XmlNodeType::Text => {
                reader.read()?;
            }
            XmlNodeType::EndElement => {
                reader.read()?;
                return Ok(person);
            }
            XmlNodeType::None => return Err(XmlError::UnexpectedEof.into()),
        }
    }
}

fn read_category<R: XmlReader + ?Sized>(reader: &mut R) -> Result<AtomCategory> {
    let category = AtomCategory {
        term: reader.attribute("", TERM).map(str::to_string),
        scheme: reader.attribute("", SCHEME).map(str::to_string),
        label: reader.attribute("", LABEL).map(str::to_string),
    };
    reader.skip()?;
    Ok(category)
}

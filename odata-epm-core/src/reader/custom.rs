use tracing::{instrument, trace};

use crate::atom::{NULL, ODATA_METADATA_NAMESPACE};
use crate::error::{InternalError, Result};
use crate::reader::EpmValueStore;
use crate::tree::{EntityMappings, TargetPathSegment};
use crate::xml::{XmlAttribute, XmlError, XmlNodeType, XmlReader};

/// Collects mapped values from custom (non-ATOM) elements of an entry.
pub struct EpmCustomReader<'a> {
    mappings: &'a EntityMappings,
}

impl<'a> EpmCustomReader<'a> {
    pub fn new(mappings: &'a EntityMappings) -> Self {
        Self { mappings }
    }

    /// Reads one custom element. The reader must be positioned on the
    /// element's start; on return it is positioned after the element's end.
    ///
    /// Elements no mapping targets are skipped without being looked at.
    #[instrument(skip_all, fields(entity_type = %self.mappings.type_name()))]
    pub fn read_element<R: XmlReader + ?Sized>(&self, reader: &mut R, store: &mut EpmValueStore) -> Result<()> {
        let root = self.mappings.target_tree().custom_root();
        match root.child(reader.namespace_uri(), reader.local_name(), false) {
            Some(segment) => read_segment(reader, segment, store),
            None => {
                trace!(element = reader.local_name(), "skipping unmapped custom element");
                reader.skip()?;
                Ok(())
            }
        }
    }
}

fn read_segment<R: XmlReader + ?Sized>(
    reader: &mut R,
    segment: &TargetPathSegment,
    store: &mut EpmValueStore,
) -> Result<()> {
    // The cursor leaves the start element below; keep its attributes.
    let attributes = reader.attributes().to_vec();

    if segment.has_content() {
        read_leaf_element(reader, segment, store)?;
    } else {
        read_children(reader, segment, store)?;
    }
    read_attributes(&attributes, segment, store);
    Ok(())
}

fn read_leaf_element<R: XmlReader + ?Sized>(
    reader: &mut R,
    segment: &TargetPathSegment,
    store: &mut EpmValueStore,
) -> Result<()> {
    let Some(mapping) = segment.mapping() else {
        return Err(InternalError::SegmentWithoutContent(segment.name().to_string()).into());
    };
    if store.contains(mapping) {
        trace!(element = segment.name(), "value already read, ignoring repeated element");
        reader.skip()?;
        return Ok(());
    }
    if reader.attribute(ODATA_METADATA_NAMESPACE, NULL) == Some("true") {
        reader.skip()?;
        store.try_store(mapping, None);
        return Ok(());
    }
    let text = reader.read_element_text()?;
    store.try_store(mapping, Some(text));
    Ok(())
}

fn read_children<R: XmlReader + ?Sized>(
    reader: &mut R,
    segment: &TargetPathSegment,
    store: &mut EpmValueStore,
) -> Result<()> {
    reader.read()?;
    loop {
        match reader.node_type() {
            XmlNodeType::Element => {
                match segment.child(reader.namespace_uri(), reader.local_name(), false) {
                    Some(child) => read_segment(reader, child, store)?,
                    None => reader.skip()?,
                }
            }
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

fn read_attributes(attributes: &[XmlAttribute], segment: &TargetPathSegment, store: &mut EpmValueStore) {
    for child in segment.attribute_children() {
        let Some(mapping) = child.mapping() else {
            continue;
        };
        let value = attributes
            .iter()
            .find(|a| a.name.matches(child.attribute_namespace_uri(), child.name()));
        if let Some(attribute) = value {
            if !store.try_store(mapping, Some(attribute.value.clone())) {
                trace!(attribute = child.name(), "value already read, ignoring repeated attribute");
            }
        }
    }
}

use tracing::{instrument, trace};

use crate::atom::{NULL, ODATA_METADATA_NAMESPACE, ODATA_METADATA_PREFIX};
use crate::cache::ValueCache;
use crate::error::{InternalError, Result};
use crate::tree::{EntityMappings, TargetPathSegment};
use crate::value::Entry;
use crate::writer::resolve_source_value;
use crate::xml::XmlWriter;

/// Writes the custom (non-ATOM) elements and attributes an entry's mappings
/// target.
pub struct EpmCustomWriter<'a> {
    mappings: &'a EntityMappings,
}

impl<'a> EpmCustomWriter<'a> {
    pub fn new(mappings: &'a EntityMappings) -> Self {
        Self { mappings }
    }

    /// Emits one top-level element per child of the custom root. Each
    /// top-level element declares its own namespace prefix, or makes its
    /// namespace the default one when the mapping has no prefix.
    #[instrument(skip_all, fields(entity_type = %self.mappings.type_name()))]
    pub fn write<W: XmlWriter + ?Sized>(&self, writer: &mut W, entry: &Entry, cache: &mut ValueCache) -> Result<()> {
        for segment in self.mappings.target_tree().custom_root().element_children() {
            writer.start_element(segment.namespace_prefix(), segment.name(), segment.namespace_uri())?;
            match segment.namespace_prefix() {
                Some(prefix) => writer.namespace_declaration(prefix, segment.namespace_uri())?,
                None => writer.default_namespace_declaration(segment.namespace_uri())?,
            }
            write_segment_body(writer, segment, entry, cache)?;
            writer.end_element()?;
        }
        Ok(())
    }
}

fn write_segment<W: XmlWriter + ?Sized>(
    writer: &mut W,
    segment: &TargetPathSegment,
    entry: &Entry,
    cache: &mut ValueCache,
) -> Result<()> {
    writer.start_element(segment.namespace_prefix(), segment.name(), segment.namespace_uri())?;
    write_segment_body(writer, segment, entry, cache)?;
    writer.end_element()?;
    Ok(())
}

/// Attributes first, then either the mapped text or the child elements.
fn write_segment_body<W: XmlWriter + ?Sized>(
    writer: &mut W,
    segment: &TargetPathSegment,
    entry: &Entry,
    cache: &mut ValueCache,
) -> Result<()> {
    for attribute in segment.attribute_children() {
        let mapping = attribute
            .mapping()
            .ok_or_else(|| InternalError::SegmentWithoutContent(attribute.name().to_string()))?;
        match resolve_source_value(&entry.properties, mapping, cache)?.text() {
            Some(text) => writer.attribute(
                attribute.namespace_prefix(),
                attribute.name(),
                attribute.attribute_namespace_uri(),
                &text,
            )?,
            None => trace!(attribute = attribute.name(), "omitting null attribute"),
        }
    }

    if segment.has_content() {
        let mapping = segment
            .mapping()
            .ok_or_else(|| InternalError::SegmentWithoutContent(segment.name().to_string()))?;
        match resolve_source_value(&entry.properties, mapping, cache)?.text() {
            Some(text) if text.is_empty() => {}
            Some(text) => writer.text(&text)?,
            None => writer.attribute(Some(ODATA_METADATA_PREFIX), NULL, ODATA_METADATA_NAMESPACE, "true")?,
        }
        return Ok(());
    }

    for child in segment.element_children() {
        write_segment(writer, child, entry, cache)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingDescriptor;
    use crate::value::{Property, PropertyValue};
    use crate::xml::XmlBuffer;

    const NS: &str = "urn:custom";

    fn mappings() -> EntityMappings {
        EntityMappings::build(
            "NS.Place",
            vec![
                MappingDescriptor::custom("City", NS, Some("c"), "location/city"),
                MappingDescriptor::custom("Zip", NS, Some("c"), "location/@zip"),
                MappingDescriptor::custom("Note", NS, Some("c"), "note"),
            ],
        )
        .unwrap()
    }

    fn render(entry: &Entry) -> String {
        let mappings = mappings();
        let mut buffer = XmlBuffer::new();
        EpmCustomWriter::new(&mappings)
            .write(&mut buffer, entry, &mut ValueCache::new())
            .unwrap();
        assert!(buffer.is_balanced());
        buffer.to_xml_string()
    }

    #[test]
    fn writes_nested_elements_and_attributes() {
        let entry = Entry::new(
            "NS.Place",
            vec![
                Property::new("City", "Oslo"),
                Property::new("Zip", PropertyValue::from(150)),
                Property::new("Note", "a & b"),
            ],
        );
        assert_eq!(
            render(&entry),
            "<c:location xmlns:c=\"urn:custom\" c:zip=\"150\"><c:city>Oslo</c:city></c:location>\
             <c:note xmlns:c=\"urn:custom\">a &amp; b</c:note>"
        );
    }

    #[test]
    fn null_elements_are_marked_and_null_attributes_omitted() {
        let entry = Entry::new("NS.Place", vec![Property::null("City"), Property::null("Zip")]);
        assert_eq!(
            render(&entry),
            "<c:location xmlns:c=\"urn:custom\"><c:city m:null=\"true\"/></c:location>\
             <c:note xmlns:c=\"urn:custom\" m:null=\"true\"/>"
        );
    }

    #[test]
    fn unprefixed_targets_use_a_default_namespace() {
        let mappings = EntityMappings::build(
            "NS.Product",
            vec![
                MappingDescriptor::custom("Code", "urn:shop", None, "code"),
                MappingDescriptor::custom("Level", "urn:shop", None, "info/@level"),
            ],
        )
        .unwrap();
        let entry = Entry::new(
            "NS.Product",
            vec![Property::new("Code", "X7"), Property::new("Level", PropertyValue::from(3))],
        );
        let mut buffer = XmlBuffer::new();
        EpmCustomWriter::new(&mappings)
            .write(&mut buffer, &entry, &mut ValueCache::new())
            .unwrap();

        assert_eq!(
            buffer.to_xml_string(),
            "<code xmlns=\"urn:shop\">X7</code><info xmlns=\"urn:shop\" level=\"3\"/>"
        );
    }
}

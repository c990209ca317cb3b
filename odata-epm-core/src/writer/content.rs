use tracing::{debug, instrument};

use crate::atom::{
    COLLECTION_ELEMENT, NULL, ODATA_DATA_NAMESPACE, ODATA_DATA_PREFIX, ODATA_METADATA_NAMESPACE,
    ODATA_METADATA_PREFIX, PROPERTIES, TYPE,
};
use crate::behavior::WriterBehavior;
use crate::cache::EnumerateValues;
use crate::error::Result;
use crate::projection::ProjectedProperties;
use crate::registry::MappingRegistry;
use crate::tree::{EntityMappings, SourcePathSegment};
use crate::value::{Entry, Primitive, PrimitiveKind, Property, PropertyValue};
use crate::writer::ContentPlacement;
use crate::xml::XmlWriter;

/// Writes an entry's structured content (`<m:properties>`).
///
/// Complex and collection contents are read through `values`: the cache the
/// EPM pass filled, or live enumeration when no EPM pass ran.
pub struct ContentWriter<'a, V: EnumerateValues + ?Sized> {
    placement: ContentPlacement<'a>,
    values: &'a V,
}

impl<'a, V: EnumerateValues + ?Sized> ContentWriter<'a, V> {
    pub fn new(registry: &'a MappingRegistry, behavior: WriterBehavior, values: &'a V) -> Self {
        Self {
            placement: ContentPlacement::new(registry, behavior),
            values,
        }
    }

    #[instrument(skip_all, fields(entity_type = %entry.type_name))]
    pub fn write<W: XmlWriter + ?Sized>(
        &self,
        writer: &mut W,
        entry: &Entry,
        mappings: Option<&EntityMappings>,
        projection: &ProjectedProperties,
    ) -> Result<()> {
        writer.start_element(Some(ODATA_METADATA_PREFIX), PROPERTIES, ODATA_METADATA_NAMESPACE)?;
        let root = mappings.map(|m| m.source_tree().root());
        self.write_properties(writer, &entry.type_name, &entry.properties, root, projection)?;
        writer.end_element()?;
        Ok(())
    }

    fn write_properties<W: XmlWriter + ?Sized>(
        &self,
        writer: &mut W,
        owning_type: &str,
        properties: &[Property],
        parent: Option<&SourcePathSegment>,
        projection: &ProjectedProperties,
    ) -> Result<()> {
        for property in properties {
            let segment = parent.and_then(|p| p.child(&property.name));
            let decision = self
                .placement
                .decide(owning_type, projection, &property.name, &property.value, segment);
            if !decision.write_in_content {
                debug!(property = %property.name, "property not written in content");
                continue;
            }
            self.write_property(writer, property, segment, decision.child_projection)?;
        }
        Ok(())
    }

    fn write_property<W: XmlWriter + ?Sized>(
        &self,
        writer: &mut W,
        property: &Property,
        segment: Option<&SourcePathSegment>,
        child_projection: &ProjectedProperties,
    ) -> Result<()> {
        writer.start_element(Some(ODATA_DATA_PREFIX), &property.name, ODATA_DATA_NAMESPACE)?;
        self.write_value(writer, &property.value, segment, child_projection)?;
        writer.end_element()?;
        Ok(())
    }

    fn write_value<W: XmlWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: &PropertyValue,
        segment: Option<&SourcePathSegment>,
        projection: &ProjectedProperties,
    ) -> Result<()> {
        match value {
            PropertyValue::Null => {
                writer.attribute(Some(ODATA_METADATA_PREFIX), NULL, ODATA_METADATA_NAMESPACE, "true")?;
            }
            PropertyValue::Primitive(primitive) => write_primitive(writer, primitive)?,
            PropertyValue::Complex(complex) => {
                if !complex.type_name().is_empty() {
                    write_type(writer, complex.type_name())?;
                }
                let properties = self.values.complex_properties(complex);
                self.write_properties(writer, complex.type_name(), &properties, segment, projection)?;
            }
            PropertyValue::Collection(collection) => {
                if let Some(type_name) = collection.type_name() {
                    write_type(writer, type_name)?;
                }
                for item in self.values.collection_items(collection).iter() {
                    writer.start_element(Some(ODATA_DATA_PREFIX), COLLECTION_ELEMENT, ODATA_DATA_NAMESPACE)?;
                    self.write_value(writer, item, None, &ProjectedProperties::All)?;
                    writer.end_element()?;
                }
            }
        }
        Ok(())
    }
}

fn write_type<W: XmlWriter + ?Sized>(writer: &mut W, type_name: &str) -> Result<()> {
    writer.attribute(Some(ODATA_METADATA_PREFIX), TYPE, ODATA_METADATA_NAMESPACE, type_name)?;
    Ok(())
}

fn write_primitive<W: XmlWriter + ?Sized>(writer: &mut W, primitive: &Primitive) -> Result<()> {
    let kind = primitive.kind();
    if kind != PrimitiveKind::String {
        write_type(writer, kind.edm_name())?;
    }
    let text = primitive.to_epm_string();
    if !text.is_empty() {
        writer.text(&text)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{LiveValues, ValueCache};
    use crate::cache::tests::OneShot;
    use crate::mapping::{MappingDescriptor, SyndicationItem};
    use crate::value::ComplexValue;
    use crate::writer::resolve_source_value;
    use crate::xml::XmlBuffer;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    fn mappings() -> EntityMappings {
        EntityMappings::build(
            "NS.Customer",
            vec![
                MappingDescriptor::syndication("Name", SyndicationItem::Title).with_keep_in_content(false),
                MappingDescriptor::syndication("Address/City", SyndicationItem::AuthorName)
                    .with_keep_in_content(false),
            ],
        )
        .unwrap()
    }

    fn render(entry: &Entry, projection: &ProjectedProperties) -> String {
        let registry = MappingRegistry::new();
        let mappings = mappings();
        let mut buffer = XmlBuffer::new();
        ContentWriter::new(&registry, WriterBehavior::default(), &LiveValues)
            .write(&mut buffer, entry, Some(&mappings), projection)
            .unwrap();
        assert!(buffer.is_balanced());
        buffer.to_xml_string()
    }

    #[test]
    fn mapped_properties_leave_content() {
        let entry = Entry::new(
            "NS.Customer",
            vec![
                Property::new("Name", "Widget"),
                Property::new("Age", 3),
                Property::new(
                    "Address",
                    PropertyValue::complex(
                        "NS.Address",
                        vec![Property::new("City", "Oslo"), Property::new("Zip", "0150")],
                    ),
                ),
            ],
        );
        assert_eq!(
            render(&entry, &ProjectedProperties::All),
            "<m:properties><d:Age m:type=\"Edm.Int32\">3</d:Age>\
             <d:Address m:type=\"NS.Address\"><d:Zip>0150</d:Zip></d:Address></m:properties>"
        );
    }

    #[test]
    fn null_mapped_properties_stay_in_content() {
        let entry = Entry::new("NS.Customer", vec![Property::null("Name"), Property::null("Address")]);
        assert_eq!(
            render(&entry, &ProjectedProperties::select(["Age"])),
            "<m:properties><d:Name m:null=\"true\"/><d:Address m:null=\"true\"/></m:properties>"
        );
    }

    #[test]
    fn projection_limits_unmapped_properties() {
        let entry = Entry::new(
            "NS.Customer",
            vec![
                Property::new("Age", 3),
                Property::new("Email", ""),
                Property::new(
                    "Tags",
                    PropertyValue::collection(
                        Some("Collection(Edm.String)".into()),
                        vec![PropertyValue::from("a"), PropertyValue::Null],
                    ),
                ),
            ],
        );
        assert_eq!(
            render(&entry, &ProjectedProperties::select(["Email", "Tags"])),
            "<m:properties><d:Email/><d:Tags m:type=\"Collection(Edm.String)\">\
             <d:element>a</d:element><d:element m:null=\"true\"/></d:Tags></m:properties>"
        );
    }

    #[test]
    fn content_reuses_values_enumerated_by_the_mapping_pass() {
        let source = OneShot::new(vec![Property::new("City", "Oslo"), Property::new("Zip", "0150")]);
        let calls = Arc::clone(&source.calls);
        let address = Arc::new(ComplexValue::from_source("NS.Address", source));
        let entry = Entry::new("NS.Customer", vec![Property::new("Address", PropertyValue::Complex(address))]);
        let mappings = mappings();
        let city = find_mapping(&mappings, "Address/City");

        let mut cache = ValueCache::new();
        resolve_source_value(&entry.properties, &city, &mut cache).unwrap();

        let registry = MappingRegistry::new();
        let mut buffer = XmlBuffer::new();
        ContentWriter::new(&registry, WriterBehavior::default(), &cache)
            .write(&mut buffer, &entry, Some(&mappings), &ProjectedProperties::All)
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(buffer.to_xml_string().contains("<d:Zip>0150</d:Zip>"));
    }

    fn find_mapping(mappings: &EntityMappings, path: &str) -> MappingDescriptor {
        mappings
            .descriptors()
            .iter()
            .find(|d| d.source_path_string() == path)
            .map(|d| d.as_ref().clone())
            .unwrap()
    }
}

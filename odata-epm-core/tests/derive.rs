//! `#[derive(ComplexType)]` on entity and complex types.

use odata_epm_core::xml::XmlBuffer;
use odata_epm_core::{
    ComplexType, EntryWriter, MappingRegistry, MappingTarget, ProjectedProperties, PropertyValue, SyndicationItem,
    TextContentKind, ToPropertyValue, WriterBehavior,
};

#[derive(ComplexType)]
#[odata(type_name = "NS.Address")]
struct Address {
    #[odata(rename = "City")]
    #[epm(target = "SyndicationAuthorName")]
    city: String,
    #[odata(rename = "Zip")]
    zip: Option<String>,
}

#[derive(ComplexType)]
#[odata(type_name = "NS.Customer")]
struct Customer {
    #[odata(rename = "Name")]
    #[epm(target = "SyndicationTitle", keep_in_content = false, content_kind = "html")]
    name: String,
    #[odata(rename = "Level")]
    #[epm(target = "info/@level", namespace_uri = "urn:crm", namespace_prefix = "c")]
    level: i32,
    #[odata(rename = "Address", complex)]
    address: Option<Address>,
    #[odata(rename = "Tags")]
    tags: Vec<String>,
    #[odata(skip)]
    #[allow(dead_code)]
    cache_key: u64,
}

fn customer() -> Customer {
    Customer {
        name: "Ann".to_string(),
        level: 3,
        address: Some(Address {
            city: "Oslo".to_string(),
            zip: None,
        }),
        tags: vec!["vip".to_string()],
        cache_key: 42,
    }
}

#[test]
fn derived_properties_follow_fields() {
    let entry = customer().to_entry();
    assert_eq!(entry.type_name, "NS.Customer");

    let names: Vec<_> = entry.properties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Name", "Level", "Address", "Tags"]);

    let address = entry.property("Address").unwrap().value.as_complex().unwrap();
    assert_eq!(address.type_name(), "NS.Address");
    assert_eq!(Address::edm_type_name().as_deref(), Some("NS.Address"));

    let PropertyValue::Collection(tags) = &entry.property("Tags").unwrap().value else {
        panic!("expected a collection");
    };
    assert_eq!(tags.type_name(), Some("Collection(Edm.String)"));
}

#[test]
fn derived_mappings_include_nested_types() {
    let mappings = Customer::epm_mappings();
    assert_eq!(mappings.len(), 3);

    assert_eq!(mappings[0].syndication_item(), Some(SyndicationItem::Title));
    assert!(!mappings[0].keep_in_content());
    assert_eq!(mappings[0].content_kind(), TextContentKind::Html);

    let MappingTarget::Custom(target) = mappings[1].target() else {
        panic!("expected a custom target");
    };
    assert_eq!(target.namespace_uri, "urn:crm");
    assert_eq!(target.namespace_prefix.as_deref(), Some("c"));
    assert_eq!(target.path, "info/@level");
    assert!(mappings[1].keep_in_content());

    assert_eq!(mappings[2].source_path_string(), "Address/City");
    assert_eq!(mappings[2].syndication_item(), Some(SyndicationItem::AuthorName));
}

#[test]
fn derived_types_write_through_the_registry() {
    let mut registry = MappingRegistry::new();
    registry.register_type::<Customer>().unwrap();

    let mut buffer = XmlBuffer::new();
    EntryWriter::new(&registry, WriterBehavior::default())
        .write_entry(&mut buffer, &customer().to_entry(), None, &ProjectedProperties::All)
        .unwrap();

    let xml = buffer.to_xml_string();
    assert!(xml.contains("<title type=\"html\">Ann</title>"));
    assert!(xml.contains("<author><name>Oslo</name></author>"));
    assert!(xml.contains("<c:info xmlns:c=\"urn:crm\" c:level=\"3\"/>"));
    assert!(!xml.contains("<d:Name"));
    assert!(xml.contains("<d:Level m:type=\"Edm.Int32\">3</d:Level>"));
}

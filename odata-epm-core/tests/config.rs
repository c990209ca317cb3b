//! Loading mappings from a TOML file and writing with them.

use std::io::Write;

use odata_epm_core::xml::XmlBuffer;
use odata_epm_core::{Entry, EntryWriter, EpmConfig, EpmError, FormatBehavior, ProjectedProperties, Property};

const CONFIG: &str = r#"
[writer]
format = "WcfDataServicesServer"

[[types]]
name = "NS.Article"
properties = [
    { name = "Headline", type = "Edm.String" },
    { name = "Changed", type = "Edm.DateTimeOffset" },
]
mappings = [
    { source_path = "Headline", target = "SyndicationTitle", keep_in_content = false },
    { source_path = "Changed", target = "SyndicationUpdated", keep_in_content = false },
]
"#;

#[test]
fn loads_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();

    let config = EpmConfig::load(file.path()).unwrap();
    assert_eq!(config.writer.format, FormatBehavior::WcfDataServicesServer);

    let (_schema, registry) = config.build().unwrap();
    let entry = Entry::new(
        "NS.Article",
        vec![
            Property::new("Headline", "Launch"),
            Property::new("Changed", "2011-03-04T05:06:07Z"),
        ],
    );
    let mut buffer = XmlBuffer::new();
    EntryWriter::new(&registry, config.writer)
        .write_entry(&mut buffer, &entry, None, &ProjectedProperties::All)
        .unwrap();

    let xml = buffer.to_xml_string();
    assert!(xml.contains("<title>Launch</title><updated>2011-03-04T05:06:07+00:00</updated>"));
    assert!(xml.contains("<m:properties/>"));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = EpmConfig::load(dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, EpmError::Io(_)));
}

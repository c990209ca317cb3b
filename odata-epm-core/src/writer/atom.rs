use chrono::{DateTime, FixedOffset};

use crate::atom::*;
use crate::behavior::WriterBehavior;
use crate::error::{EpmError, Result};
use crate::mapping::{PersonKind, SyndicationItem, TextContentKind};
use crate::value::format_timestamp;
use crate::xml::XmlWriter;

/// Writes ATOM entry metadata as elements of the (default) ATOM namespace.
pub struct AtomMetadataWriter {
    behavior: WriterBehavior,
}

impl AtomMetadataWriter {
    pub fn new(behavior: WriterBehavior) -> Self {
        Self { behavior }
    }

    pub fn write<W: XmlWriter + ?Sized>(&self, writer: &mut W, metadata: &AtomEntryMetadata) -> Result<()> {
        write_text_construct(writer, TITLE, metadata.title.as_ref())?;
        write_text_construct(writer, SUMMARY, metadata.summary.as_ref())?;
        write_text_construct(writer, RIGHTS, metadata.rights.as_ref())?;
        self.write_timestamp(
            writer,
            PUBLISHED,
            metadata.published.as_ref(),
            metadata.published_string.as_deref(),
        )?;
        self.write_timestamp(
            writer,
            UPDATED,
            metadata.updated.as_ref(),
            metadata.updated_string.as_deref(),
        )?;

        // ATOM requires an author; an empty one stands in when none is known.
        match metadata.authors.as_deref() {
            Some(authors) if !authors.is_empty() => {
                for author in authors {
                    write_person(writer, PersonKind::Author, author)?;
                }
            }
            _ => write_person(writer, PersonKind::Author, &AtomPerson::default())?,
        }
        for contributor in metadata.contributors.iter().flatten() {
            write_person(writer, PersonKind::Contributor, contributor)?;
        }
        for category in metadata.categories.iter().flatten() {
            write_category(writer, category)?;
        }
        for link in metadata.links.iter().flatten() {
            write_link(writer, link)?;
        }
        if let Some(source) = &metadata.source {
            self.write_source(writer, source)?;
        }
        Ok(())
    }

    fn write_timestamp<W: XmlWriter + ?Sized>(
        &self,
        writer: &mut W,
        element: &str,
        parsed: Option<&DateTime<FixedOffset>>,
        literal: Option<&str>,
    ) -> Result<()> {
        let text = match (literal, parsed) {
            (Some(literal), _) if self.behavior.uses_string_timestamps() => literal.to_string(),
            (_, Some(parsed)) => format_timestamp(parsed),
            _ => return Ok(()),
        };
        writer.element_with_text(None, element, ATOM_NAMESPACE, &text)?;
        Ok(())
    }

    fn write_source<W: XmlWriter + ?Sized>(&self, writer: &mut W, source: &AtomSourceMetadata) -> Result<()> {
        writer.start_element(None, SOURCE, ATOM_NAMESPACE)?;
        if let Some(id) = &source.id {
            writer.element_with_text(None, ID, ATOM_NAMESPACE, id)?;
        }
        write_text_construct(writer, TITLE, source.title.as_ref())?;
        self.write_timestamp(writer, UPDATED, source.updated.as_ref(), None)?;
        writer.end_element()?;
        Ok(())
    }
}

fn write_text_construct<W: XmlWriter + ?Sized>(
    writer: &mut W,
    element: &str,
    construct: Option<&AtomTextConstruct>,
) -> Result<()> {
    let Some(construct) = construct else {
        return Ok(());
    };
    writer.start_element(None, element, ATOM_NAMESPACE)?;
    if construct.kind != TextContentKind::Plaintext {
        writer.attribute(None, TYPE, "", construct.kind.type_attribute())?;
    }
    if let Some(text) = construct.text.as_deref().filter(|t| !t.is_empty()) {
        writer.text(text)?;
    }
    writer.end_element()?;
    Ok(())
}

fn write_person<W: XmlWriter + ?Sized>(writer: &mut W, kind: PersonKind, person: &AtomPerson) -> Result<()> {
    let (email_item, uri_item) = match kind {
        PersonKind::Author => (SyndicationItem::AuthorEmail, SyndicationItem::AuthorUri),
        PersonKind::Contributor => (SyndicationItem::ContributorEmail, SyndicationItem::ContributorUri),
    };
    writer.start_element(None, kind.element_name(), ATOM_NAMESPACE)?;
    writer.element_with_text(None, NAME, ATOM_NAMESPACE, person.name.as_deref().unwrap_or_default())?;
    for (element, item, value) in [(URI, uri_item, &person.uri), (EMAIL, email_item, &person.email)] {
        match value.as_deref() {
            Some("") => return Err(EpmError::InvalidEmptyValue { target: item }),
            Some(value) => writer.element_with_text(None, element, ATOM_NAMESPACE, value)?,
            None => {}
        }
    }
    writer.end_element()?;
    Ok(())
}

fn write_category<W: XmlWriter + ?Sized>(writer: &mut W, category: &AtomCategory) -> Result<()> {
    writer.start_element(None, CATEGORY, ATOM_NAMESPACE)?;
    for (name, value) in [(TERM, &category.term), (SCHEME, &category.scheme), (LABEL, &category.label)] {
        if let Some(value) = value {
            writer.attribute(None, name, "", value)?;
        }
    }
    writer.end_element()?;
    Ok(())
}

fn write_link<W: XmlWriter + ?Sized>(writer: &mut W, link: &AtomLink) -> Result<()> {
    writer.start_element(None, LINK, ATOM_NAMESPACE)?;
    let attributes = [
        (REL, &link.relation),
        (TYPE, &link.media_type),
        (TITLE, &link.title),
        (HREF, &link.href),
    ];
    for (name, value) in attributes {
        if let Some(value) = value {
            writer.attribute(None, name, "", value)?;
        }
    }
    writer.end_element()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::FormatBehavior;
    use crate::xml::XmlBuffer;

    fn render(behavior: WriterBehavior, metadata: &AtomEntryMetadata) -> Result<String> {
        let mut buffer = XmlBuffer::new();
        AtomMetadataWriter::new(behavior).write(&mut buffer, metadata)?;
        Ok(buffer.to_xml_string())
    }

    #[test]
    fn empty_metadata_still_has_an_author() {
        assert_eq!(
            render(WriterBehavior::default(), &AtomEntryMetadata::new()).unwrap(),
            "<author><name/></author>"
        );
    }

    #[test]
    fn writes_constructs_in_order() {
        let mut metadata = AtomEntryMetadata::new();
        metadata.title = Some(AtomTextConstruct::plain("Widget"));
        metadata.summary = Some(AtomTextConstruct::new(TextContentKind::Html, "<b>new</b>"));
        metadata.updated = Some(DateTime::parse_from_rfc3339("2011-03-04T05:06:07+01:00").unwrap());
        metadata.authors = Some(vec![AtomPerson {
            name: Some("Ann".into()),
            email: Some("ann@example.com".into()),
            uri: None,
        }]);
        metadata.categories = Some(vec![AtomCategory::with_term("tools")]);
        metadata.links = Some(vec![AtomLink {
            href: Some("Widgets(1)".into()),
            relation: Some("edit".into()),
            media_type: None,
            title: None,
        }]);

        assert_eq!(
            render(WriterBehavior::default(), &metadata).unwrap(),
            "<title>Widget</title><summary type=\"html\">&lt;b&gt;new&lt;/b&gt;</summary>\
             <updated>2011-03-04T05:06:07+01:00</updated>\
             <author><name>Ann</name><email>ann@example.com</email></author>\
             <category term=\"tools\"/><link rel=\"edit\" href=\"Widgets(1)\"/>"
        );
    }

    #[test]
    fn string_timestamps_echo_for_clients() {
        let mut metadata = AtomEntryMetadata::new();
        metadata.updated = Some(DateTime::parse_from_rfc3339("2011-03-04T05:06:07Z").unwrap());
        metadata.updated_string = Some("2011-03-04T05:06:07Z".into());

        let server = render(WriterBehavior::default(), &metadata).unwrap();
        assert!(server.starts_with("<updated>2011-03-04T05:06:07+00:00</updated>"));

        let client = render(WriterBehavior::new(FormatBehavior::WcfDataServicesClient), &metadata).unwrap();
        assert!(client.starts_with("<updated>2011-03-04T05:06:07Z</updated>"));
    }

    #[test]
    fn empty_email_is_rejected() {
        let mut metadata = AtomEntryMetadata::new();
        metadata.contributors = Some(vec![AtomPerson {
            name: Some("Bob".into()),
            email: Some(String::new()),
            uri: None,
        }]);
        let err = render(WriterBehavior::default(), &metadata).unwrap_err();
        assert!(matches!(
            err,
            EpmError::InvalidEmptyValue {
                target: SyndicationItem::ContributorEmail
            }
        ));
    }
}

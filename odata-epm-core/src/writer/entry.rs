use tracing::{debug, instrument};

use crate::atom::*;
use crate::behavior::WriterBehavior;
use crate::cache::{LiveValues, ValueCache};
use crate::error::Result;
use crate::merge::merge;
use crate::projection::ProjectedProperties;
use crate::registry::MappingRegistry;
use crate::value::Entry;
use crate::writer::{AtomMetadataWriter, ContentWriter, EpmCustomWriter, EpmSyndicationWriter};
use crate::xml::{AsyncXmlSink, XmlBuffer, XmlWriter};

/// Writes a single `atom:entry`.
///
/// The EPM pass runs first and fills a per-entry [`ValueCache`]; content is
/// then written from the same cache so every complex or collection value is
/// enumerated at most once.
pub struct EntryWriter<'a> {
    registry: &'a MappingRegistry,
    behavior: WriterBehavior,
}

impl<'a> EntryWriter<'a> {
    pub fn new(registry: &'a MappingRegistry, behavior: WriterBehavior) -> Self {
        Self { registry, behavior }
    }

    /// Writes `entry` with `custom` metadata merged into the metadata its
    /// mappings produce. Output already emitted stays in `writer` when an
    /// error is returned.
    #[instrument(skip_all, fields(entity_type = %entry.type_name))]
    pub fn write_entry<W: XmlWriter + ?Sized>(
        &self,
        writer: &mut W,
        entry: &Entry,
        custom: Option<&AtomEntryMetadata>,
        projection: &ProjectedProperties,
    ) -> Result<()> {
        let mappings = self.registry.mappings(&entry.type_name).map(|m| m.as_ref());
        let mut cache = ValueCache::new();

        let epm = match mappings {
            Some(mappings) => Some(EpmSyndicationWriter::new(mappings, self.behavior).write(entry, &mut cache)?),
            None => None,
        };
        let metadata = merge(custom, epm, &self.behavior)?.unwrap_or_default();

        writer.start_element(None, ENTRY, ATOM_NAMESPACE)?;
        writer.default_namespace_declaration(ATOM_NAMESPACE)?;
        writer.namespace_declaration(ODATA_DATA_PREFIX, ODATA_DATA_NAMESPACE)?;
        writer.namespace_declaration(ODATA_METADATA_PREFIX, ODATA_METADATA_NAMESPACE)?;

        writer.start_element(None, CATEGORY, ATOM_NAMESPACE)?;
        writer.attribute(None, TERM, "", &entry.type_name)?;
        writer.attribute(None, SCHEME, "", ODATA_SCHEME_NAMESPACE)?;
        writer.end_element()?;

        AtomMetadataWriter::new(self.behavior).write(writer, &metadata)?;

        if let Some(mappings) = mappings {
            EpmCustomWriter::new(mappings).write(writer, entry, &mut cache)?;
        }

        writer.start_element(None, CONTENT, ATOM_NAMESPACE)?;
        writer.attribute(None, TYPE, "", "application/xml")?;
        match mappings {
            Some(mappings) => {
                ContentWriter::new(self.registry, self.behavior, &cache).write(writer, entry, Some(mappings), projection)?
            }
            // No mapping pass ran, so nothing was cached.
            None => ContentWriter::new(self.registry, self.behavior, &LiveValues).write(writer, entry, None, projection)?,
        }
        writer.end_element()?;

        writer.end_element()?;
        debug!(cached_values = cache.len(), "wrote entry");
        Ok(())
    }

    /// Runs the synchronous write into a buffer, then hands the finished
    /// tokens to `sink`.
    pub async fn write_entry_async<S: AsyncXmlSink>(
        &self,
        sink: &mut S,
        entry: &Entry,
        custom: Option<&AtomEntryMetadata>,
        projection: &ProjectedProperties,
    ) -> Result<()> {
        let mut buffer = XmlBuffer::new();
        self.write_entry(&mut buffer, entry, custom, projection)?;
        buffer.flush_async(sink).await?;
        Ok(())
    }
}

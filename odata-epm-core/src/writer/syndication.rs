use chrono::{DateTime, FixedOffset};
use tracing::{instrument, trace};

use crate::atom::{AtomCategory, AtomEntryMetadata, AtomPerson, AtomTextConstruct};
use crate::behavior::WriterBehavior;
use crate::cache::ValueCache;
use crate::error::{EpmError, InternalError, Result};
use crate::mapping::{MappingDescriptor, PersonKind, SyndicationItem};
use crate::tree::{EntityMappings, TargetPathSegment};
use crate::value::{Entry, Primitive, format_timestamp, parse_timestamp};
use crate::writer::{SourceValue, resolve_source_value};

/// Builds the ATOM metadata implied by an entry's syndication mappings.
pub struct EpmSyndicationWriter<'a> {
    mappings: &'a EntityMappings,
    behavior: WriterBehavior,
}

impl<'a> EpmSyndicationWriter<'a> {
    pub fn new(mappings: &'a EntityMappings, behavior: WriterBehavior) -> Self {
        Self { mappings, behavior }
    }

    /// Resolves every syndication mapping of the entry's type against
    /// `entry` and collects the results into a fresh metadata container.
    ///
    /// Complex values along the source paths are enumerated through `cache`,
    /// so the content writer later sees the same materialized properties.
    #[instrument(skip_all, fields(entity_type = %self.mappings.type_name()))]
    pub fn write(&self, entry: &Entry, cache: &mut ValueCache) -> Result<AtomEntryMetadata> {
        let mut metadata = AtomEntryMetadata::new();
        for segment in self.mappings.target_tree().syndication_root().children() {
            if segment.has_content() {
                self.write_leaf(segment, entry, cache, &mut metadata)?;
            } else {
                self.write_parent(segment, entry, cache, &mut metadata)?;
            }
        }
        Ok(metadata)
    }

    fn write_leaf(
        &self,
        segment: &TargetPathSegment,
        entry: &Entry,
        cache: &mut ValueCache,
        metadata: &mut AtomEntryMetadata,
    ) -> Result<()> {
        let (mapping, item) = leaf_mapping(segment)?;
        let value = resolve_source_value(&entry.properties, mapping, cache)?;
        match item {
            SyndicationItem::Title => metadata.title = text_construct(mapping, &value),
            SyndicationItem::Summary => metadata.summary = text_construct(mapping, &value),
            SyndicationItem::Rights => metadata.rights = text_construct(mapping, &value),
            SyndicationItem::Updated => {
                let (parsed, literal) = self.timestamp(&value)?;
                metadata.updated = parsed;
                metadata.updated_string = literal;
            }
            SyndicationItem::Published => {
                let (parsed, literal) = self.timestamp(&value)?;
                metadata.published = parsed;
                metadata.published_string = literal;
            }
            SyndicationItem::Category => {
                if let Some(term) = value.text() {
                    metadata.categories = Some(vec![AtomCategory::with_term(term)]);
                }
            }
            SyndicationItem::AuthorName
            | SyndicationItem::AuthorEmail
            | SyndicationItem::AuthorUri
            | SyndicationItem::ContributorName
            | SyndicationItem::ContributorEmail
            | SyndicationItem::ContributorUri => {
                return Err(InternalError::UnexpectedSyndicationItem(item).into());
            }
        }
        Ok(())
    }

    /// Parsed timestamp plus, for behaviors echoing raw strings, its literal
    /// text.
    fn timestamp(&self, value: &SourceValue) -> Result<(Option<DateTime<FixedOffset>>, Option<String>)> {
        let echo = self.behavior.uses_string_timestamps();
        match value {
            SourceValue::Missing | SourceValue::Null => Ok((None, None)),
            SourceValue::Primitive(Primitive::DateTimeOffset(ts)) => {
                Ok((Some(*ts), echo.then(|| format_timestamp(ts))))
            }
            SourceValue::Primitive(other) => {
                let text = other.to_epm_string();
                match parse_timestamp(&text) {
                    Some(ts) => Ok((Some(ts), echo.then_some(text))),
                    // Echoing behaviors pass unparsable text through untouched.
                    None if echo => Ok((None, Some(text))),
                    None => Err(EpmError::InvalidTimestamp { value: text }),
                }
            }
        }
    }

    fn write_parent(
        &self,
        segment: &TargetPathSegment,
        entry: &Entry,
        cache: &mut ValueCache,
        metadata: &mut AtomEntryMetadata,
    ) -> Result<()> {
        let kind = PersonKind::from_element_name(segment.name())
            .ok_or_else(|| InternalError::UnknownSyndicationParent(segment.name().to_string()))?;

        let mut person = AtomPerson::default();
        for child in segment.children() {
            let (mapping, item) = leaf_mapping(child)?;
            if item.parent() != Some(kind) {
                return Err(InternalError::UnexpectedSyndicationItem(item).into());
            }
            let Some(text) = resolve_source_value(&entry.properties, mapping, cache)?.text() else {
                continue;
            };
            if text.is_empty() && item.forbids_empty() {
                trace!(item = item.target_name(), "omitting empty mapped value");
                continue;
            }
            match item {
                SyndicationItem::AuthorName | SyndicationItem::ContributorName => person.name = Some(text),
                SyndicationItem::AuthorEmail | SyndicationItem::ContributorEmail => person.email = Some(text),
                SyndicationItem::AuthorUri | SyndicationItem::ContributorUri => person.uri = Some(text),
                SyndicationItem::Title
                | SyndicationItem::Summary
                | SyndicationItem::Rights
                | SyndicationItem::Updated
                | SyndicationItem::Published
                | SyndicationItem::Category => {
                    return Err(InternalError::UnexpectedSyndicationItem(item).into());
                }
            }
        }

        if person.is_empty() {
            trace!(parent = segment.name(), "no mapped values for person");
            return Ok(());
        }
        match kind {
            PersonKind::Author => metadata.authors = Some(vec![person]),
            PersonKind::Contributor => metadata.contributors = Some(vec![person]),
        }
        Ok(())
    }
}

fn leaf_mapping(segment: &TargetPathSegment) -> Result<(&MappingDescriptor, SyndicationItem)> {
    let mapping = segment
        .mapping()
        .ok_or_else(|| InternalError::SegmentWithoutContent(segment.name().to_string()))?;
    let item = mapping
        .syndication_item()
        .ok_or_else(|| InternalError::MissingSyndicationMapping(segment.name().to_string()))?;
    Ok((mapping.as_ref(), item))
}

fn text_construct(mapping: &MappingDescriptor, value: &SourceValue) -> Option<AtomTextConstruct> {
    value
        .text()
        .map(|text| AtomTextConstruct::new(mapping.content_kind(), text))
}

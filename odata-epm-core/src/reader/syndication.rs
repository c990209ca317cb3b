use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tracing::{instrument, trace};

use crate::atom::{AtomEntryMetadata, AtomPerson, AtomTextConstruct};
use crate::behavior::ReaderBehavior;
use crate::error::{InternalError, Result};
use crate::mapping::{MappingDescriptor, PersonKind, SyndicationItem};
use crate::reader::EpmValueStore;
use crate::tree::{EntityMappings, TargetPathSegment};
use crate::value::format_timestamp;

/// Collects mapped values from already parsed ATOM entry metadata.
pub struct EpmSyndicationReader<'a> {
    mappings: &'a EntityMappings,
    behavior: ReaderBehavior,
}

impl<'a> EpmSyndicationReader<'a> {
    pub fn new(mappings: &'a EntityMappings, behavior: ReaderBehavior) -> Self {
        Self { mappings, behavior }
    }

    /// Walks the syndication target tree against `metadata`, storing a value
    /// for every mapped leaf that has one. Absent metadata is never an error.
    #[instrument(skip_all, fields(entity_type = %self.mappings.type_name()))]
    pub fn read(&self, metadata: &AtomEntryMetadata, store: &mut EpmValueStore) -> Result<()> {
        for segment in self.mappings.target_tree().syndication_root().children() {
            if segment.has_content() {
                self.read_leaf(segment, metadata, store)?;
            } else {
                self.read_parent(segment, metadata, store)?;
            }
        }
        Ok(())
    }

    fn read_leaf(
        &self,
        segment: &TargetPathSegment,
        metadata: &AtomEntryMetadata,
        store: &mut EpmValueStore,
    ) -> Result<()> {
        let (mapping, item) = leaf_mapping(segment)?;
        let value = match item {
            SyndicationItem::Updated => {
                self.timestamp_value(metadata.updated_string.as_deref(), metadata.updated.as_ref())
            }
            SyndicationItem::Published => {
                self.timestamp_value(metadata.published_string.as_deref(), metadata.published.as_ref())
            }
            SyndicationItem::Title => text_value(metadata.title.as_ref()),
            SyndicationItem::Summary => text_value(metadata.summary.as_ref()),
            SyndicationItem::Rights => text_value(metadata.rights.as_ref()),
            SyndicationItem::Category => metadata
                .categories
                .as_ref()
                .and_then(|categories| categories.first())
                .and_then(|category| category.term.clone()),
            SyndicationItem::AuthorName
            | SyndicationItem::AuthorEmail
            | SyndicationItem::AuthorUri
            | SyndicationItem::ContributorName
            | SyndicationItem::ContributorEmail
            | SyndicationItem::ContributorUri => {
                return Err(InternalError::UnexpectedSyndicationItem(item).into());
            }
        };
        if let Some(value) = value {
            store.try_store(mapping, Some(value));
        }
        Ok(())
    }

    fn timestamp_value(
        &self,
        literal: Option<&str>,
        parsed: Option<&DateTime<FixedOffset>>,
    ) -> Option<String> {
        if self.behavior.uses_string_timestamps() {
            if let Some(literal) = literal {
                return Some(literal.to_string());
            }
        }
        parsed.map(format_timestamp)
    }

    fn read_parent(
        &self,
        segment: &TargetPathSegment,
        metadata: &AtomEntryMetadata,
        store: &mut EpmValueStore,
    ) -> Result<()> {
        let kind = PersonKind::from_element_name(segment.name())
            .ok_or_else(|| InternalError::UnknownSyndicationParent(segment.name().to_string()))?;

        // Only the first person is mapped; the rest are ignored.
        let Some(person) = metadata.persons(kind).and_then(|persons| persons.first()) else {
            trace!(parent = segment.name(), "no person to read mapped values from");
            return Ok(());
        };

        for child in segment.children() {
            let (mapping, item) = leaf_mapping(child)?;
            if item.parent() != Some(kind) {
                return Err(InternalError::UnexpectedSyndicationItem(item).into());
            }
            if let Some(value) = person_value(person, item) {
                store.try_store(mapping, Some(value.to_string()));
            }
        }
        Ok(())
    }
}

fn leaf_mapping(segment: &TargetPathSegment) -> Result<(&Arc<MappingDescriptor>, SyndicationItem)> {
    let mapping = segment
        .mapping()
        .ok_or_else(|| InternalError::SegmentWithoutContent(segment.name().to_string()))?;
    let item = mapping
        .syndication_item()
        .ok_or_else(|| InternalError::MissingSyndicationMapping(segment.name().to_string()))?;
    Ok((mapping, item))
}

fn text_value(construct: Option<&AtomTextConstruct>) -> Option<String> {
    construct.and_then(|c| c.text.clone())
}

fn person_value(person: &AtomPerson, item: SyndicationItem) -> Option<&str> {
    match item {
        SyndicationItem::AuthorName | SyndicationItem::ContributorName => person.name.as_deref(),
        SyndicationItem::AuthorEmail | SyndicationItem::ContributorEmail => person.email.as_deref(),
        SyndicationItem::AuthorUri | SyndicationItem::ContributorUri => person.uri.as_deref(),
        SyndicationItem::Title
        | SyndicationItem::Summary
        | SyndicationItem::Rights
        | SyndicationItem::Updated
        | SyndicationItem::Published
        | SyndicationItem::Category => None,
    }
}

use tracing::trace;

use crate::behavior::WriterBehavior;
use crate::projection::ProjectedProperties;
use crate::registry::MappingRegistry;
use crate::tree::SourcePathSegment;
use crate::value::{Primitive, PropertyValue};

/// Outcome of a content placement decision for one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementDecision<'p> {
    /// Whether the property is written in the entry's content.
    pub write_in_content: bool,
    /// Projection to apply to the property's sub-properties.
    pub child_projection: &'p ProjectedProperties,
}

static EMPTY_PROJECTED: ProjectedProperties = ProjectedProperties::EmptyProjected;

/// Decides whether mapped properties are also written in content.
#[derive(Debug, Clone, Copy)]
pub struct ContentPlacement<'a> {
    registry: &'a MappingRegistry,
    behavior: WriterBehavior,
}

impl<'a> ContentPlacement<'a> {
    pub fn new(registry: &'a MappingRegistry, behavior: WriterBehavior) -> Self {
        Self { registry, behavior }
    }

    /// Whether `property_name` of `owning_type` is written in content.
    ///
    /// `segment` is the source path segment of the property, if the property
    /// is mapped or has mapped descendants.
    pub fn should_write_in_content(
        &self,
        owning_type: &str,
        projection: &ProjectedProperties,
        property_name: &str,
        value: &PropertyValue,
        segment: Option<&SourcePathSegment>,
    ) -> bool {
        self.decide(owning_type, projection, property_name, value, segment)
            .write_in_content
    }

    /// Like [`Self::should_write_in_content`], also returning the projection
    /// for the property's children. The rules are checked in order; the
    /// first match decides.
    pub fn decide<'p>(
        &self,
        owning_type: &str,
        projection: &'p ProjectedProperties,
        property_name: &str,
        value: &PropertyValue,
        segment: Option<&SourcePathSegment>,
    ) -> PlacementDecision<'p> {
        let selected = projection.is_selected(property_name);
        let by_projection = PlacementDecision {
            write_in_content: selected,
            child_projection: projection.child(property_name),
        };

        if self.behavior.use_v1_provider_behavior
            && self.registry.keeps_in_content(owning_type, property_name)
        {
            return by_projection;
        }

        if value.is_null() && segment.is_some_and(SourcePathSegment::has_mapping_in_subtree) {
            trace!(property = property_name, "null mapped property forced into content");
            return PlacementDecision {
                write_in_content: true,
                child_projection: &EMPTY_PROJECTED,
            };
        }

        let Some(mapping) = segment.and_then(SourcePathSegment::mapping) else {
            return by_projection;
        };

        let is_empty_string = matches!(value, PropertyValue::Primitive(Primitive::String(s)) if s.is_empty());
        if is_empty_string && mapping.syndication_item().is_some_and(|item| item.forbids_empty()) {
            trace!(property = property_name, "empty value cannot be mapped, forced into content");
            return PlacementDecision {
                write_in_content: true,
                ..by_projection
            };
        }

        PlacementDecision {
            write_in_content: mapping.keep_in_content() && selected,
            ..by_projection
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{MappingDescriptor, SyndicationItem};
    use crate::schema::{InMemorySchema, PropertyType, StructuredType};
    use crate::tree::EntityMappings;
    use indexmap::IndexMap;

    fn mappings() -> EntityMappings {
        EntityMappings::build(
            "NS.Customer",
            vec![
                MappingDescriptor::syndication("Name", SyndicationItem::Title).with_keep_in_content(false),
                MappingDescriptor::syndication("Email", SyndicationItem::AuthorEmail).with_keep_in_content(false),
                MappingDescriptor::syndication("Motto", SyndicationItem::Summary).with_keep_in_content(false),
                MappingDescriptor::syndication("Kept", SyndicationItem::Rights),
                MappingDescriptor::syndication("Address/City", SyndicationItem::AuthorName)
                    .with_keep_in_content(false),
            ],
        )
        .unwrap()
    }

    fn decide(
        placement: &ContentPlacement,
        projection: &ProjectedProperties,
        mappings: &EntityMappings,
        name: &str,
        value: PropertyValue,
    ) -> bool {
        placement.should_write_in_content(
            "NS.Customer",
            projection,
            name,
            &value,
            mappings.source_tree().segment(name),
        )
    }

    #[test]
    fn null_forces_content() {
        let registry = MappingRegistry::new();
        let placement = ContentPlacement::new(&registry, WriterBehavior::default());
        let mappings = mappings();
        let nothing = ProjectedProperties::select([]);

        assert!(decide(&placement, &nothing, &mappings, "Name", PropertyValue::Null));
        assert!(decide(&placement, &ProjectedProperties::All, &mappings, "Name", PropertyValue::Null));
        // Mapping only below the property still counts.
        assert!(decide(&placement, &nothing, &mappings, "Address", PropertyValue::Null));

        let decision = placement.decide(
            "NS.Customer",
            &nothing,
            "Address",
            &PropertyValue::Null,
            mappings.source_tree().segment("Address"),
        );
        assert_eq!(decision.child_projection, &ProjectedProperties::EmptyProjected);
    }

    #[test]
    fn empty_string_escape_hatch_only_for_email_and_uri() {
        let registry = MappingRegistry::new();
        let placement = ContentPlacement::new(&registry, WriterBehavior::default());
        let mappings = mappings();
        let nothing = ProjectedProperties::select([]);

        assert!(decide(&placement, &nothing, &mappings, "Email", PropertyValue::from("")));
        assert!(!decide(&placement, &nothing, &mappings, "Motto", PropertyValue::from("")));
        assert!(!decide(&placement, &ProjectedProperties::All, &mappings, "Email", PropertyValue::from("a@b")));
    }

    #[test]
    fn unmapped_properties_follow_projection() {
        let registry = MappingRegistry::new();
        let placement = ContentPlacement::new(&registry, WriterBehavior::default());
        let mappings = mappings();
        let projection = ProjectedProperties::select(["Age"]);

        assert!(decide(&placement, &projection, &mappings, "Age", PropertyValue::from(3)));
        assert!(!decide(&placement, &projection, &mappings, "Other", PropertyValue::from(3)));
    }

    #[test]
    fn keep_in_content_requires_selection() {
        let registry = MappingRegistry::new();
        let placement = ContentPlacement::new(&registry, WriterBehavior::default());
        let mappings = mappings();

        assert!(decide(&placement, &ProjectedProperties::All, &mappings, "Kept", PropertyValue::from("x")));
        assert!(!decide(&placement, &ProjectedProperties::select(["Name"]), &mappings, "Kept", PropertyValue::from("x")));
        assert!(!decide(&placement, &ProjectedProperties::All, &mappings, "Name", PropertyValue::from("x")));
    }

    #[test]
    fn legacy_keep_in_content_cache_applies_projection_only() {
        let schema = InMemorySchema::new()
            .with_type(StructuredType::complex("NS.Address").with_property("City", PropertyType::parse("Edm.String"), true))
            .with_type(
                StructuredType::entity("NS.Customer")
                    .with_property("Address", PropertyType::parse("NS.Address"), true),
            );
        let mut declarations = IndexMap::new();
        declarations.insert(
            "NS.Customer".to_string(),
            vec![MappingDescriptor::syndication("Address/City", SyndicationItem::AuthorName)],
        );
        let registry = MappingRegistry::build(&schema, declarations).unwrap();
        let mappings = registry.mappings("NS.Customer").unwrap();
        let city = mappings.source_tree().segment("Address").unwrap().child("City");
        // A complex value owned by another entity, mapped there with KeepInContent=false.
        let other = mappings_for_other_owner();
        let other_city = other.source_tree().segment("Address").unwrap().child("City");

        let legacy = ContentPlacement::new(&registry, WriterBehavior::default().with_v1_provider_behavior(true));
        let modern = ContentPlacement::new(&registry, WriterBehavior::default());
        let value = PropertyValue::from("Oslo");

        assert!(legacy.should_write_in_content("NS.Address", &ProjectedProperties::All, "City", &value, other_city));
        assert!(!modern.should_write_in_content("NS.Address", &ProjectedProperties::All, "City", &value, other_city));
        assert!(modern.should_write_in_content("NS.Address", &ProjectedProperties::All, "City", &value, city));
    }

    fn mappings_for_other_owner() -> EntityMappings {
        EntityMappings::build(
            "NS.Supplier",
            vec![MappingDescriptor::syndication("Address/City", SyndicationItem::AuthorName).with_keep_in_content(false)],
        )
        .unwrap()
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{EpmError, Result};
use crate::mapping::MappingDescriptor;
use crate::schema::{EdmSchema, PropertyType, TypeKind};
use crate::tree::EntityMappings;

/// Per-type mapping trees, built once at schema load and shared read-only.
///
/// Also holds the legacy "keep primitive in content" cache: for each complex
/// type reached by a mapped source path whose mapping keeps its value in
/// content, the names of those primitive properties.
#[derive(Debug, Default, Clone)]
pub struct MappingRegistry {
    entity_types: HashMap<String, Arc<EntityMappings>>,
    keep_in_content: HashMap<String, HashSet<String>>,
}

impl MappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry from per-type mapping declarations.
    ///
    /// Entity types known to the schema inherit the declarations of their
    /// base types (base first). Declared source paths are validated against
    /// the schema where the schema knows the type.
    pub fn build<S: EdmSchema + ?Sized>(
        schema: &S,
        declarations: IndexMap<String, Vec<MappingDescriptor>>,
    ) -> Result<Self> {
        let mut candidates: Vec<String> = declarations.keys().cloned().collect();
        for ty in schema.structured_types() {
            if ty.kind == TypeKind::Entity && !declarations.contains_key(&ty.name) {
                candidates.push(ty.name.clone());
            }
        }

        let mut registry = MappingRegistry::new();
        for type_name in candidates {
            let descriptors = inherited_declarations(schema, &declarations, &type_name)?;
            if descriptors.is_empty() {
                continue;
            }
            for descriptor in &descriptors {
                registry.index_descriptor(schema, &type_name, descriptor)?;
            }
            registry.register(type_name, descriptors)?;
        }
        Ok(registry)
    }

    /// Registers mappings for a type without consulting a schema.
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        descriptors: Vec<MappingDescriptor>,
    ) -> Result<Arc<EntityMappings>> {
        let type_name = type_name.into();
        let mappings = Arc::new(EntityMappings::build(type_name.clone(), descriptors)?);
        debug!(
            entity_type = %type_name,
            mappings = mappings.descriptors().len(),
            "registered entity property mappings"
        );
        self.entity_types.insert(type_name, Arc::clone(&mappings));
        Ok(mappings)
    }

    pub fn mappings(&self, type_name: &str) -> Option<&Arc<EntityMappings>> {
        self.entity_types.get(type_name)
    }

    /// Whether `property` of `complex_type` is in the legacy keep-in-content cache.
    pub fn keeps_in_content(&self, complex_type: &str, property: &str) -> bool {
        self.keep_in_content
            .get(complex_type)
            .is_some_and(|names| names.contains(property))
    }

    pub fn len(&self) -> usize {
        self.entity_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_types.is_empty()
    }

    /// Validates the source path of `descriptor` against the schema and
    /// records keep-in-content primitives of complex types.
    fn index_descriptor<S: EdmSchema + ?Sized>(
        &mut self,
        schema: &S,
        entity_type: &str,
        descriptor: &MappingDescriptor,
    ) -> Result<()> {
        if schema.structured_type(entity_type).is_none() {
            return Ok(());
        }
        let path = descriptor.source_path();
        let mut owning_type = entity_type.to_string();
        for (i, name) in path.iter().enumerate() {
            let Some(property) = schema.property(&owning_type, name) else {
                return Err(EpmError::invalid_mapping(
                    descriptor.source_path_string(),
                    format!("`{owning_type}` has no property `{name}`"),
                ));
            };
            let is_leaf = i + 1 == path.len();
            match (&property.ty, is_leaf) {
                (PropertyType::Primitive(_), true) => {
                    let owner_is_complex = schema
                        .structured_type(&owning_type)
                        .is_some_and(|t| t.kind == TypeKind::Complex);
                    if owner_is_complex && descriptor.keep_in_content() {
                        self.keep_in_content
                            .entry(owning_type.clone())
                            .or_default()
                            .insert(name.clone());
                    }
                }
                (PropertyType::Complex(complex), false) => owning_type = complex.clone(),
                (PropertyType::Collection(_), _) => {
                    return Err(EpmError::invalid_mapping(
                        descriptor.source_path_string(),
                        format!("collection property `{name}` cannot be mapped"),
                    ));
                }
                (PropertyType::Primitive(_), false) => {
                    return Err(EpmError::invalid_mapping(
                        descriptor.source_path_string(),
                        format!("primitive property `{name}` has no sub-properties"),
                    ));
                }
                (PropertyType::Complex(_), true) => {
                    return Err(EpmError::invalid_mapping(
                        descriptor.source_path_string(),
                        format!("complex property `{name}` cannot be mapped directly"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Declarations of `type_name` and its base types, base first.
fn inherited_declarations<S: EdmSchema + ?Sized>(
    schema: &S,
    declarations: &IndexMap<String, Vec<MappingDescriptor>>,
    type_name: &str,
) -> Result<Vec<MappingDescriptor>> {
    let mut chain: Vec<String> = Vec::new();
    let mut current = Some(type_name.to_string());
    while let Some(name) = current {
        if chain.contains(&name) {
            return Err(EpmError::invalid_mapping(name, "type inheritance is cyclic"));
        }
        current = schema.structured_type(&name).and_then(|t| t.base_type.clone());
        chain.push(name);
    }
    Ok(chain
        .iter()
        .rev()
        .filter_map(|name| declarations.get(name))
        .flatten()
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::SyndicationItem;
    use crate::schema::{InMemorySchema, StructuredType};
    use crate::value::PrimitiveKind;

    fn string() -> PropertyType {
        PropertyType::Primitive(PrimitiveKind::String)
    }

    fn schema() -> InMemorySchema {
        InMemorySchema::new()
            .with_type(
                StructuredType::complex("NS.Address")
                    .with_property("City", string(), true)
                    .with_property("Street", string(), true),
            )
            .with_type(
                StructuredType::entity("NS.Product")
                    .with_property("Name", string(), true)
                    .with_property("Address", PropertyType::parse("NS.Address"), true)
                    .with_property("Tags", PropertyType::parse("Collection(Edm.String)"), true),
            )
            .with_type(StructuredType::entity("NS.SpecialProduct").with_base_type("NS.Product"))
            .with_type(StructuredType::entity("NS.Unmapped").with_property("X", string(), true))
    }

    fn declarations(items: Vec<(&str, Vec<MappingDescriptor>)>) -> IndexMap<String, Vec<MappingDescriptor>> {
        items
            .into_iter()
            .map(|(name, descriptors)| (name.to_string(), descriptors))
            .collect()
    }

    #[test]
    fn derived_types_inherit_mappings() {
        let registry = MappingRegistry::build(
            &schema(),
            declarations(vec![(
                "NS.Product",
                vec![MappingDescriptor::syndication("Name", SyndicationItem::Title)],
            )]),
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        let derived = registry.mappings("NS.SpecialProduct").unwrap();
        assert_eq!(derived.descriptors().len(), 1);
        assert!(registry.mappings("NS.Unmapped").is_none());
    }

    #[test]
    fn keep_in_content_cache_tracks_complex_primitives() {
        let registry = MappingRegistry::build(
            &schema(),
            declarations(vec![(
                "NS.Product",
                vec![
                    MappingDescriptor::syndication("Address/City", SyndicationItem::AuthorName),
                    MappingDescriptor::syndication("Address/Street", SyndicationItem::AuthorUri)
                        .with_keep_in_content(false),
                    MappingDescriptor::syndication("Name", SyndicationItem::Title),
                ],
            )]),
        )
        .unwrap();

        assert!(registry.keeps_in_content("NS.Address", "City"));
        assert!(!registry.keeps_in_content("NS.Address", "Street"));
        assert!(!registry.keeps_in_content("NS.Product", "Name"));
    }

    #[test]
    fn rejects_unknown_and_non_primitive_paths() {
        for path in ["Missing", "Address", "Tags", "Name/Sub"] {
            let result = MappingRegistry::build(
                &schema(),
                declarations(vec![(
                    "NS.Product",
                    vec![MappingDescriptor::syndication(path, SyndicationItem::Title)],
                )]),
            );
            assert!(result.is_err(), "{path} should be rejected");
        }
    }

    #[test]
    fn types_unknown_to_schema_register_unchecked() {
        let registry = MappingRegistry::build(
            &InMemorySchema::new(),
            declarations(vec![(
                "NS.Loose",
                vec![MappingDescriptor::syndication("Anything", SyndicationItem::Summary)],
            )]),
        )
        .unwrap();
        assert!(registry.mappings("NS.Loose").is_some());
    }

    #[test]
    fn cyclic_inheritance_fails() {
        let schema = InMemorySchema::new()
            .with_type(StructuredType::entity("NS.A").with_base_type("NS.B"))
            .with_type(StructuredType::entity("NS.B").with_base_type("NS.A"));
        let result = MappingRegistry::build(
            &schema,
            declarations(vec![(
                "NS.A",
                vec![MappingDescriptor::syndication("X", SyndicationItem::Title)],
            )]),
        );
        assert!(result.is_err());
    }
}

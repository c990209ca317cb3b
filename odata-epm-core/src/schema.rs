use indexmap::IndexMap;
use serde::Deserialize;

use crate::value::PrimitiveKind;

/// Declared type of a structural property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    Primitive(PrimitiveKind),
    Complex(String),
    /// Collection with the declared item type name.
    Collection(String),
}

impl PropertyType {
    /// Parses an EDM type reference such as `Edm.Int32`, `NS.Address` or
    /// `Collection(Edm.String)`.
    pub fn parse(type_name: &str) -> Self {
        if let Some(item) = type_name
            .strip_prefix("Collection(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return PropertyType::Collection(item.to_string());
        }
        match PrimitiveKind::from_edm_name(type_name) {
            Some(kind) => PropertyType::Primitive(kind),
            None => PropertyType::Complex(type_name.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDefinition {
    pub name: String,
    pub ty: PropertyType,
    pub nullable: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Entity,
    Complex,
}

/// An entity or complex type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredType {
    pub name: String,
    pub kind: TypeKind,
    pub base_type: Option<String>,
    properties: IndexMap<String, PropertyDefinition>,
}

impl StructuredType {
    pub fn entity(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Entity)
    }

    pub fn complex(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Complex)
    }

    fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        StructuredType {
            name: name.into(),
            kind,
            base_type: None,
            properties: IndexMap::new(),
        }
    }

    pub fn with_base_type(mut self, base_type: impl Into<String>) -> Self {
        self.base_type = Some(base_type.into());
        self
    }

    pub fn with_property(mut self, name: &str, ty: PropertyType, nullable: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            PropertyDefinition {
                name: name.to_string(),
                ty,
                nullable,
            },
        );
        self
    }

    pub fn declared_property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.get(name)
    }

    pub fn declared_properties(&self) -> impl Iterator<Item = &PropertyDefinition> {
        self.properties.values()
    }
}

/// Read-only view of the EDM model.
///
/// The mapping layer only needs type lookup, property lookup along the base
/// type chain, and complex-type checks.
pub trait EdmSchema {
    fn structured_type(&self, name: &str) -> Option<&StructuredType>;

    /// Every type the schema declares; used to find derived entity types.
    fn structured_types(&self) -> Vec<&StructuredType>;

    /// Finds a property declared on `type_name` or one of its base types.
    fn property(&self, type_name: &str, property_name: &str) -> Option<&PropertyDefinition> {
        let mut current = self.structured_type(type_name);
        while let Some(ty) = current {
            if let Some(property) = ty.declared_property(property_name) {
                return Some(property);
            }
            current = ty.base_type.as_deref().and_then(|b| self.structured_type(b));
        }
        None
    }

    fn is_complex_type(&self, name: &str) -> bool {
        self.structured_type(name)
            .is_some_and(|t| t.kind == TypeKind::Complex)
    }
}

/// An in-memory schema backed by an ordered map.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchema {
    types: IndexMap<String, StructuredType>,
}

impl InMemorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, ty: StructuredType) -> Self {
        self.add_type(ty);
        self
    }

    pub fn add_type(&mut self, ty: StructuredType) {
        self.types.insert(ty.name.clone(), ty);
    }

    pub fn types(&self) -> impl Iterator<Item = &StructuredType> {
        self.types.values()
    }
}

impl EdmSchema for InMemorySchema {
    fn structured_type(&self, name: &str) -> Option<&StructuredType> {
        self.types.get(name)
    }

    fn structured_types(&self) -> Vec<&StructuredType> {
        self.types.values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> InMemorySchema {
        InMemorySchema::new()
            .with_type(
                StructuredType::complex("NS.Address")
                    .with_property("City", PropertyType::Primitive(PrimitiveKind::String), true),
            )
            .with_type(
                StructuredType::entity("NS.Base")
                    .with_property("ID", PropertyType::Primitive(PrimitiveKind::Int32), false),
            )
            .with_type(
                StructuredType::entity("NS.Product")
                    .with_base_type("NS.Base")
                    .with_property("Address", PropertyType::parse("NS.Address"), true),
            )
    }

    #[test]
    fn parses_type_references() {
        assert_eq!(
            PropertyType::parse("Edm.Int64"),
            PropertyType::Primitive(PrimitiveKind::Int64)
        );
        assert_eq!(
            PropertyType::parse("Collection(Edm.String)"),
            PropertyType::Collection("Edm.String".to_string())
        );
        assert_eq!(
            PropertyType::parse("NS.Address"),
            PropertyType::Complex("NS.Address".to_string())
        );
    }

    #[test]
    fn property_lookup_follows_base_types() {
        let schema = schema();
        let id = schema.property("NS.Product", "ID").unwrap();
        assert!(!id.nullable);
        assert!(schema.property("NS.Product", "Missing").is_none());
        assert!(schema.property("NS.Unknown", "ID").is_none());
    }

    #[test]
    fn complex_type_check() {
        let schema = schema();
        assert!(schema.is_complex_type("NS.Address"));
        assert!(!schema.is_complex_type("NS.Product"));
        assert!(!schema.is_complex_type("NS.Unknown"));
    }
}

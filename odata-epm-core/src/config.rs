//! TOML configuration: reader/writer behavior plus the types and mapping
//! declarations a registry is built from.
//!
//! ```toml
//! [writer]
//! format = "WcfDataServicesServer"
//!
//! [[types]]
//! name = "NS.Product"
//! properties = [{ name = "Name", type = "Edm.String" }]
//! mappings = [{ source_path = "Name", target = "SyndicationTitle", keep_in_content = false }]
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::behavior::{ReaderBehavior, WriterBehavior};
use crate::error::{EpmError, Result};
use crate::mapping::{MappingDescriptor, MappingTarget, TextContentKind};
use crate::registry::MappingRegistry;
use crate::schema::{InMemorySchema, PropertyType, StructuredType, TypeKind};

#[derive(Debug, Deserialize, Default)]
pub struct EpmConfig {
    #[serde(default)]
    pub reader: ReaderBehavior,
    #[serde(default)]
    pub writer: WriterBehavior,
    #[serde(default)]
    pub types: Vec<TypeConfig>,
}

#[derive(Debug, Deserialize)]
pub struct TypeConfig {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    pub base_type: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertyConfig>,
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

#[derive(Debug, Deserialize)]
pub struct PropertyConfig {
    pub name: String,
    /// EDM type reference, e.g. `Edm.Int32` or `Collection(NS.Address)`.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
}

#[derive(Debug, Deserialize)]
pub struct MappingConfig {
    pub source_path: String,
    /// A `Syndication*` target name or a custom element path.
    pub target: String,
    pub namespace_uri: Option<String>,
    pub namespace_prefix: Option<String>,
    #[serde(default = "default_true")]
    pub keep_in_content: bool,
    #[serde(default)]
    pub content_kind: TextContentKind,
}

fn default_true() -> bool {
    true
}

impl MappingConfig {
    fn to_descriptor(&self) -> Result<MappingDescriptor> {
        let target = MappingTarget::parse(
            &self.target,
            self.namespace_uri.as_deref(),
            self.namespace_prefix.as_deref(),
        )?;
        Ok(MappingDescriptor::new(&self.source_path, target)
            .with_keep_in_content(self.keep_in_content)
            .with_content_kind(self.content_kind))
    }
}

impl EpmConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "loading EPM configuration");
        Self::from_toml_str(&content)
    }

    /// Builds the schema and mapping registry the configuration declares.
    ///
    /// Base types and complex property types must be declared in the same
    /// document; only entity types may carry mappings.
    pub fn build(&self) -> Result<(InMemorySchema, MappingRegistry)> {
        let mut schema = InMemorySchema::new();
        let mut declarations = IndexMap::new();

        for ty in &self.types {
            let mut structured = match ty.kind {
                TypeKind::Entity => StructuredType::entity(&ty.name),
                TypeKind::Complex => StructuredType::complex(&ty.name),
            };
            if let Some(base_type) = &ty.base_type {
                self.expect_declared(base_type)?;
                structured = structured.with_base_type(base_type);
            }
            for property in &ty.properties {
                let property_type = PropertyType::parse(&property.type_name);
                match &property_type {
                    PropertyType::Complex(name) => self.expect_declared(name)?,
                    PropertyType::Collection(item) => {
                        if let PropertyType::Complex(name) = PropertyType::parse(item) {
                            self.expect_declared(&name)?;
                        }
                    }
                    PropertyType::Primitive(_) => {}
                }
                structured = structured.with_property(&property.name, property_type, property.nullable);
            }
            schema.add_type(structured);

            if ty.mappings.is_empty() {
                continue;
            }
            if ty.kind == TypeKind::Complex {
                return Err(EpmError::invalid_mapping(
                    &ty.name,
                    "mappings must be declared on entity types",
                ));
            }
            let descriptors = ty
                .mappings
                .iter()
                .map(MappingConfig::to_descriptor)
                .collect::<Result<Vec<_>>>()?;
            declarations.insert(ty.name.clone(), descriptors);
        }

        let registry = MappingRegistry::build(&schema, declarations)?;
        Ok((schema, registry))
    }

    fn expect_declared(&self, name: &str) -> Result<()> {
        if self.types.iter().any(|t| t.name == name) {
            Ok(())
        } else {
            Err(EpmError::UnknownType(name.to_string()))
        }
    }
}

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::{EpmError, Result};
use crate::reader::EpmValueStore;
use crate::schema::{EdmSchema, PropertyType};
use crate::value::{ComplexValue, Entry, PrimitiveKind, Property, PropertyValue};

/// Applies values collected by a read pass to an entry's properties.
///
/// Properties already read from content always win over mapped values.
pub struct EntryPropertyBuilder<'a, S: EdmSchema + ?Sized> {
    schema: &'a S,
}

impl<'a, S: EdmSchema + ?Sized> EntryPropertyBuilder<'a, S> {
    pub fn new(schema: &'a S) -> Self {
        Self { schema }
    }

    #[instrument(skip_all, fields(entity_type = %entry.type_name))]
    pub fn apply(&self, entry: &mut Entry, store: &EpmValueStore) -> Result<()> {
        for (mapping, value) in store.iter() {
            let type_name = entry.type_name.clone();
            self.set_path(&type_name, &mut entry.properties, mapping.source_path(), value)?;
        }
        Ok(())
    }

    fn set_path(
        &self,
        owning_type: &str,
        properties: &mut Vec<Property>,
        path: &[String],
        value: Option<&str>,
    ) -> Result<()> {
        let Some((name, rest)) = path.split_first() else {
            return Ok(());
        };
        let definition = self.schema.property(owning_type, name);
        let existing = properties.iter().position(|p| &p.name == name);

        if rest.is_empty() {
            if existing.is_some() {
                debug!(property = %name, "property already read from content, keeping it");
                return Ok(());
            }
            let kind = match definition.map(|d| &d.ty) {
                Some(PropertyType::Primitive(kind)) => *kind,
                None => PrimitiveKind::String,
                Some(_) => {
                    return Err(EpmError::NonPrimitiveMappedValue {
                        path: name.clone(),
                    });
                }
            };
            let value = match value {
                None if definition.is_some_and(|d| !d.nullable) => {
                    return Err(EpmError::NullNotAllowed {
                        property: name.clone(),
                    });
                }
                None => PropertyValue::Null,
                Some(text) => kind
                    .parse(text)
                    .map(PropertyValue::Primitive)
                    .ok_or_else(|| EpmError::InvalidPrimitive {
                        property: name.clone(),
                        value: text.to_string(),
                        kind: kind.edm_name(),
                    })?,
            };
            properties.push(Property::new(name.clone(), value));
            return Ok(());
        }

        let complex_type = match definition.map(|d| &d.ty) {
            Some(PropertyType::Complex(type_name)) => type_name.clone(),
            None => String::new(),
            Some(_) => {
                return Err(EpmError::NonPrimitiveMappedValue {
                    path: name.clone(),
                });
            }
        };

        match existing {
            Some(index) => {
                let current = &properties[index].value;
                let PropertyValue::Complex(complex) = current else {
                    debug!(property = %name, "property already read from content, keeping it");
                    return Ok(());
                };
                let mut nested = complex.enumerate_properties();
                let nested_type = complex.type_name().to_string();
                self.set_path(&nested_type, &mut nested, rest, value)?;
                properties[index].value =
                    PropertyValue::Complex(Arc::new(ComplexValue::new(nested_type, nested)));
            }
            None => {
                let mut nested = Vec::new();
                self.set_path(&complex_type, &mut nested, rest, value)?;
                properties.push(Property::new(name.clone(), PropertyValue::complex(complex_type, nested)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{MappingDescriptor, SyndicationItem};
    use crate::schema::{InMemorySchema, StructuredType};
    use crate::value::Primitive;

    fn schema() -> InMemorySchema {
        InMemorySchema::new()
            .with_type(
                StructuredType::complex("NS.Address")
                    .with_property("City", PropertyType::parse("Edm.String"), true)
                    .with_property("Zip", PropertyType::parse("Edm.Int32"), true),
            )
            .with_type(
                StructuredType::entity("NS.Customer")
                    .with_property("Name", PropertyType::parse("Edm.String"), false)
                    .with_property("Age", PropertyType::parse("Edm.Int32"), true)
                    .with_property("Address", PropertyType::parse("NS.Address"), true),
            )
    }

    fn store(values: &[(&str, Option<&str>)]) -> EpmValueStore {
        let mut store = EpmValueStore::new();
        for (path, value) in values {
            let mapping = Arc::new(MappingDescriptor::syndication(path, SyndicationItem::Title));
            store.try_store(&mapping, value.map(str::to_string));
        }
        store
    }

    #[test]
    fn converts_by_declared_kind_and_builds_complex_values() {
        let schema = schema();
        let mut entry = Entry::new("NS.Customer", vec![]);
        EntryPropertyBuilder::new(&schema)
            .apply(
                &mut entry,
                &store(&[("Age", Some("42")), ("Address/City", Some("Oslo")), ("Address/Zip", Some("150"))]),
            )
            .unwrap();

        assert_eq!(
            entry.property("Age").unwrap().value,
            PropertyValue::Primitive(Primitive::Int32(42))
        );
        let address = entry.property("Address").unwrap().value.as_complex().unwrap().clone();
        assert_eq!(address.type_name(), "NS.Address");
        let properties = address.enumerate_properties();
        assert_eq!(properties.len(), 2);
        assert_eq!(properties[1].value, PropertyValue::Primitive(Primitive::Int32(150)));
    }

    #[test]
    fn content_values_are_not_overridden() {
        let schema = schema();
        let mut entry = Entry::new("NS.Customer", vec![Property::new("Name", "from content")]);
        EntryPropertyBuilder::new(&schema)
            .apply(&mut entry, &store(&[("Name", Some("from title"))]))
            .unwrap();
        assert_eq!(entry.properties.len(), 1);
        assert_eq!(entry.property("Name").unwrap().value, PropertyValue::from("from content"));
    }

    #[test]
    fn null_into_non_nullable_fails() {
        let schema = schema();
        let mut entry = Entry::new("NS.Customer", vec![]);
        let err = EntryPropertyBuilder::new(&schema)
            .apply(&mut entry, &store(&[("Name", None)]))
            .unwrap_err();
        assert!(matches!(err, EpmError::NullNotAllowed { .. }));

        let mut entry = Entry::new("NS.Customer", vec![]);
        EntryPropertyBuilder::new(&schema)
            .apply(&mut entry, &store(&[("Age", None)]))
            .unwrap();
        assert!(entry.property("Age").unwrap().value.is_null());
    }

    #[test]
    fn invalid_primitive_text_fails() {
        let schema = schema();
        let mut entry = Entry::new("NS.Customer", vec![]);
        let err = EntryPropertyBuilder::new(&schema)
            .apply(&mut entry, &store(&[("Age", Some("old"))]))
            .unwrap_err();
        assert!(matches!(err, EpmError::InvalidPrimitive { kind: "Edm.Int32", .. }));
    }
}

//! Conversions from Rust values into the OData value model.
//!
//! `#[derive(ComplexType)]` implements both traits for structs; the impls
//! below cover primitives, `Option` (null) and `Vec` (collections).

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use crate::error::Result;
use crate::mapping::MappingDescriptor;
use crate::registry::MappingRegistry;
use crate::tree::EntityMappings;
use crate::value::{Entry, Primitive, PrimitiveKind, Property, PropertyValue};

pub trait ToPropertyValue {
    fn to_property_value(&self) -> PropertyValue;

    /// EDM type name of values of this type, when it has a fixed one.
    fn edm_type_name() -> Option<String>
    where
        Self: Sized,
    {
        None
    }
}

/// A Rust type standing for an OData entity or complex type.
pub trait ComplexType: ToPropertyValue {
    fn type_name() -> &'static str
    where
        Self: Sized;

    fn to_properties(&self) -> Vec<Property>;

    /// Mapping declarations carried by the type's fields.
    fn epm_mappings() -> Vec<MappingDescriptor>
    where
        Self: Sized,
    {
        Vec::new()
    }

    fn to_entry(&self) -> Entry
    where
        Self: Sized,
    {
        Entry::new(Self::type_name(), self.to_properties())
    }
}

impl MappingRegistry {
    /// Registers the mappings declared on `T`.
    pub fn register_type<T: ComplexType>(&mut self) -> Result<Arc<EntityMappings>> {
        self.register(T::type_name(), T::epm_mappings())
    }
}

macro_rules! primitive_value {
    ($ty:ty, $kind:ident, |$v:ident| $convert:expr) => {
        impl ToPropertyValue for $ty {
            fn to_property_value(&self) -> PropertyValue {
                let $v = self;
                PropertyValue::Primitive(Primitive::$kind($convert))
            }

            fn edm_type_name() -> Option<String> {
                Some(PrimitiveKind::$kind.edm_name().to_string())
            }
        }
    };
}

primitive_value!(String, String, |v| v.clone());
primitive_value!(&str, String, |v| v.to_string());
primitive_value!(bool, Boolean, |v| *v);
primitive_value!(i32, Int32, |v| *v);
primitive_value!(i64, Int64, |v| *v);
primitive_value!(f64, Double, |v| *v);
primitive_value!(DateTime<FixedOffset>, DateTimeOffset, |v| *v);

impl<T: ToPropertyValue> ToPropertyValue for Option<T> {
    fn to_property_value(&self) -> PropertyValue {
        match self {
            Some(value) => value.to_property_value(),
            None => PropertyValue::Null,
        }
    }

    fn edm_type_name() -> Option<String> {
        T::edm_type_name()
    }
}

impl<T: ToPropertyValue> ToPropertyValue for Vec<T> {
    fn to_property_value(&self) -> PropertyValue {
        let items = self.iter().map(ToPropertyValue::to_property_value).collect();
        PropertyValue::collection(Self::edm_type_name(), items)
    }

    fn edm_type_name() -> Option<String> {
        T::edm_type_name().map(|item| format!("Collection({item})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::SyndicationItem;

    struct Address {
        city: Option<String>,
    }

    impl ToPropertyValue for Address {
        fn to_property_value(&self) -> PropertyValue {
            PropertyValue::complex(Self::type_name(), self.to_properties())
        }

        fn edm_type_name() -> Option<String> {
            Some(Self::type_name().to_string())
        }
    }

    impl ComplexType for Address {
        fn type_name() -> &'static str {
            "NS.Address"
        }

        fn to_properties(&self) -> Vec<Property> {
            vec![Property::new("City", self.city.to_property_value())]
        }

        fn epm_mappings() -> Vec<MappingDescriptor> {
            vec![MappingDescriptor::syndication("City", SyndicationItem::AuthorName)]
        }
    }

    #[test]
    fn options_are_null_and_vectors_are_collections() {
        assert_eq!(None::<i32>.to_property_value(), PropertyValue::Null);
        assert_eq!(Some(3).to_property_value(), PropertyValue::from(3));

        let PropertyValue::Collection(tags) = vec!["a", "b"].to_property_value() else {
            panic!("expected a collection");
        };
        assert_eq!(tags.type_name(), Some("Collection(Edm.String)"));
        assert_eq!(tags.enumerate_items(), vec![PropertyValue::from("a"), PropertyValue::from("b")]);

        let PropertyValue::Collection(addresses) = Vec::<Address>::new().to_property_value() else {
            panic!("expected a collection");
        };
        assert_eq!(addresses.type_name(), Some("Collection(NS.Address)"));
    }

    #[test]
    fn complex_types_convert_and_register() {
        let entry = Address { city: None }.to_entry();
        assert_eq!(entry.type_name, "NS.Address");
        assert!(entry.property("City").unwrap().value.is_null());

        let mut registry = MappingRegistry::new();
        let mappings = registry.register_type::<Address>().unwrap();
        assert_eq!(mappings.descriptors().len(), 1);
        assert!(registry.mappings("NS.Address").is_some());
    }
}

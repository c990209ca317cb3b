//! Write side: EPM-synthesized metadata, custom elements, content placement
//! and the entry writer tying them together.

mod atom;
mod content;
mod custom;
mod entry;
mod syndication;
mod utils;

pub use atom::AtomMetadataWriter;
pub use content::ContentWriter;
pub use custom::EpmCustomWriter;
pub use entry::EntryWriter;
pub use syndication::EpmSyndicationWriter;
pub use utils::{ContentPlacement, PlacementDecision};

use crate::cache::ValueCache;
use crate::error::{EpmError, Result};
use crate::mapping::MappingDescriptor;
use crate::value::{Primitive, Property, PropertyValue, find_property};

/// The value a mapping's source path resolves to on one entry.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SourceValue {
    /// A property along the path is not present.
    Missing,
    Null,
    Primitive(Primitive),
}

impl SourceValue {
    pub(crate) fn text(&self) -> Option<String> {
        match self {
            SourceValue::Primitive(p) => Some(p.to_epm_string()),
            SourceValue::Missing | SourceValue::Null => None,
        }
    }
}

/// Follows the source path of `mapping` through `properties`, enumerating
/// complex values through the cache.
pub(crate) fn resolve_source_value(
    properties: &[Property],
    mapping: &MappingDescriptor,
    cache: &mut ValueCache,
) -> Result<SourceValue> {
    resolve_path(properties, mapping.source_path(), mapping, cache)
}

fn resolve_path(
    properties: &[Property],
    path: &[String],
    mapping: &MappingDescriptor,
    cache: &mut ValueCache,
) -> Result<SourceValue> {
    let Some((name, rest)) = path.split_first() else {
        return Ok(SourceValue::Missing);
    };
    let Some(property) = find_property(properties, name) else {
        return Ok(SourceValue::Missing);
    };
    match (&property.value, rest.is_empty()) {
        (PropertyValue::Null, _) => Ok(SourceValue::Null),
        (PropertyValue::Primitive(p), true) => Ok(SourceValue::Primitive(p.clone())),
        (PropertyValue::Complex(complex), false) => {
            let nested = cache.get_or_cache_properties(complex);
            resolve_path(&nested, rest, mapping, cache)
        }
        (PropertyValue::Primitive(_), false)
        | (PropertyValue::Complex(_), true)
        | (PropertyValue::Collection(_), _) => Err(EpmError::NonPrimitiveMappedValue {
            path: mapping.source_path_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::OneShot;
    use crate::mapping::SyndicationItem;
    use crate::value::ComplexValue;
    use std::sync::Arc;

    #[test]
    fn resolves_nested_values_through_the_cache() {
        let source = OneShot::new(vec![Property::new("City", "Oslo")]);
        let calls = Arc::clone(&source.calls);
        let address = Arc::new(ComplexValue::from_source("NS.Address", source));
        let properties = vec![Property::new("Address", PropertyValue::Complex(Arc::clone(&address)))];
        let city = MappingDescriptor::syndication("Address/City", SyndicationItem::AuthorName);
        let zip = MappingDescriptor::syndication("Address/Zip", SyndicationItem::AuthorUri);

        let mut cache = ValueCache::new();
        assert_eq!(
            resolve_source_value(&properties, &city, &mut cache).unwrap(),
            SourceValue::Primitive(Primitive::String("Oslo".into()))
        );
        assert_eq!(
            resolve_source_value(&properties, &zip, &mut cache).unwrap(),
            SourceValue::Missing
        );
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn null_parent_resolves_to_null() {
        let properties = vec![Property::null("Address")];
        let city = MappingDescriptor::syndication("Address/City", SyndicationItem::AuthorName);
        assert_eq!(
            resolve_source_value(&properties, &city, &mut ValueCache::new()).unwrap(),
            SourceValue::Null
        );
    }

    #[test]
    fn non_primitive_leaf_fails() {
        let properties = vec![Property::new("Address", PropertyValue::complex("NS.Address", vec![]))];
        let mapping = MappingDescriptor::syndication("Address", SyndicationItem::Title);
        let err = resolve_source_value(&properties, &mapping, &mut ValueCache::new()).unwrap_err();
        assert!(matches!(err, EpmError::NonPrimitiveMappedValue { .. }));
    }
}

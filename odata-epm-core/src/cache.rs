use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::identity::ValueId;
use crate::value::{CollectionValue, ComplexValue, Property, PropertyValue};

/// Read access to the materialized contents of complex and collection values.
///
/// The content writer goes through this trait so it can run either on top of a
/// [`ValueCache`] filled by the EPM pass or, when no EPM pass ran, on
/// [`LiveValues`].
pub trait EnumerateValues {
    fn complex_properties(&self, value: &Arc<ComplexValue>) -> Arc<[Property]>;
    fn collection_items(&self, value: &Arc<CollectionValue>) -> Arc<[PropertyValue]>;
}

struct Cached<V, T> {
    // Keeps the allocation alive so its id cannot be reused.
    _owner: Arc<V>,
    materialized: Arc<[T]>,
}

/// Memoizes enumeration of complex and collection values by reference identity.
///
/// Each underlying enumerable is walked at most once through
/// `get_or_cache_*`, no matter how many mapping segments need its contents.
/// Scoped to a single entry.
#[derive(Default)]
pub struct ValueCache {
    properties: HashMap<ValueId, Cached<ComplexValue, Property>>,
    items: HashMap<ValueId, Cached<CollectionValue, PropertyValue>>,
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the properties of `value`, enumerating and caching them on first use.
    pub fn get_or_cache_properties(&mut self, value: &Arc<ComplexValue>) -> Arc<[Property]> {
        if let Some(cached) = self.properties.get(&ValueId::of(value)) {
            return Arc::clone(&cached.materialized);
        }
        let materialized: Arc<[Property]> = value.enumerate_properties().into();
        self.cache_properties(value, Arc::clone(&materialized));
        materialized
    }

    /// Returns the items of `value`, enumerating and caching them on first use.
    pub fn get_or_cache_items(&mut self, value: &Arc<CollectionValue>) -> Arc<[PropertyValue]> {
        if let Some(cached) = self.items.get(&ValueId::of(value)) {
            return Arc::clone(&cached.materialized);
        }
        let materialized: Arc<[PropertyValue]> = value.enumerate_items().into();
        self.cache_items(value, Arc::clone(&materialized));
        materialized
    }

    fn cache_properties(&mut self, value: &Arc<ComplexValue>, materialized: Arc<[Property]>) {
        let id = ValueId::of(value);
        debug_assert!(
            !self.properties.contains_key(&id),
            "complex value {id} cached twice"
        );
        trace!(%id, type_name = value.type_name(), "caching complex value properties");
        self.properties.insert(
            id,
            Cached {
                _owner: Arc::clone(value),
                materialized,
            },
        );
    }

    fn cache_items(&mut self, value: &Arc<CollectionValue>, materialized: Arc<[PropertyValue]>) {
        let id = ValueId::of(value);
        debug_assert!(!self.items.contains_key(&id), "collection value {id} cached twice");
        trace!(%id, "caching collection items");
        self.items.insert(
            id,
            Cached {
                _owner: Arc::clone(value),
                materialized,
            },
        );
    }

    /// Returns previously cached properties without enumerating.
    pub fn cached_properties(&self, value: &Arc<ComplexValue>) -> Option<Arc<[Property]>> {
        self.properties
            .get(&ValueId::of(value))
            .map(|c| Arc::clone(&c.materialized))
    }

    /// Returns previously cached items without enumerating.
    pub fn cached_items(&self, value: &Arc<CollectionValue>) -> Option<Arc<[PropertyValue]>> {
        self.items
            .get(&ValueId::of(value))
            .map(|c| Arc::clone(&c.materialized))
    }

    /// Number of cached values, complex and collection together.
    pub fn len(&self) -> usize {
        self.properties.len() + self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.items.is_empty()
    }
}

/// Cached lookups fall back to live enumeration for values the EPM pass never
/// reached; those are only seen by the content writer, once.
impl EnumerateValues for ValueCache {
    fn complex_properties(&self, value: &Arc<ComplexValue>) -> Arc<[Property]> {
        self.cached_properties(value)
            .unwrap_or_else(|| value.enumerate_properties().into())
    }

    fn collection_items(&self, value: &Arc<CollectionValue>) -> Arc<[PropertyValue]> {
        self.cached_items(value)
            .unwrap_or_else(|| value.enumerate_items().into())
    }
}

/// Stateless enumeration, used when writing content without an EPM pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveValues;

impl EnumerateValues for LiveValues {
    fn complex_properties(&self, value: &Arc<ComplexValue>) -> Arc<[Property]> {
        value.enumerate_properties().into()
    }

    fn collection_items(&self, value: &Arc<CollectionValue>) -> Arc<[PropertyValue]> {
        value.enumerate_items().into()
    }
}

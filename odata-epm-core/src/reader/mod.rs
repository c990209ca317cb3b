//! Read side: collecting mapped values from ATOM metadata and custom
//! elements, then applying them to the entry.

mod apply;
mod custom;
mod entry;
mod syndication;

use std::sync::Arc;

use indexmap::IndexMap;

pub use apply::EntryPropertyBuilder;
pub use custom::EpmCustomReader;
pub use entry::{EntryReader, ReadEntry};
pub use syndication::EpmSyndicationReader;

use crate::identity::ValueId;
use crate::mapping::MappingDescriptor;

#[derive(Debug, Clone)]
struct StoredValue {
    mapping: Arc<MappingDescriptor>,
    value: Option<String>,
}

/// Per-entry values discovered by a read pass, keyed by mapping.
///
/// The first value stored for a mapping wins; later ones are dropped. `None`
/// records an element that was explicitly null.
#[derive(Debug, Clone, Default)]
pub struct EpmValueStore {
    values: IndexMap<ValueId, StoredValue>,
}

impl EpmValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` for `mapping` unless a value is already present.
    /// Returns whether the value was stored.
    pub fn try_store(&mut self, mapping: &Arc<MappingDescriptor>, value: Option<String>) -> bool {
        let id = ValueId::of(mapping);
        if self.values.contains_key(&id) {
            return false;
        }
        self.values.insert(
            id,
            StoredValue {
                mapping: Arc::clone(mapping),
                value,
            },
        );
        true
    }

    pub fn contains(&self, mapping: &Arc<MappingDescriptor>) -> bool {
        self.values.contains_key(&ValueId::of(mapping))
    }

    /// `Some(None)` for a stored null, `None` when nothing was stored.
    pub fn get(&self, mapping: &Arc<MappingDescriptor>) -> Option<Option<&str>> {
        self.values
            .get(&ValueId::of(mapping))
            .map(|stored| stored.value.as_deref())
    }

    /// Stored values in the order they were discovered.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<MappingDescriptor>, Option<&str>)> {
        self.values
            .values()
            .map(|stored| (&stored.mapping, stored.value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::SyndicationItem;

    #[test]
    fn first_value_wins() {
        let mapping = Arc::new(MappingDescriptor::syndication("Name", SyndicationItem::Title));
        let mut store = EpmValueStore::new();

        assert!(store.try_store(&mapping, Some("first".into())));
        assert!(!store.try_store(&mapping, Some("second".into())));
        assert_eq!(store.get(&mapping), Some(Some("first")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn keyed_by_mapping_identity() {
        let a = Arc::new(MappingDescriptor::syndication("Name", SyndicationItem::Title));
        let b = Arc::new(MappingDescriptor::syndication("Name", SyndicationItem::Title));
        let mut store = EpmValueStore::new();

        store.try_store(&a, None);
        assert!(store.contains(&a));
        assert!(!store.contains(&b));
        assert_eq!(store.get(&a), Some(None));
        assert_eq!(store.get(&b), None);
    }
}

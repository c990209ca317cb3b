//! Source and target path trees, built once per entity type.

mod source;
mod target;

use std::sync::Arc;

pub use source::{SourcePathSegment, SourceTree};
pub use target::{TargetPathSegment, TargetTree};

use crate::error::Result;
use crate::mapping::MappingDescriptor;

/// Everything the mapping walks need to know about one entity type.
///
/// Immutable once built and shared behind `Arc` by every entry of the type.
#[derive(Debug, Clone)]
pub struct EntityMappings {
    type_name: String,
    descriptors: Vec<Arc<MappingDescriptor>>,
    source_tree: SourceTree,
    target_tree: TargetTree,
}

impl EntityMappings {
    pub fn build(type_name: impl Into<String>, descriptors: Vec<MappingDescriptor>) -> Result<Self> {
        let descriptors: Vec<Arc<MappingDescriptor>> = descriptors.into_iter().map(Arc::new).collect();
        let source_tree = SourceTree::build(&descriptors)?;
        let target_tree = TargetTree::build(&descriptors)?;
        Ok(EntityMappings {
            type_name: type_name.into(),
            descriptors,
            source_tree,
            target_tree,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn descriptors(&self) -> &[Arc<MappingDescriptor>] {
        &self.descriptors
    }

    pub fn source_tree(&self) -> &SourceTree {
        &self.source_tree
    }

    pub fn target_tree(&self) -> &TargetTree {
        &self.target_tree
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::SyndicationItem;

    #[test]
    fn trees_share_descriptors() {
        let mappings = EntityMappings::build(
            "NS.Product",
            vec![MappingDescriptor::syndication("Name", SyndicationItem::Title)],
        )
        .unwrap();

        let from_source = mappings.source_tree().segment("Name").unwrap().mapping().unwrap();
        let from_target = mappings.target_tree().syndication_root().children()[0]
            .mapping()
            .unwrap();
        assert!(Arc::ptr_eq(from_source, from_target));
        assert!(Arc::ptr_eq(from_source, &mappings.descriptors()[0]));
    }

    #[test]
    fn invalid_declarations_fail_build() {
        let result = EntityMappings::build(
            "NS.Product",
            vec![
                MappingDescriptor::syndication("Name", SyndicationItem::Title),
                MappingDescriptor::syndication("Other", SyndicationItem::Title),
            ],
        );
        assert!(result.is_err());
    }
}

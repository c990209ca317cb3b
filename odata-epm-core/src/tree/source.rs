use std::sync::Arc;

use crate::error::{EpmError, Result};
use crate::mapping::MappingDescriptor;

/// A node of the source-path tree, keyed by property name.
///
/// A segment exists for every mapped property and every property with mapped
/// descendants. The root has no property name.
#[derive(Debug, Clone, Default)]
pub struct SourcePathSegment {
    property_name: Option<String>,
    mapping: Option<Arc<MappingDescriptor>>,
    children: Vec<SourcePathSegment>,
}

impl SourcePathSegment {
    fn named(name: &str) -> Self {
        SourcePathSegment {
            property_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn property_name(&self) -> Option<&str> {
        self.property_name.as_deref()
    }

    pub fn mapping(&self) -> Option<&Arc<MappingDescriptor>> {
        self.mapping.as_ref()
    }

    pub fn children(&self) -> &[SourcePathSegment] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&SourcePathSegment> {
        self.children
            .iter()
            .find(|c| c.property_name.as_deref() == Some(name))
    }

    /// True if this segment or any descendant carries a mapping.
    pub fn has_mapping_in_subtree(&self) -> bool {
        self.mapping.is_some() || self.children.iter().any(Self::has_mapping_in_subtree)
    }

    /// All mappings in this subtree, depth first, in declaration order.
    pub fn collect_mappings(&self, out: &mut Vec<Arc<MappingDescriptor>>) {
        if let Some(mapping) = &self.mapping {
            out.push(Arc::clone(mapping));
        }
        for child in &self.children {
            child.collect_mappings(out);
        }
    }

    fn child_mut_or_insert(&mut self, name: &str) -> &mut SourcePathSegment {
        let index = match self
            .children
            .iter()
            .position(|c| c.property_name.as_deref() == Some(name))
        {
            Some(index) => index,
            None => {
                self.children.push(SourcePathSegment::named(name));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }
}

/// The source-path tree of one entity type.
#[derive(Debug, Clone, Default)]
pub struct SourceTree {
    root: SourcePathSegment,
}

impl SourceTree {
    pub fn build<'a>(descriptors: impl IntoIterator<Item = &'a Arc<MappingDescriptor>>) -> Result<Self> {
        let mut tree = SourceTree::default();
        for descriptor in descriptors {
            tree.add(descriptor)?;
        }
        Ok(tree)
    }

    fn add(&mut self, descriptor: &Arc<MappingDescriptor>) -> Result<()> {
        let path = descriptor.source_path();
        if path.iter().any(String::is_empty) {
            return Err(EpmError::invalid_mapping(
                descriptor.source_path_string(),
                "source path contains an empty segment",
            ));
        }

        let mut segment = &mut self.root;
        for name in path {
            if segment.mapping.is_some() {
                return Err(EpmError::invalid_mapping(
                    descriptor.source_path_string(),
                    format!("`{name}` is nested under a property that is itself mapped"),
                ));
            }
            segment = segment.child_mut_or_insert(name);
        }

        if segment.mapping.is_some() {
            return Err(EpmError::invalid_mapping(
                descriptor.source_path_string(),
                "the property is already mapped",
            ));
        }
        if !segment.children.is_empty() {
            return Err(EpmError::invalid_mapping(
                descriptor.source_path_string(),
                "a property with mapped sub-properties cannot be mapped itself",
            ));
        }
        segment.mapping = Some(Arc::clone(descriptor));
        Ok(())
    }

    pub fn root(&self) -> &SourcePathSegment {
        &self.root
    }

    /// The segment for a top-level property, if it is part of the tree.
    pub fn segment(&self, property_name: &str) -> Option<&SourcePathSegment> {
        self.root.child(property_name)
    }
}

use std::sync::Arc;

use crate::atom::ATOM_NAMESPACE;
use crate::error::{EpmError, Result};
use crate::mapping::{CustomTarget, MappingDescriptor, MappingTarget, SyndicationItem};

/// A node of the target-path tree, keyed by namespace, name and whether it is
/// an attribute.
///
/// Segments with content are leaves that hold one mapped value. Segments
/// without content (`author`, `contributor`, custom parent elements) only
/// group their children.
#[derive(Debug, Clone, Default)]
pub struct TargetPathSegment {
    name: String,
    namespace_uri: String,
    namespace_prefix: Option<String>,
    is_attribute: bool,
    mapping: Option<Arc<MappingDescriptor>>,
    children: Vec<TargetPathSegment>,
}

impl TargetPathSegment {
    fn root(namespace_uri: &str) -> Self {
        TargetPathSegment {
            namespace_uri: namespace_uri.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace_uri(&self) -> &str {
        &self.namespace_uri
    }

    pub fn namespace_prefix(&self) -> Option<&str> {
        self.namespace_prefix.as_deref()
    }

    pub fn is_attribute(&self) -> bool {
        self.is_attribute
    }

    /// Namespace an attribute segment is written in. Unprefixed attributes
    /// belong to no namespace.
    pub fn attribute_namespace_uri(&self) -> &str {
        match self.namespace_prefix {
            Some(_) => &self.namespace_uri,
            None => "",
        }
    }

    pub fn has_content(&self) -> bool {
        self.mapping.is_some()
    }

    pub fn mapping(&self) -> Option<&Arc<MappingDescriptor>> {
        self.mapping.as_ref()
    }

    pub fn children(&self) -> &[TargetPathSegment] {
        &self.children
    }

    pub fn element_children(&self) -> impl Iterator<Item = &TargetPathSegment> {
        self.children.iter().filter(|c| !c.is_attribute)
    }

    pub fn attribute_children(&self) -> impl Iterator<Item = &TargetPathSegment> {
        self.children.iter().filter(|c| c.is_attribute)
    }

    pub fn child(&self, namespace_uri: &str, name: &str, is_attribute: bool) -> Option<&TargetPathSegment> {
        self.children.iter().find(|c| {
            c.is_attribute == is_attribute && c.name == name && c.namespace_uri == namespace_uri
        })
    }

    /// The syndication item of a leaf; `None` for parents and custom leaves.
    pub fn syndication_item(&self) -> Option<SyndicationItem> {
        self.mapping.as_ref().and_then(|m| m.syndication_item())
    }

    fn child_mut_or_insert(
        &mut self,
        namespace_uri: &str,
        namespace_prefix: Option<&str>,
        name: &str,
        is_attribute: bool,
    ) -> &mut TargetPathSegment {
        let index = match self.children.iter().position(|c| {
            c.is_attribute == is_attribute && c.name == name && c.namespace_uri == namespace_uri
        }) {
            Some(index) => index,
            None => {
                self.children.push(TargetPathSegment {
                    name: name.to_string(),
                    namespace_uri: namespace_uri.to_string(),
                    namespace_prefix: namespace_prefix.map(str::to_string),
                    is_attribute,
                    mapping: None,
                    children: Vec::new(),
                });
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }
}

/// The target-path tree of one entity type: one root for ATOM syndication
/// targets, one for custom elements.
#[derive(Debug, Clone)]
pub struct TargetTree {
    syndication_root: TargetPathSegment,
    custom_root: TargetPathSegment,
}

impl Default for TargetTree {
    fn default() -> Self {
        TargetTree {
            syndication_root: TargetPathSegment::root(ATOM_NAMESPACE),
            custom_root: TargetPathSegment::root(""),
        }
    }
}

impl TargetTree {
    pub fn build<'a>(descriptors: impl IntoIterator<Item = &'a Arc<MappingDescriptor>>) -> Result<Self> {
        let mut tree = TargetTree::default();
        for descriptor in descriptors {
            match descriptor.target() {
                MappingTarget::Syndication(item) => tree.add_syndication(*item, descriptor)?,
                MappingTarget::Custom(custom) => tree.add_custom(custom, descriptor)?,
            }
        }
        Ok(tree)
    }

    pub fn syndication_root(&self) -> &TargetPathSegment {
        &self.syndication_root
    }

    pub fn custom_root(&self) -> &TargetPathSegment {
        &self.custom_root
    }

    fn add_syndication(&mut self, item: SyndicationItem, descriptor: &Arc<MappingDescriptor>) -> Result<()> {
        let mut segment = &mut self.syndication_root;
        if let Some(person) = item.parent() {
            segment = segment.child_mut_or_insert(ATOM_NAMESPACE, None, person.element_name(), false);
        }
        let leaf = segment.child_mut_or_insert(ATOM_NAMESPACE, None, item.element_name(), false);
        if leaf.mapping.is_some() {
            return Err(EpmError::invalid_mapping(
                descriptor.source_path_string(),
                format!("{} is already the target of another property", item.target_name()),
            ));
        }
        leaf.mapping = Some(Arc::clone(descriptor));
        Ok(())
    }

    fn add_custom(&mut self, target: &CustomTarget, descriptor: &Arc<MappingDescriptor>) -> Result<()> {
        let source = descriptor.source_path_string();
        let segments: Vec<&str> = target.segments().collect();
        let last = segments.len() - 1;

        let mut segment = &mut self.custom_root;
        for (i, raw) in segments.iter().enumerate() {
            let (name, is_attribute) = match raw.strip_prefix('@') {
                Some(name) => (name, true),
                None => (*raw, false),
            };
            if name.is_empty() {
                return Err(EpmError::invalid_mapping(
                    &source,
                    format!("target path `{}` contains an empty segment", target.path),
                ));
            }
            if is_attribute && i == 0 {
                return Err(EpmError::invalid_mapping(
                    &source,
                    format!("`{}` must name an element before attribute `{name}`", target.path),
                ));
            }
            if is_attribute && i != last {
                return Err(EpmError::invalid_mapping(
                    &source,
                    format!("attribute `{name}` must be the last segment of `{}`", target.path),
                ));
            }
            if !is_attribute && segment.mapping.is_some() {
                return Err(EpmError::invalid_mapping(
                    &source,
                    format!(
                        "element `{name}` cannot be nested in `{}` which holds mapped content",
                        segment.name
                    ),
                ));
            }
            segment = segment.child_mut_or_insert(
                &target.namespace_uri,
                target.namespace_prefix.as_deref(),
                name,
                is_attribute,
            );
        }

        if segment.mapping.is_some() {
            return Err(EpmError::invalid_mapping(
                &source,
                format!("`{}` is already the target of another property", target.path),
            ));
        }
        if segment.element_children().next().is_some() {
            return Err(EpmError::invalid_mapping(
                &source,
                format!("`{}` has child elements and cannot hold mapped content", target.path),
            ));
        }
        segment.mapping = Some(Arc::clone(descriptor));
        Ok(())
    }
}

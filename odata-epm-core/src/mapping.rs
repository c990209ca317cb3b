//! Mapping descriptors: one declared property-to-ATOM association each.

use serde::Deserialize;

use crate::error::{EpmError, Result};

/// Fixed set of ATOM locations a property can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyndicationItem {
    Title,
    Summary,
    Rights,
    Updated,
    Published,
    AuthorName,
    AuthorEmail,
    AuthorUri,
    ContributorName,
    ContributorEmail,
    ContributorUri,
    Category,
}

impl SyndicationItem {
    pub const ALL: [SyndicationItem; 12] = [
        SyndicationItem::Title,
        SyndicationItem::Summary,
        SyndicationItem::Rights,
        SyndicationItem::Updated,
        SyndicationItem::Published,
        SyndicationItem::AuthorName,
        SyndicationItem::AuthorEmail,
        SyndicationItem::AuthorUri,
        SyndicationItem::ContributorName,
        SyndicationItem::ContributorEmail,
        SyndicationItem::ContributorUri,
        SyndicationItem::Category,
    ];

    /// Name used in mapping declarations, e.g. `SyndicationTitle`.
    pub fn target_name(&self) -> &'static str {
        match self {
            SyndicationItem::Title => "SyndicationTitle",
            SyndicationItem::Summary => "SyndicationSummary",
            SyndicationItem::Rights => "SyndicationRights",
            SyndicationItem::Updated => "SyndicationUpdated",
            SyndicationItem::Published => "SyndicationPublished",
            SyndicationItem::AuthorName => "SyndicationAuthorName",
            SyndicationItem::AuthorEmail => "SyndicationAuthorEmail",
            SyndicationItem::AuthorUri => "SyndicationAuthorUri",
            SyndicationItem::ContributorName => "SyndicationContributorName",
            SyndicationItem::ContributorEmail => "SyndicationContributorEmail",
            SyndicationItem::ContributorUri => "SyndicationContributorUri",
            SyndicationItem::Category => "SyndicationCategory",
        }
    }

    pub fn from_target_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|item| item.target_name() == name)
    }

    /// The person construct this item lives under, if any.
    pub fn parent(&self) -> Option<PersonKind> {
        match self {
            SyndicationItem::AuthorName | SyndicationItem::AuthorEmail | SyndicationItem::AuthorUri => {
                Some(PersonKind::Author)
            }
            SyndicationItem::ContributorName
            | SyndicationItem::ContributorEmail
            | SyndicationItem::ContributorUri => Some(PersonKind::Contributor),
            SyndicationItem::Title
            | SyndicationItem::Summary
            | SyndicationItem::Rights
            | SyndicationItem::Updated
            | SyndicationItem::Published
            | SyndicationItem::Category => None,
        }
    }

    /// Local name of the ATOM element holding the value.
    pub fn element_name(&self) -> &'static str {
        match self {
            SyndicationItem::Title => crate::atom::TITLE,
            SyndicationItem::Summary => crate::atom::SUMMARY,
            SyndicationItem::Rights => crate::atom::RIGHTS,
            SyndicationItem::Updated => crate::atom::UPDATED,
            SyndicationItem::Published => crate::atom::PUBLISHED,
            SyndicationItem::AuthorName | SyndicationItem::ContributorName => crate::atom::NAME,
            SyndicationItem::AuthorEmail | SyndicationItem::ContributorEmail => crate::atom::EMAIL,
            SyndicationItem::AuthorUri | SyndicationItem::ContributorUri => crate::atom::URI,
            SyndicationItem::Category => crate::atom::CATEGORY,
        }
    }

    /// ATOM syntax forbids an empty string in these positions.
    pub fn forbids_empty(&self) -> bool {
        matches!(
            self,
            SyndicationItem::AuthorEmail
                | SyndicationItem::AuthorUri
                | SyndicationItem::ContributorEmail
                | SyndicationItem::ContributorUri
        )
    }

    pub fn is_text_construct(&self) -> bool {
        matches!(
            self,
            SyndicationItem::Title | SyndicationItem::Summary | SyndicationItem::Rights
        )
    }
}

/// The two repeated person constructs of an ATOM entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonKind {
    Author,
    Contributor,
}

impl PersonKind {
    pub fn element_name(&self) -> &'static str {
        match self {
            PersonKind::Author => crate::atom::AUTHOR,
            PersonKind::Contributor => crate::atom::CONTRIBUTOR,
        }
    }

    pub fn from_element_name(name: &str) -> Option<Self> {
        match name {
            crate::atom::AUTHOR => Some(PersonKind::Author),
            crate::atom::CONTRIBUTOR => Some(PersonKind::Contributor),
            _ => None,
        }
    }
}

/// Content-type marker of an ATOM text construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextContentKind {
    #[serde(alias = "text")]
    #[default]
    Plaintext,
    Html,
    Xhtml,
}

impl TextContentKind {
    /// Value of the ATOM `type` attribute.
    pub fn type_attribute(&self) -> &'static str {
        match self {
            TextContentKind::Plaintext => "text",
            TextContentKind::Html => "html",
            TextContentKind::Xhtml => "xhtml",
        }
    }

    pub fn from_type_attribute(value: &str) -> Option<Self> {
        match value {
            "text" => Some(TextContentKind::Plaintext),
            "html" => Some(TextContentKind::Html),
            "xhtml" => Some(TextContentKind::Xhtml),
            _ => None,
        }
    }
}

/// A mapping into a custom (non-ATOM) element or attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomTarget {
    pub namespace_uri: String,
    pub namespace_prefix: Option<String>,
    /// Slash separated element path; a final `@name` segment is an attribute.
    pub path: String,
}

impl CustomTarget {
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/')
    }
}

/// Where a mapped property is written to and read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MappingTarget {
    Syndication(SyndicationItem),
    Custom(CustomTarget),
}

impl MappingTarget {
    /// Parses a declared target: a `Syndication*` name, or a custom path which
    /// then requires a namespace.
    pub fn parse(
        target: &str,
        namespace_uri: Option<&str>,
        namespace_prefix: Option<&str>,
    ) -> Result<Self> {
        if let Some(item) = SyndicationItem::from_target_name(target) {
            return Ok(MappingTarget::Syndication(item));
        }
        if target.starts_with("Syndication") {
            return Err(EpmError::invalid_mapping(
                target,
                "unknown syndication target",
            ));
        }
        let Some(namespace_uri) = namespace_uri.filter(|ns| !ns.is_empty()) else {
            return Err(EpmError::invalid_mapping(
                target,
                "custom targets require a namespace uri",
            ));
        };
        Ok(MappingTarget::Custom(CustomTarget {
            namespace_uri: namespace_uri.to_string(),
            namespace_prefix: namespace_prefix.map(str::to_string),
            path: target.to_string(),
        }))
    }

    pub fn as_syndication(&self) -> Option<SyndicationItem> {
        match self {
            MappingTarget::Syndication(item) => Some(*item),
            MappingTarget::Custom(_) => None,
        }
    }
}

/// One declared property-to-ATOM mapping.
///
/// Built once per entity type and shared behind `Arc` by every entry of that
/// type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MappingDescriptor {
    source_path: Vec<String>,
    target: MappingTarget,
    keep_in_content: bool,
    content_kind: TextContentKind,
}

impl MappingDescriptor {
    pub fn new(source_path: &str, target: MappingTarget) -> Self {
        MappingDescriptor {
            source_path: source_path.split('/').map(str::to_string).collect(),
            target,
            keep_in_content: true,
            content_kind: TextContentKind::Plaintext,
        }
    }

    pub fn syndication(source_path: &str, item: SyndicationItem) -> Self {
        Self::new(source_path, MappingTarget::Syndication(item))
    }

    pub fn custom(
        source_path: &str,
        namespace_uri: &str,
        namespace_prefix: Option<&str>,
        target_path: &str,
    ) -> Self {
        Self::new(
            source_path,
            MappingTarget::Custom(CustomTarget {
                namespace_uri: namespace_uri.to_string(),
                namespace_prefix: namespace_prefix.map(str::to_string),
                path: target_path.to_string(),
            }),
        )
    }

    pub fn with_keep_in_content(mut self, keep_in_content: bool) -> Self {
        self.keep_in_content = keep_in_content;
        self
    }

    pub fn with_content_kind(mut self, content_kind: TextContentKind) -> Self {
        self.content_kind = content_kind;
        self
    }

    /// Returns a copy with `prefix` prepended to the source path.
    pub fn nested_under(&self, prefix: &str) -> Self {
        let mut nested = self.clone();
        nested.source_path.insert(0, prefix.to_string());
        nested
    }

    pub fn source_path(&self) -> &[String] {
        &self.source_path
    }

    pub fn source_path_string(&self) -> String {
        self.source_path.join("/")
    }

    pub fn target(&self) -> &MappingTarget {
        &self.target
    }

    pub fn keep_in_content(&self) -> bool {
        self.keep_in_content
    }

    pub fn content_kind(&self) -> TextContentKind {
        self.content_kind
    }

    pub fn syndication_item(&self) -> Option<SyndicationItem> {
        self.target.as_syndication()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_names_round_trip() {
        for item in SyndicationItem::ALL {
            assert_eq!(SyndicationItem::from_target_name(item.target_name()), Some(item));
        }
    }

    #[test]
    fn empty_forbidden_only_for_email_and_uri() {
        let forbidding: Vec<_> = SyndicationItem::ALL
            .into_iter()
            .filter(SyndicationItem::forbids_empty)
            .collect();
        assert_eq!(
            forbidding,
            vec![
                SyndicationItem::AuthorEmail,
                SyndicationItem::AuthorUri,
                SyndicationItem::ContributorEmail,
                SyndicationItem::ContributorUri,
            ]
        );
    }

    #[test]
    fn parse_syndication_target() {
        let target = MappingTarget::parse("SyndicationAuthorName", None, None).unwrap();
        assert_eq!(target, MappingTarget::Syndication(SyndicationItem::AuthorName));
        assert_eq!(
            SyndicationItem::AuthorName.parent(),
            Some(PersonKind::Author)
        );
    }

    #[test]
    fn parse_custom_target_requires_namespace() {
        assert!(MappingTarget::parse("location/@city", None, None).is_err());
        let target = MappingTarget::parse("location/@city", Some("http://ns/"), Some("c")).unwrap();
        let MappingTarget::Custom(custom) = target else {
            panic!("expected custom target");
        };
        assert_eq!(custom.segments().collect::<Vec<_>>(), vec!["location", "@city"]);
    }

    #[test]
    fn parse_unknown_syndication_target_fails() {
        assert!(MappingTarget::parse("SyndicationLinkHref", None, None).is_err());
    }

    #[test]
    fn descriptor_source_path_and_nesting() {
        let descriptor = MappingDescriptor::syndication("City", SyndicationItem::Title)
            .with_keep_in_content(false);
        let nested = descriptor.nested_under("Address");
        assert_eq!(nested.source_path_string(), "Address/City");
        assert!(!nested.keep_in_content());
        assert_eq!(descriptor.source_path(), ["City".to_string()]);
    }

    #[test]
    fn text_kind_type_attribute() {
        assert_eq!(TextContentKind::default().type_attribute(), "text");
        assert_eq!(TextContentKind::from_type_attribute("xhtml"), Some(TextContentKind::Xhtml));
    }
}

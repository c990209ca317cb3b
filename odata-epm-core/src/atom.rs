//! ATOM metadata containers and the fixed names the mapping walks match.

use chrono::{DateTime, FixedOffset};

use crate::mapping::TextContentKind;

pub const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";
pub const ODATA_DATA_NAMESPACE: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices";
pub const ODATA_METADATA_NAMESPACE: &str =
    "http://schemas.microsoft.com/ado/2007/08/dataservices/metadata";
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";
/// Scheme of the category that carries an entry's entity type name.
pub const ODATA_SCHEME_NAMESPACE: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/scheme";

pub const ODATA_DATA_PREFIX: &str = "d";
pub const ODATA_METADATA_PREFIX: &str = "m";

pub const ENTRY: &str = "entry";
pub const TITLE: &str = "title";
pub const SUMMARY: &str = "summary";
pub const RIGHTS: &str = "rights";
pub const UPDATED: &str = "updated";
pub const PUBLISHED: &str = "published";
pub const AUTHOR: &str = "author";
pub const CONTRIBUTOR: &str = "contributor";
pub const NAME: &str = "name";
pub const EMAIL: &str = "email";
pub const URI: &str = "uri";
pub const CATEGORY: &str = "category";
pub const TERM: &str = "term";
pub const SCHEME: &str = "scheme";
pub const LABEL: &str = "label";
pub const LINK: &str = "link";
pub const HREF: &str = "href";
pub const REL: &str = "rel";
pub const TYPE: &str = "type";
pub const CONTENT: &str = "content";
pub const SOURCE: &str = "source";
pub const ID: &str = "id";

pub const PROPERTIES: &str = "properties";
pub const NULL: &str = "null";
pub const COLLECTION_ELEMENT: &str = "element";

/// An ATOM text construct (title, summary, rights).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AtomTextConstruct {
    pub kind: TextContentKind,
    pub text: Option<String>,
}

impl AtomTextConstruct {
    pub fn new(kind: TextContentKind, text: impl Into<String>) -> Self {
        AtomTextConstruct {
            kind,
            text: Some(text.into()),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(TextContentKind::Plaintext, text)
    }
}

/// An ATOM person construct (author, contributor).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AtomPerson {
    pub name: Option<String>,
    pub email: Option<String>,
    pub uri: Option<String>,
}

impl AtomPerson {
    pub fn named(name: impl Into<String>) -> Self {
        AtomPerson {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.uri.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AtomCategory {
    pub term: Option<String>,
    pub scheme: Option<String>,
    pub label: Option<String>,
}

impl AtomCategory {
    pub fn with_term(term: impl Into<String>) -> Self {
        AtomCategory {
            term: Some(term.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AtomLink {
    pub href: Option<String>,
    pub relation: Option<String>,
    pub media_type: Option<String>,
    pub title: Option<String>,
}

/// The `atom:source` element of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AtomSourceMetadata {
    pub id: Option<String>,
    pub title: Option<AtomTextConstruct>,
    pub updated: Option<DateTime<FixedOffset>>,
}

/// ATOM metadata of a single entry.
///
/// Timestamps carry both a parsed form and, for behaviors that echo raw
/// strings, the literal text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AtomEntryMetadata {
    pub title: Option<AtomTextConstruct>,
    pub summary: Option<AtomTextConstruct>,
    pub rights: Option<AtomTextConstruct>,
    pub published: Option<DateTime<FixedOffset>>,
    pub published_string: Option<String>,
    pub updated: Option<DateTime<FixedOffset>>,
    pub updated_string: Option<String>,
    pub authors: Option<Vec<AtomPerson>>,
    pub contributors: Option<Vec<AtomPerson>>,
    pub categories: Option<Vec<AtomCategory>>,
    pub links: Option<Vec<AtomLink>>,
    pub source: Option<AtomSourceMetadata>,
}

impl AtomEntryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persons(&self, kind: crate::mapping::PersonKind) -> Option<&Vec<AtomPerson>> {
        match kind {
            crate::mapping::PersonKind::Author => self.authors.as_ref(),
            crate::mapping::PersonKind::Contributor => self.contributors.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::PersonKind;

    #[test]
    fn persons_by_kind() {
        let metadata = AtomEntryMetadata {
            authors: Some(vec![AtomPerson::named("Ann")]),
            ..Default::default()
        };
        assert_eq!(metadata.persons(PersonKind::Author).map(Vec::len), Some(1));
        assert!(metadata.persons(PersonKind::Contributor).is_none());
    }

    #[test]
    fn empty_person() {
        assert!(AtomPerson::default().is_empty());
        assert!(!AtomPerson::named("x").is_empty());
    }
}

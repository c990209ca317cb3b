use crate::mapping::SyndicationItem;
use crate::xml::XmlError;

/// Result alias used throughout the crate.
pub type Result<T, E = EpmError> = std::result::Result<T, E>;

/// Integrity failures in already-built mapping trees.
///
/// These indicate a bug in tree construction, never bad payload data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InternalError {
    #[error("target segment `{0}` was expected to have content")]
    SegmentWithoutContent(String),
    #[error("target segment `{0}` was not expected to have content")]
    SegmentWithContent(String),
    #[error("syndication item {0:?} is not valid at this level of the target tree")]
    UnexpectedSyndicationItem(SyndicationItem),
    #[error("target segment `{0}` has no syndication mapping")]
    MissingSyndicationMapping(String),
    #[error("unknown syndication parent element `{0}`")]
    UnknownSyndicationParent(String),
}

/// Error type for mapping construction, EPM reads, writes and merges.
#[derive(Debug, thiserror::Error)]
pub enum EpmError {
    #[error("internal error: {0}")]
    Internal(#[from] InternalError),

    #[error("invalid mapping for `{source_path}`: {reason}")]
    InvalidMapping { source_path: String, reason: String },

    #[error("conflicting values for `{field}`: custom metadata has `{custom}`, mapped property has `{epm}`")]
    MetadataConflict {
        field: &'static str,
        custom: String,
        epm: String,
    },

    #[error("an empty value cannot be written to {target:?}")]
    InvalidEmptyValue { target: SyndicationItem },

    #[error("mapped property `{path}` does not hold a primitive value")]
    NonPrimitiveMappedValue { path: String },

    #[error("`{value}` is not a valid timestamp")]
    InvalidTimestamp { value: String },

    #[error("`{value}` is not a valid {kind} value for property `{property}`")]
    InvalidPrimitive {
        property: String,
        value: String,
        kind: &'static str,
    },

    #[error("property `{property}` does not accept null")]
    NullNotAllowed { property: String },

    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("xml error: {0}")]
    Xml(#[from] XmlError),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EpmError {
    pub(crate) fn invalid_mapping(source_path: impl Into<String>, reason: impl Into<String>) -> Self {
        EpmError::InvalidMapping {
            source_path: source_path.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for tree-integrity failures.
    pub fn is_internal(&self) -> bool {
        matches!(self, EpmError::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_field_and_values() {
        let err = EpmError::MetadataConflict {
            field: "Title",
            custom: "A".to_string(),
            epm: "B".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Title"));
        assert!(msg.contains("`A`"));
        assert!(msg.contains("`B`"));
    }

    #[test]
    fn internal_errors_are_flagged() {
        let err: EpmError = InternalError::SegmentWithoutContent("title".into()).into();
        assert!(err.is_internal());
        assert!(!EpmError::UnknownType("X".into()).is_internal());
    }
}

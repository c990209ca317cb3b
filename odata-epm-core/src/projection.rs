use indexmap::IndexMap;

static ALL: ProjectedProperties = ProjectedProperties::All;

/// Which properties a `$select`-style projection includes, per nesting level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProjectedProperties {
    /// No projection: every property is written.
    #[default]
    All,
    /// Only the named properties, each with the projection of its own
    /// sub-properties.
    Selected(IndexMap<String, ProjectedProperties>),
    /// Marker handed to the children of a mapped property that was forced into
    /// content because it is null. Everything below it is written.
    EmptyProjected,
}

impl ProjectedProperties {
    /// Builds a projection from slash separated paths such as `Name` or
    /// `Address/City`. Selecting a property selects all of its
    /// sub-properties unless only some of them are named.
    pub fn select<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut projection = ProjectedProperties::Selected(IndexMap::new());
        for path in paths {
            projection.add_path(path.split('/').filter(|s| !s.is_empty()));
        }
        projection
    }

    fn add_path<'a>(&mut self, mut segments: impl Iterator<Item = &'a str>) {
        if !matches!(self, ProjectedProperties::Selected(_)) {
            return;
        }
        let Some(name) = segments.next() else {
            *self = ProjectedProperties::All;
            return;
        };
        let ProjectedProperties::Selected(selected) = self else {
            return;
        };
        let child = selected
            .entry(name.to_string())
            .or_insert_with(|| ProjectedProperties::Selected(IndexMap::new()));
        child.add_path(segments);
    }

    pub fn is_selected(&self, property_name: &str) -> bool {
        match self {
            ProjectedProperties::All | ProjectedProperties::EmptyProjected => true,
            ProjectedProperties::Selected(selected) => selected.contains_key(property_name),
        }
    }

    /// The projection applying to the sub-properties of `property_name`.
    pub fn child(&self, property_name: &str) -> &ProjectedProperties {
        match self {
            ProjectedProperties::All => &ALL,
            ProjectedProperties::EmptyProjected => self,
            ProjectedProperties::Selected(selected) => selected.get(property_name).unwrap_or(&ALL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_selects_everything() {
        let projection = ProjectedProperties::All;
        assert!(projection.is_selected("Anything"));
        assert_eq!(projection.child("Anything"), &ProjectedProperties::All);
    }

    #[test]
    fn select_nested_paths() {
        let projection = ProjectedProperties::select(["Name", "Address/City"]);
        assert!(projection.is_selected("Name"));
        assert!(projection.is_selected("Address"));
        assert!(!projection.is_selected("Price"));

        let address = projection.child("Address");
        assert!(address.is_selected("City"));
        assert!(!address.is_selected("Street"));
        assert_eq!(projection.child("Name"), &ProjectedProperties::All);
    }

    #[test]
    fn whole_property_wins_over_sub_selection() {
        let projection = ProjectedProperties::select(["Address/City", "Address"]);
        assert!(projection.child("Address").is_selected("Street"));
    }

    #[test]
    fn empty_projected_marker_propagates() {
        let marker = ProjectedProperties::EmptyProjected;
        assert!(marker.is_selected("City"));
        assert_eq!(marker.child("Address"), &ProjectedProperties::EmptyProjected);
    }
}

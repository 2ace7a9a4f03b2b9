use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::Location;

/// A content node loaded from a course: a course, chapter, problem, etc.
///
/// Descriptors are built once, from the XML of a single element, and are never
/// modified afterwards. Children are held by [`Location`] and resolved through
/// the store that owns the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    location: Location,
    class: String,
    metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<Location>,
}

impl Descriptor {
    /// Creates a descriptor.
    ///
    /// `class` is the name of the behaviour that built it, `metadata` holds
    /// the element's attributes and `data` any opaque content the behaviour
    /// chose to keep.
    #[must_use]
    pub const fn new(
        location: Location,
        class: String,
        metadata: BTreeMap<String, String>,
        data: Option<String>,
        children: Vec<Location>,
    ) -> Self {
        Self {
            location,
            class,
            metadata,
            data,
            children,
        }
    }

    /// The identity of this node.
    #[must_use]
    pub const fn location(&self) -> &Location {
        &self.location
    }

    /// The category of this node (its XML tag).
    #[must_use]
    pub fn category(&self) -> &str {
        self.location.category()
    }

    /// The name of the class that built this node.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Attributes of the source element, including the allocated `slug`.
    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Looks up a single metadata value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// A human-readable name: `display_name`, then `name`, then the slug.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.get("display_name")
            .or_else(|| self.get("name"))
            .unwrap_or_else(|| self.location.slug())
    }

    /// Opaque content kept by the class, such as the inner XML of a problem.
    #[must_use]
    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// Locations of the child nodes, in document order.
    #[must_use]
    pub fn children(&self) -> &[Location] {
        &self.children
    }
}

//! In-memory index of content nodes keyed by [`Location`].
//!
//! Entries are registered as soon as a node's location is known. The
//! [`Descriptor`] itself is built from its retained source on first access,
//! or up front by [`ModuleIndex::materialize_all`]. Building goes through a
//! [`OnceLock`], so a loaded index can be shared between threads.

use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    domain::{Descriptor, DescriptorClass, Location, class::NodeSource},
    storage::xml::XmlElement,
};

/// The retained input for building a descriptor later.
#[derive(Debug)]
pub(crate) struct PendingNode {
    pub(crate) class: Arc<dyn DescriptorClass>,
    pub(crate) element: XmlElement,
    pub(crate) children: Vec<Location>,
}

impl PendingNode {
    fn build(&self, location: &Location) -> Descriptor {
        self.class.build(NodeSource {
            location,
            element: &self.element,
            children: &self.children,
        })
    }
}

#[derive(Debug)]
struct Entry {
    source: Option<PendingNode>,
    node: OnceLock<Descriptor>,
}

impl Entry {
    fn resolve(&self, location: &Location) -> Option<&Descriptor> {
        if let Some(node) = self.node.get() {
            return Some(node);
        }
        let source = self.source.as_ref()?;
        Some(self.node.get_or_init(|| source.build(location)))
    }
}

/// Lookup failures.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ItemError {
    /// A required location component was missing.
    #[error("insufficiently specified location: missing {0}")]
    InsufficientSpecification(&'static str),

    /// The input could not be interpreted as a location.
    #[error("invalid location '{0}'")]
    InvalidLocation(String),

    /// The location is well formed but nothing is stored there.
    #[error("item not found: {0}")]
    NotFound(Location),
}

impl From<crate::domain::LocationError> for ItemError {
    fn from(error: crate::domain::LocationError) -> Self {
        use crate::domain::LocationError;
        match error {
            LocationError::InsufficientSpecification(field) => {
                Self::InsufficientSpecification(field)
            }
            LocationError::Invalid(input) => Self::InvalidLocation(input),
        }
    }
}

impl From<std::convert::Infallible> for ItemError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

/// A map from [`Location`] to [`Descriptor`].
///
/// Keys are unique; inserting an existing location replaces the previous
/// entry.
#[derive(Debug, Default)]
pub struct ModuleIndex {
    entries: HashMap<Location, Entry>,
}

impl ModuleIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an already built descriptor, replacing any existing entry.
    pub fn put(&mut self, location: Location, node: Descriptor) {
        self.entries.insert(
            location,
            Entry {
                source: None,
                node: OnceLock::from(node),
            },
        );
    }

    /// Registers a node that will be built on first access.
    pub(crate) fn put_pending(&mut self, location: Location, source: PendingNode) {
        self.entries.insert(
            location,
            Entry {
                source: Some(source),
                node: OnceLock::new(),
            },
        );
    }

    /// Returns the descriptor at `location`, building it if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`ItemError::NotFound`] if nothing is registered at `location`.
    pub fn get(&self, location: &Location) -> Result<&Descriptor, ItemError> {
        self.entries
            .get_key_value(location)
            .and_then(|(key, entry)| entry.resolve(key))
            .ok_or_else(|| ItemError::NotFound(location.clone()))
    }

    /// Returns `true` if something is registered at `location`.
    #[must_use]
    pub fn contains(&self, location: &Location) -> bool {
        self.entries.contains_key(location)
    }

    /// Returns `true` if the descriptor at `location` has already been built.
    #[must_use]
    pub fn is_materialized(&self, location: &Location) -> bool {
        self.entries
            .get(location)
            .is_some_and(|entry| entry.node.get().is_some())
    }

    /// Builds every descriptor that has not been built yet.
    pub fn materialize_all(&self) {
        self.entries.par_iter().for_each(|(location, entry)| {
            entry.resolve(location);
        });
    }

    /// Iterates over every registered location, in no particular order.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.entries.keys()
    }

    /// The number of registered locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry in the same course as `course`, whatever its
    /// category, slug or revision. Returns the number of entries removed.
    pub fn remove_course(&mut self, course: &Location) -> usize {
        let before = self.entries.len();
        self.entries.retain(|l, _| !l.same_course(course));
        before - self.entries.len()
    }

    /// Moves every entry of `other` into this index. Entries in `other` win.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }
}

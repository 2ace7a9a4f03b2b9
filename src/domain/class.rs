//! Node behaviours, keyed by XML tag.
//!
//! A [`DescriptorClass`] decides how an element becomes a [`Descriptor`]:
//! which of its child elements are content nodes in their own right and what
//! data is kept. A [`ClassResolver`] maps tag names to classes. The
//! [`ClassRegistry`] is a table-driven resolver pre-populated with the
//! built-in classes.

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    domain::{Descriptor, Location},
    storage::xml::XmlElement,
};

/// Everything a [`DescriptorClass`] needs to build a node.
#[derive(Debug, Clone, Copy)]
pub struct NodeSource<'a> {
    /// The allocated location of the node.
    pub location: &'a Location,
    /// The source element, with its `slug` attribute filled in. For classes
    /// with children, child elements have already been removed.
    pub element: &'a XmlElement,
    /// Locations of the child nodes, in document order.
    pub children: &'a [Location],
}

/// The behaviour of one kind of content node.
pub trait DescriptorClass: fmt::Debug + Send + Sync {
    /// The registered name of the class.
    fn name(&self) -> &str;

    /// Whether child elements are content nodes rather than opaque data.
    fn has_children(&self) -> bool {
        false
    }

    /// Builds the node.
    fn build(&self, source: NodeSource<'_>) -> Descriptor;
}

/// Resolves a tag name to the class that handles it.
pub trait ClassResolver: Send + Sync {
    /// Returns the class registered for `tag`, if any.
    fn resolve(&self, tag: &str) -> Option<Arc<dyn DescriptorClass>>;

    /// Returns a class by its name, used to honour a configured default class.
    fn class_named(&self, _name: &str) -> Option<Arc<dyn DescriptorClass>> {
        None
    }
}

/// A container node. Child elements are content nodes; the element's own
/// text, if any, is kept as data.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceClass;

impl DescriptorClass for SequenceClass {
    fn name(&self) -> &'static str {
        "sequence"
    }

    fn has_children(&self) -> bool {
        true
    }

    fn build(&self, source: NodeSource<'_>) -> Descriptor {
        let text = source.element.text();
        Descriptor::new(
            source.location.clone(),
            self.name().to_string(),
            metadata(source.element),
            (!text.trim().is_empty()).then_some(text),
            source.children.to_vec(),
        )
    }
}

/// A leaf node whose inner XML is kept verbatim as its data.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawClass;

impl DescriptorClass for RawClass {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn build(&self, source: NodeSource<'_>) -> Descriptor {
        Descriptor::new(
            source.location.clone(),
            self.name().to_string(),
            metadata(source.element),
            Some(source.element.inner_xml()),
            Vec::new(),
        )
    }
}

fn metadata(element: &XmlElement) -> std::collections::BTreeMap<String, String> {
    element
        .attributes()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

const SEQUENCE_TAGS: &[&str] = &[
    "course",
    "chapter",
    "section",
    "sequential",
    "vertical",
    "videosequence",
];

const RAW_TAGS: &[&str] = &[
    "html",
    "problem",
    "video",
    "discussion",
    "customtag",
    "image",
    "abtest",
];

/// A static table of tag to class mappings.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    by_tag: HashMap<String, Arc<dyn DescriptorClass>>,
    by_name: HashMap<String, Arc<dyn DescriptorClass>>,
}

impl ClassRegistry {
    /// Creates a registry with no classes at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in container and raw classes.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();

        let sequence: Arc<dyn DescriptorClass> = Arc::new(SequenceClass);
        for tag in SEQUENCE_TAGS {
            registry.register(tag, Arc::clone(&sequence));
        }

        let raw: Arc<dyn DescriptorClass> = Arc::new(RawClass);
        for tag in RAW_TAGS {
            registry.register(tag, Arc::clone(&raw));
        }

        registry
    }

    /// Maps `tag` to `class`, replacing any previous mapping for the tag.
    ///
    /// The class also becomes available by name through
    /// [`ClassResolver::class_named`].
    pub fn register(&mut self, tag: &str, class: Arc<dyn DescriptorClass>) {
        self.by_name
            .insert(class.name().to_string(), Arc::clone(&class));
        self.by_tag.insert(tag.to_string(), class);
    }
}

impl ClassResolver for ClassRegistry {
    fn resolve(&self, tag: &str) -> Option<Arc<dyn DescriptorClass>> {
        self.by_tag.get(tag).cloned()
    }

    fn class_named(&self, name: &str) -> Option<Arc<dyn DescriptorClass>> {
        self.by_name.get(name).cloned()
    }
}

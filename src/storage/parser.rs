//! Recursive parsing of a course document into indexed content nodes.

use std::{io, path::PathBuf, sync::Arc};

use tracing::instrument;

use crate::{
    domain::{ClassResolver, DescriptorClass, Location, LocationError},
    storage::{
        index::{ModuleIndex, PendingNode},
        slug::SlugAllocator,
        xml::{self, XmlElement, XmlError},
    },
};

/// Errors that can occur while loading a single course.
#[derive(Debug, thiserror::Error)]
pub enum CourseLoadError {
    /// The course directory has no entry document.
    #[error("course file {} not found", .0.display())]
    MissingCourseFile(PathBuf),

    /// The entry document could not be read.
    #[error("failed to read {}", path.display())]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The course document is not well-formed XML.
    #[error(transparent)]
    Parse(#[from] XmlError),

    /// The root element lacks a required attribute.
    #[error("course root element is missing the '{0}' attribute")]
    MissingAttribute(&'static str),

    /// No class handles this tag and no default class is configured.
    #[error("no descriptor class registered for category '{0}'")]
    UnknownCategory(String),

    /// A location could not be built for a node.
    #[error(transparent)]
    Location(#[from] LocationError),
}

/// Parses an XML document, logging the offending text if it is malformed.
///
/// # Errors
///
/// Returns the [`XmlError`] from [`xml::parse_document`].
pub fn read_xml(text: &str) -> Result<XmlElement, XmlError> {
    xml::parse_document(text).inspect_err(|e| {
        tracing::error!("Unable to parse xml: {e}\n{text}");
    })
}

/// The result of parsing one course.
#[derive(Debug)]
pub struct ParsedCourse {
    /// The location of the root node.
    pub root: Location,
    /// Every node of the course, keyed by location.
    pub index: ModuleIndex,
}

/// Turns course documents into indexed content nodes.
///
/// Tags are resolved through a [`ClassResolver`], falling back to an optional
/// default class.
#[derive(Clone, Copy)]
pub struct TreeParser<'a> {
    resolver: &'a dyn ClassResolver,
    default_class: Option<&'a Arc<dyn DescriptorClass>>,
}

impl<'a> TreeParser<'a> {
    /// Creates a parser.
    #[must_use]
    pub const fn new(
        resolver: &'a dyn ClassResolver,
        default_class: Option<&'a Arc<dyn DescriptorClass>>,
    ) -> Self {
        Self {
            resolver,
            default_class,
        }
    }

    /// Parses `xml_text` as the tree of course `org`/`course`.
    ///
    /// # Errors
    ///
    /// Fails if the text is not well-formed XML or if any node cannot be
    /// resolved to a class. Nothing is returned for a failed course.
    pub fn parse(
        &self,
        xml_text: &str,
        org: &str,
        course: &str,
    ) -> Result<ParsedCourse, CourseLoadError> {
        let root = read_xml(xml_text)?;
        self.parse_element(root, org, course)
    }

    /// Parses an already read root element as the tree of course
    /// `org`/`course`.
    ///
    /// # Errors
    ///
    /// Fails if any node cannot be resolved to a class or located.
    #[instrument(level = "debug", skip(self, root))]
    pub fn parse_element(
        &self,
        root: XmlElement,
        org: &str,
        course: &str,
    ) -> Result<ParsedCourse, CourseLoadError> {
        let mut context = LoadContext::new(*self, org, course);
        let root = context.process(root)?;
        tracing::debug!("parsed {} nodes", context.index.len());

        Ok(ParsedCourse {
            root,
            index: context.index,
        })
    }

    fn class_for(&self, tag: &str) -> Result<Arc<dyn DescriptorClass>, CourseLoadError> {
        self.resolver
            .resolve(tag)
            .or_else(|| self.default_class.cloned())
            .ok_or_else(|| CourseLoadError::UnknownCategory(tag.to_string()))
    }
}

/// State for one course load, shared by every node of the course tree.
struct LoadContext<'a> {
    parser: TreeParser<'a>,
    org: &'a str,
    course: &'a str,
    allocator: SlugAllocator,
    index: ModuleIndex,
}

impl<'a> LoadContext<'a> {
    fn new(parser: TreeParser<'a>, org: &'a str, course: &'a str) -> Self {
        Self {
            parser,
            org,
            course,
            allocator: SlugAllocator::new(),
            index: ModuleIndex::new(),
        }
    }

    /// Allocates a location for `element`, processes its content children and
    /// registers it.
    fn process(&mut self, mut element: XmlElement) -> Result<Location, CourseLoadError> {
        let slug = self.allocator.allocate(&element);
        element.set_attribute("slug", slug.as_str());

        let class = self.parser.class_for(element.tag())?;
        let location = Location::new(self.org, self.course, element.tag(), slug, None)?;

        let children = if class.has_children() {
            element
                .take_child_elements()
                .into_iter()
                .map(|child| self.process(child))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };

        self.index.put_pending(
            location.clone(),
            PendingNode {
                class,
                element,
                children,
            },
        );

        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::domain::{ClassRegistry, class::RawClass};

    const COURSE: &str = r#"
        <course org="MITx" course="6002" name="Circuits and Electronics">
            <chapter name="Week 1">
                <sequential>
                    <html/>
                    <html/>
                    <problem name="My Problem"><p>1 + 1 = ?</p></problem>
                </sequential>
            </chapter>
            <chapter name="Week 1">
                <html slug="explicit"/>
            </chapter>
        </course>
    "#;

    fn parse(xml: &str) -> Result<ParsedCourse, CourseLoadError> {
        let registry = ClassRegistry::builtin();
        TreeParser::new(&registry, None).parse(xml, "MITx", "6002")
    }

    fn location(category: &str, slug: &str) -> Location {
        Location::new("MITx", "6002", category, slug, None).unwrap()
    }

    fn slugs(parsed: &ParsedCourse, category: &str) -> Vec<String> {
        let mut slugs: Vec<_> = parsed
            .index
            .locations()
            .filter(|l| l.category() == category)
            .map(|l| l.slug().to_string())
            .collect();
        slugs.sort();
        slugs
    }

    #[test]
    fn every_content_element_is_indexed() {
        let parsed = parse(COURSE).unwrap();

        // course, 2 chapters, sequential, 3 html, problem
        assert_eq!(parsed.index.len(), 8);
        assert_eq!(parsed.root.category(), "course");
        assert_eq!(parsed.root.slug(), "Circuits_and_Electronics");
    }

    #[test]
    fn slugs_follow_allocation_rules() {
        let parsed = parse(COURSE).unwrap();

        assert_eq!(slugs(&parsed, "chapter"), ["Week_1", "Week_1_4"]);
        assert_eq!(slugs(&parsed, "sequential"), ["sequential_1"]);
        assert_eq!(slugs(&parsed, "html"), ["explicit", "html_2", "html_3"]);
        assert_eq!(slugs(&parsed, "problem"), ["My_Problem"]);
    }

    #[test]
    fn slugs_are_unique_per_category() {
        let parsed = parse(COURSE).unwrap();
        let mut seen = HashSet::new();
        for location in parsed.index.locations() {
            assert!(seen.insert((location.category(), location.slug())));
        }
    }

    #[test]
    fn children_are_recorded_in_document_order() {
        let parsed = parse(COURSE).unwrap();
        let sequential = location("sequential", "sequential_1");
        let node = parsed.index.get(&sequential).unwrap();

        let children: Vec<_> = node.children().iter().map(Location::slug).collect();
        assert_eq!(children, ["html_2", "html_3", "My_Problem"]);
    }

    #[test]
    fn raw_nodes_keep_their_markup_and_slug() {
        let parsed = parse(COURSE).unwrap();
        let problem = location("problem", "My_Problem");
        let node = parsed.index.get(&problem).unwrap();

        assert_eq!(node.data(), Some("<p>1 + 1 = ?</p>"));
        assert_eq!(node.get("slug"), Some("My_Problem"));
    }

    #[test]
    fn nothing_is_built_until_accessed() {
        let parsed = parse(COURSE).unwrap();
        let index = &parsed.index;
        assert!(index.locations().all(|l| !index.is_materialized(l)));
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let error = parse("<course><chapter></course>").unwrap_err();
        assert!(matches!(error, CourseLoadError::Parse(_)));
    }

    #[test]
    fn unknown_tag_without_default_fails() {
        let error = parse("<course><mystery/></course>").unwrap_err();
        match error {
            CourseLoadError::UnknownCategory(tag) => assert_eq!(tag, "mystery"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_tag_uses_default_class() {
        let registry = ClassRegistry::builtin();
        let fallback: Arc<dyn DescriptorClass> = Arc::new(RawClass);
        let parsed = TreeParser::new(&registry, Some(&fallback))
            .parse("<course><mystery>?</mystery></course>", "MITx", "6002")
            .unwrap();

        let mystery = parsed.index.get(&location("mystery", "mystery_2")).unwrap();
        assert_eq!(mystery.class(), "raw");
    }

    #[test]
    fn empty_course_identifier_is_rejected() {
        let registry = ClassRegistry::builtin();
        let error = TreeParser::new(&registry, None)
            .parse("<course/>", "MITx", "")
            .unwrap_err();
        assert!(matches!(
            error,
            CourseLoadError::Location(LocationError::InsufficientSpecification("course"))
        ));
    }
}

mod index;
pub use index::{ItemError, ModuleIndex};

mod parser;
pub use parser::{CourseLoadError, ParsedCourse, TreeParser, read_xml};

/// Access to course resource files.
pub mod resources;
pub use resources::{CourseResources, ResourceError};

mod slug;
pub use slug::SlugAllocator;

/// The read-only module store.
pub mod store;
pub use store::{
    CourseList, Loaded, ModuleStore, ReadOnlyError, StoreLoadError, Unloaded, XmlModuleStore,
};

/// Minimal XML tree and parser.
pub mod xml;
pub use xml::{MAX_DEPTH, XmlElement, XmlError, XmlNode, parse_document};

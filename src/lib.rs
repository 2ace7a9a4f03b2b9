//! A read-only module store backed by directories of XML.
//!
//! Each course lives in its own directory under a data directory, with its
//! content tree in a `course.xml` file. Loading a store parses every course,
//! gives each content element a unique slug and indexes the resulting
//! [`Descriptor`]s by [`Location`].
//!
//! ```no_run
//! use modulestore::XmlModuleStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = XmlModuleStore::new("data".into()).load_all()?;
//! let chapter = store.get_item("i4x://MITx/6002/chapter/Week_1")?;
//! println!("{}", chapter.display_name());
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub use domain::{Config, Descriptor, Location, PartialLocation};

/// Loading, indexing and querying course content.
pub mod storage;
pub use storage::{
    CourseLoadError, ItemError, ModuleStore, ReadOnlyError, StoreLoadError, XmlModuleStore,
};

//! A read-only, filesystem backed store of course content.
//!
//! The [`XmlModuleStore`] loads every course directory under a data directory
//! into a [`ModuleIndex`] and answers lookups by [`Location`]. Each course is
//! parsed independently with its own slug allocator and is either registered
//! in full or not at all.

use std::{
    collections::{BTreeMap, HashMap},
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::instrument;
use walkdir::WalkDir;

use crate::{
    domain::{ClassRegistry, ClassResolver, Config, Descriptor, DescriptorClass, Location},
    storage::{
        index::{ItemError, ModuleIndex},
        parser::{CourseLoadError, TreeParser, read_xml},
        resources::CourseResources,
    },
};

/// The query and mutation surface shared by module store backends.
///
/// The XML backend answers queries and rejects every mutation.
pub trait ModuleStore {
    /// Returns the descriptor stored at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`ItemError::NotFound`] if nothing is stored there.
    fn get_item(&self, location: &Location) -> Result<&Descriptor, ItemError>;

    /// Returns the course identifiers this store serves.
    fn get_courses(&self) -> Vec<String>;

    /// Creates a new item.
    ///
    /// # Errors
    ///
    /// Fails if the backend does not support writes.
    fn create_item(&self, location: &Location) -> Result<(), ReadOnlyError>;

    /// Replaces the data of an item.
    ///
    /// # Errors
    ///
    /// Fails if the backend does not support writes.
    fn update_item(&self, location: &Location, data: &str) -> Result<(), ReadOnlyError>;

    /// Replaces the children of an item.
    ///
    /// # Errors
    ///
    /// Fails if the backend does not support writes.
    fn update_children(&self, location: &Location, children: &[Location])
        -> Result<(), ReadOnlyError>;

    /// Replaces the metadata of an item.
    ///
    /// # Errors
    ///
    /// Fails if the backend does not support writes.
    fn update_metadata(
        &self,
        location: &Location,
        metadata: &BTreeMap<String, String>,
    ) -> Result<(), ReadOnlyError>;
}

/// Supplies the list of course identifiers advertised by a store.
pub trait CourseList: Send + Sync {
    /// The course identifiers.
    fn courses(&self) -> Vec<String>;
}

impl CourseList for Vec<String> {
    fn courses(&self) -> Vec<String> {
        self.clone()
    }
}

/// Construction options of a store that has not been loaded yet.
pub struct Unloaded {
    config: Config,
    registry: Arc<dyn ClassResolver>,
    default_class: Option<Arc<dyn DescriptorClass>>,
    course_list: Option<Box<dyn CourseList>>,
}

/// The state of a loaded store.
pub struct Loaded {
    config: Config,
    registry: Arc<dyn ClassResolver>,
    default_class: Option<Arc<dyn DescriptorClass>>,
    course_list: Box<dyn CourseList>,
    index: ModuleIndex,
    roots: Vec<Location>,
    resources: HashMap<(String, String), CourseResources>,
    skipped: Vec<(PathBuf, CourseLoadError)>,
}

/// A read-only store of courses loaded from a directory of XML.
///
/// Every immediate subdirectory of the data directory is one course, with its
/// tree rooted at `course.xml` (configurable).
pub struct XmlModuleStore<S> {
    /// The directory containing one subdirectory per course.
    data_dir: PathBuf,
    state: S,
}

impl<S> XmlModuleStore<S> {
    /// The directory courses are loaded from.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl<S> fmt::Debug for XmlModuleStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlModuleStore")
            .field("data_dir", &self.data_dir)
            .finish_non_exhaustive()
    }
}

impl XmlModuleStore<Unloaded> {
    /// Opens a data directory, reading `modulestore.toml` if it exists.
    #[must_use]
    pub fn new(data_dir: PathBuf) -> Self {
        let config = load_config(&data_dir);
        Self::with_config(data_dir, config)
    }

    /// Opens a data directory with an explicit configuration.
    #[must_use]
    pub fn with_config(data_dir: PathBuf, config: Config) -> Self {
        Self {
            data_dir,
            state: Unloaded {
                config,
                registry: Arc::new(ClassRegistry::builtin()),
                default_class: None,
                course_list: None,
            },
        }
    }

    /// Forces every descriptor to be built during [`Self::load_all`].
    #[must_use]
    pub fn eager(mut self, eager: bool) -> Self {
        self.state.config.eager = eager;
        self
    }

    /// Sets the class used for tags the registry does not know.
    ///
    /// This takes precedence over a `default_class` named in the config.
    #[must_use]
    pub fn default_class(mut self, class: Arc<dyn DescriptorClass>) -> Self {
        self.state.default_class = Some(class);
        self
    }

    /// Replaces the tag to class resolver.
    #[must_use]
    pub fn registry(mut self, registry: impl ClassResolver + 'static) -> Self {
        self.state.registry = Arc::new(registry);
        self
    }

    /// Replaces the source of [`XmlModuleStore::get_courses`].
    #[must_use]
    pub fn course_list(mut self, course_list: impl CourseList + 'static) -> Self {
        self.state.course_list = Some(Box::new(course_list));
        self
    }

    /// Load every course in the data directory.
    ///
    /// # Errors
    ///
    /// Fails if the data directory cannot be listed or the configured default
    /// class is unknown. If a course fails to load, the whole load fails,
    /// unless `skip_invalid_courses` is set in the configuration, in which
    /// case the course is logged, recorded and skipped.
    #[instrument(level = "debug", skip(self), fields(data_dir = %self.data_dir.display()))]
    pub fn load_all(self) -> Result<XmlModuleStore<Loaded>, StoreLoadError> {
        let Unloaded {
            config,
            registry,
            default_class,
            course_list,
        } = self.state;

        let default_class = match (default_class, config.default_class()) {
            (Some(class), _) => Some(class),
            (None, Some(name)) => Some(
                registry
                    .class_named(name)
                    .ok_or_else(|| StoreLoadError::UnknownDefaultClass(name.to_string()))?,
            ),
            (None, None) => None,
        };

        let course_dirs = collect_course_dirs(&self.data_dir)?;
        tracing::debug!("found {} course directories", course_dirs.len());

        let parser = TreeParser::new(registry.as_ref(), default_class.as_ref());
        let results: Vec<_> = course_dirs
            .par_iter()
            .map(|dir| load_course_dir(dir, &config, parser))
            .collect();

        let course_list = course_list.unwrap_or_else(|| Box::new(config.courses().to_vec()));

        let mut loaded = Loaded {
            config,
            registry,
            default_class,
            course_list,
            index: ModuleIndex::new(),
            roots: Vec::new(),
            resources: HashMap::new(),
            skipped: Vec::new(),
        };

        for (dir, result) in course_dirs.into_iter().zip(results) {
            match result {
                Ok(course) => loaded.register(&dir, course),
                Err(source) if loaded.config.skip_invalid_courses => {
                    tracing::warn!("Skipping course at {}: {source}", dir.display());
                    loaded.skipped.push((dir, source));
                }
                Err(source) => return Err(StoreLoadError::Course { path: dir, source }),
            }
        }

        tracing::info!(
            "Loaded {} courses ({} nodes) from {}",
            loaded.roots.len(),
            loaded.index.len(),
            self.data_dir.display()
        );

        Ok(XmlModuleStore {
            data_dir: self.data_dir,
            state: loaded,
        })
    }
}

impl Loaded {
    /// Merges a parsed course. A course that is already loaded is replaced
    /// wholesale, so nodes dropped from its XML do not linger.
    fn register(&mut self, dir: &Path, course: LoadedCourse) {
        let LoadedCourse {
            root,
            index,
            resources,
        } = course;

        let previous = self.roots.iter().position(|r| r.same_course(&root));
        if let Some(position) = previous {
            let stale = self.roots.remove(position);
            let removed = self.index.remove_course(&stale);
            tracing::info!("Replacing course {stale} ({removed} nodes dropped)");
        }
        self.skipped.retain(|(skipped, _)| skipped != dir);

        let key = (root.org().to_string(), root.course().to_string());
        self.resources.insert(key, resources);
        self.index.extend(index);
        self.roots.push(root);
    }
}

impl XmlModuleStore<Loaded> {
    /// Loads one more course directory, named relative to the data directory.
    ///
    /// Returns the location of the course root.
    ///
    /// # Errors
    ///
    /// Fails if the course cannot be read or parsed. Nothing from a failed
    /// course is registered.
    ///
    /// Loading a course that is already loaded replaces it: its previous
    /// nodes are dropped before the new ones are merged.
    #[instrument(level = "debug", skip(self))]
    pub fn load_course(&mut self, course_dir: &str) -> Result<Location, CourseLoadError> {
        let dir = self.data_dir.join(course_dir);
        let parser = TreeParser::new(
            self.state.registry.as_ref(),
            self.state.default_class.as_ref(),
        );
        let course = load_course_dir(&dir, &self.state.config, parser)?;
        let root = course.root.clone();
        self.state.register(&dir, course);
        Ok(root)
    }

    /// Returns the descriptor at `location`.
    ///
    /// `location` can be anything that converts into a [`Location`]: a
    /// location by value or reference, a
    /// [`PartialLocation`](crate::domain::PartialLocation) or a string in
    /// `i4x://` form. The revision is part of the key; there is no "latest
    /// revision" resolution.
    ///
    /// # Errors
    ///
    /// Returns [`ItemError::InsufficientSpecification`] if a component other
    /// than the revision is missing, [`ItemError::InvalidLocation`] if the
    /// input is not a location at all and [`ItemError::NotFound`] if nothing
    /// is stored there.
    pub fn get_item<L>(&self, location: L) -> Result<&Descriptor, ItemError>
    where
        L: TryInto<Location>,
        ItemError: From<L::Error>,
    {
        let location = location.try_into()?;
        self.state.index.get(&location)
    }

    /// Returns the children of the node at `location`, in document order.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::get_item`] for the parent or any child.
    pub fn get_children<L>(&self, location: L) -> Result<Vec<&Descriptor>, ItemError>
    where
        L: TryInto<Location>,
        ItemError: From<L::Error>,
    {
        self.get_item(location)?
            .children()
            .iter()
            .map(|child| self.state.index.get(child))
            .collect()
    }

    /// Returns the configured course identifiers.
    ///
    /// This comes from the course list supplied at construction (or the
    /// config), not from the courses that were actually loaded. See
    /// [`Self::loaded_courses`] for those.
    #[must_use]
    pub fn get_courses(&self) -> Vec<String> {
        self.state.course_list.courses()
    }

    /// The root location of every course that was loaded, in load order.
    #[must_use]
    pub fn loaded_courses(&self) -> &[Location] {
        &self.state.roots
    }

    /// Course directories that failed to load and were skipped.
    #[must_use]
    pub fn skipped_courses(&self) -> &[(PathBuf, CourseLoadError)] {
        &self.state.skipped
    }

    /// The resource files of the course that `location` belongs to.
    #[must_use]
    pub fn resources(&self, location: &Location) -> Option<&CourseResources> {
        self.state
            .resources
            .get(&(location.org().to_string(), location.course().to_string()))
    }

    /// The underlying index.
    #[must_use]
    pub const fn index(&self) -> &ModuleIndex {
        &self.state.index
    }

    /// The configuration the store was loaded with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.state.config
    }

    /// Always fails: this store is read-only.
    ///
    /// # Errors
    ///
    /// Always returns [`ReadOnlyError`].
    pub const fn create_item(&self, _location: &Location) -> Result<(), ReadOnlyError> {
        Err(ReadOnlyError::new("create_item"))
    }

    /// Always fails: this store is read-only.
    ///
    /// # Errors
    ///
    /// Always returns [`ReadOnlyError`].
    pub const fn update_item(
        &self,
        _location: &Location,
        _data: &str,
    ) -> Result<(), ReadOnlyError> {
        Err(ReadOnlyError::new("update_item"))
    }

    /// Always fails: this store is read-only.
    ///
    /// # Errors
    ///
    /// Always returns [`ReadOnlyError`].
    pub const fn update_children(
        &self,
        _location: &Location,
        _children: &[Location],
    ) -> Result<(), ReadOnlyError> {
        Err(ReadOnlyError::new("update_children"))
    }

    /// Always fails: this store is read-only.
    ///
    /// # Errors
    ///
    /// Always returns [`ReadOnlyError`].
    pub const fn update_metadata(
        &self,
        _location: &Location,
        _metadata: &BTreeMap<String, String>,
    ) -> Result<(), ReadOnlyError> {
        Err(ReadOnlyError::new("update_metadata"))
    }
}

impl ModuleStore for XmlModuleStore<Loaded> {
    fn get_item(&self, location: &Location) -> Result<&Descriptor, ItemError> {
        self.state.index.get(location)
    }

    fn get_courses(&self) -> Vec<String> {
        self.state.course_list.courses()
    }

    fn create_item(&self, location: &Location) -> Result<(), ReadOnlyError> {
        Self::create_item(self, location)
    }

    fn update_item(&self, location: &Location, data: &str) -> Result<(), ReadOnlyError> {
        Self::update_item(self, location, data)
    }

    fn update_children(
        &self,
        location: &Location,
        children: &[Location],
    ) -> Result<(), ReadOnlyError> {
        Self::update_children(self, location, children)
    }

    fn update_metadata(
        &self,
        location: &Location,
        metadata: &BTreeMap<String, String>,
    ) -> Result<(), ReadOnlyError> {
        Self::update_metadata(self, location, metadata)
    }
}

fn load_config(data_dir: &Path) -> Config {
    let path = data_dir.join(crate::domain::CONFIG_FILE);
    Config::load(&path).unwrap_or_else(|e| {
        tracing::debug!("Failed to load config: {e}");
        Config::default()
    })
}

/// Lists the immediate subdirectories of `data_dir` in name order. Hidden
/// directories (`.git` and the like) are not courses.
fn collect_course_dirs(data_dir: &Path) -> Result<Vec<PathBuf>, StoreLoadError> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(data_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| StoreLoadError::DataDir {
            path: data_dir.to_path_buf(),
            source,
        })?;
        if !entry.path().is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            tracing::debug!("Skipping hidden directory {}", entry.path().display());
            continue;
        }
        dirs.push(entry.into_path());
    }
    Ok(dirs)
}

struct LoadedCourse {
    root: Location,
    index: ModuleIndex,
    resources: CourseResources,
}

fn load_course_dir(
    dir: &Path,
    config: &Config,
    parser: TreeParser<'_>,
) -> Result<LoadedCourse, CourseLoadError> {
    let path = dir.join(config.course_file());
    let text = fs::read_to_string(&path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => CourseLoadError::MissingCourseFile(path.clone()),
        _ => CourseLoadError::Io {
            path: path.clone(),
            source,
        },
    })?;

    let root = read_xml(&text)?;
    let org = root
        .attribute("org")
        .ok_or(CourseLoadError::MissingAttribute("org"))?
        .to_string();
    let course = root
        .attribute("course")
        .ok_or(CourseLoadError::MissingAttribute("course"))?
        .to_string();

    let parsed = parser.parse_element(root, &org, &course)?;
    if config.eager {
        parsed.index.materialize_all();
    }

    tracing::debug!(
        "Loaded course {org}/{course} from {} ({} nodes)",
        dir.display(),
        parsed.index.len()
    );

    Ok(LoadedCourse {
        root: parsed.root,
        index: parsed.index,
        resources: CourseResources::new(dir.to_path_buf()),
    })
}

/// Errors that can occur when loading a data directory.
#[derive(Debug, thiserror::Error)]
pub enum StoreLoadError {
    /// The data directory could not be listed.
    #[error("failed to read data directory {}", path.display())]
    DataDir {
        /// The data directory.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: walkdir::Error,
    },

    /// The configured default class is not known to the registry.
    #[error("unknown default class '{0}'")]
    UnknownDefaultClass(String),

    /// A course failed to load.
    #[error("failed to load course from {}", path.display())]
    Course {
        /// The course directory.
        path: PathBuf,
        /// Why the course failed.
        #[source]
        source: CourseLoadError,
    },
}

/// A mutation was attempted on a read-only store.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("unsupported operation {operation}: store is read-only")]
pub struct ReadOnlyError {
    operation: &'static str,
}

impl ReadOnlyError {
    const fn new(operation: &'static str) -> Self {
        Self { operation }
    }

    /// The name of the rejected operation.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }
}

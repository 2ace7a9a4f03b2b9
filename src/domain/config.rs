use std::path::Path;

use serde::{Deserialize, Serialize};

/// The name of the configuration file, relative to the data directory.
pub const CONFIG_FILE: &str = "modulestore.toml";

/// Configuration for an XML module store.
///
/// This struct holds settings that control how course directories are loaded
/// and which courses the store advertises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// The course identifiers returned by `get_courses`.
    ///
    /// This list is configured, not derived from the loaded courses.
    courses: Vec<String>,

    /// Whether every descriptor is built at load time.
    ///
    /// When `false` (default), descriptors are built on first access.
    pub eager: bool,

    /// The name of the class used for tags with no registered class.
    default_class: Option<String>,

    /// Whether a course that fails to load is skipped (and logged) rather than
    /// aborting the whole load.
    pub skip_invalid_courses: bool,

    /// The name of the entry document in each course directory.
    course_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            courses: Vec::new(),
            eager: false,
            default_class: None,
            skip_invalid_courses: false,
            course_file: default_course_file(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the configured course identifiers.
    #[must_use]
    pub fn courses(&self) -> &[String] {
        &self.courses
    }

    /// Replaces the configured course identifiers.
    pub fn set_courses(&mut self, courses: Vec<String>) {
        self.courses = courses;
    }

    /// Returns the name of the default class, if configured.
    #[must_use]
    pub fn default_class(&self) -> Option<&str> {
        self.default_class.as_deref()
    }

    /// Sets the name of the default class.
    pub fn set_default_class(&mut self, name: Option<String>) {
        self.default_class = name;
    }

    /// Returns the name of the entry document in each course directory.
    #[must_use]
    pub fn course_file(&self) -> &str {
        &self.course_file
    }
}

fn default_course_file() -> String {
    "course.xml".to_string()
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        courses: Vec<String>,

        #[serde(default)]
        eager: bool,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_class: Option<String>,

        #[serde(default)]
        skip_invalid_courses: bool,

        /// The entry document of each course directory.
        #[serde(default = "default_course_file")]
        course_file: String,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                courses,
                eager,
                default_class,
                skip_invalid_courses,
                course_file,
            } => Self {
                courses,
                eager,
                default_class,
                skip_invalid_courses,
                course_file,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            courses: config.courses,
            eager: config.eager,
            default_class: config.default_class,
            skip_invalid_courses: config.skip_invalid_courses,
            course_file: config.course_file,
        }
    }
}

//! Access to the auxiliary files of a course (images, handouts, etc.).

use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};

/// A read-only view of one course directory.
///
/// Paths are resolved relative to the course directory. Absolute paths and
/// paths that climb out of the directory are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseResources {
    root: PathBuf,
}

impl CourseResources {
    /// Creates a view rooted at `root`.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The course directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `relative` to a path inside the course directory.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::OutsideCourse`] if `relative` is absolute or
    /// contains `..`.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, ResourceError> {
        let path = Path::new(relative);
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if escapes || relative.is_empty() {
            return Err(ResourceError::OutsideCourse(relative.to_string()));
        }

        Ok(self.root.join(path))
    }

    /// Returns `true` if `relative` names an existing file in the course.
    #[must_use]
    pub fn exists(&self, relative: &str) -> bool {
        self.resolve(relative).is_ok_and(|path| path.is_file())
    }

    /// Reads a resource as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Fails if the path is rejected, missing, unreadable or not UTF-8.
    pub fn read_to_string(&self, relative: &str) -> Result<String, ResourceError> {
        let path = self.resolve(relative)?;
        fs::read_to_string(&path).map_err(|e| not_found_or_io(e, path))
    }

    /// Reads a resource as raw bytes.
    ///
    /// # Errors
    ///
    /// Fails if the path is rejected, missing or unreadable.
    pub fn read(&self, relative: &str) -> Result<Vec<u8>, ResourceError> {
        let path = self.resolve(relative)?;
        fs::read(&path).map_err(|e| not_found_or_io(e, path))
    }
}

fn not_found_or_io(error: io::Error, path: PathBuf) -> ResourceError {
    match error.kind() {
        io::ErrorKind::NotFound => ResourceError::NotFound(path),
        _ => ResourceError::Io(error),
    }
}

/// Errors that can occur when reading course resources.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// The path would leave the course directory.
    #[error("resource path '{0}' is outside the course directory")]
    OutsideCourse(String),

    /// No file exists at the path.
    #[error("resource {} not found", .0.display())]
    NotFound(PathBuf),

    /// The file could not be read.
    #[error("failed to read resource: {0}")]
    Io(#[from] io::Error),
}

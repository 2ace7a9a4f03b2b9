use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
    sync::LazyLock,
};

use non_empty_string::NonEmptyString;
use regex::Regex;
use serde::Serialize;

/// The scheme used by the string form of a [`Location`].
pub const SCHEME: &str = "i4x";

static INVALID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w.-]").expect("static regex is valid"));

static REPEATED_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("static regex is valid"));

/// Converts an arbitrary display name into a string that is safe to use as a
/// [`Location`] component.
///
/// Every character other than word characters, `.` and `-` is replaced by an
/// underscore, and runs of underscores are collapsed into one. The function is
/// idempotent: `clean(&clean(s)) == clean(s)`.
///
/// ```
/// use modulestore::domain::location::clean;
///
/// assert_eq!(clean("My Problem"), "My_Problem");
/// assert_eq!(clean("a / b"), "a_b");
/// ```
#[must_use]
pub fn clean(name: &str) -> String {
    let replaced = INVALID_CHARS.replace_all(name, "_");
    REPEATED_UNDERSCORES
        .replace_all(&replaced, "_")
        .into_owned()
}

/// The identity of a content node.
///
/// A location is made of an organisation, a course, a category (the XML tag
/// of the node), a slug and an optional revision. Equality and hashing cover
/// all five components, so two locations that differ only by revision are
/// distinct keys. An absent revision means "unspecified".
///
/// The string form is `i4x://{org}/{course}/{category}/{slug}[/{revision}]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    org: NonEmptyString,
    course: NonEmptyString,
    category: NonEmptyString,
    slug: NonEmptyString,
    revision: Option<String>,
}

impl Location {
    /// Creates a location from its components.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::InsufficientSpecification`] if any component
    /// other than the revision is empty.
    pub fn new(
        org: impl Into<String>,
        course: impl Into<String>,
        category: impl Into<String>,
        slug: impl Into<String>,
        revision: Option<String>,
    ) -> Result<Self, LocationError> {
        Ok(Self {
            org: required("org", org.into())?,
            course: required("course", course.into())?,
            category: required("category", category.into())?,
            slug: required("slug", slug.into())?,
            revision,
        })
    }

    /// The organisation that owns the course.
    #[must_use]
    pub fn org(&self) -> &str {
        self.org.as_str()
    }

    /// The course identifier.
    #[must_use]
    pub fn course(&self) -> &str {
        self.course.as_str()
    }

    /// The category of the node, which is its XML tag name.
    #[must_use]
    pub fn category(&self) -> &str {
        self.category.as_str()
    }

    /// The slug that identifies the node within its course and category.
    #[must_use]
    pub fn slug(&self) -> &str {
        self.slug.as_str()
    }

    /// The revision, if one was specified.
    #[must_use]
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Returns a copy of this location pinned to the given revision.
    #[must_use]
    pub fn with_revision(&self, revision: impl Into<String>) -> Self {
        Self {
            revision: Some(revision.into()),
            ..self.clone()
        }
    }

    /// Returns `true` if both locations belong to the same course.
    #[must_use]
    pub fn same_course(&self, other: &Self) -> bool {
        self.org == other.org && self.course == other.course
    }
}

fn required(field: &'static str, value: String) -> Result<NonEmptyString, LocationError> {
    NonEmptyString::new(value).map_err(|_| LocationError::InsufficientSpecification(field))
}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.org.as_str().hash(state);
        self.course.as_str().hash(state);
        self.category.as_str().hash(state);
        self.slug.as_str().hash(state);
        self.revision.hash(state);
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{SCHEME}://{}/{}/{}/{}",
            self.org.as_str(),
            self.course.as_str(),
            self.category.as_str(),
            self.slug.as_str()
        )?;
        if let Some(revision) = &self.revision {
            write!(f, "/{revision}")?;
        }
        Ok(())
    }
}

impl Serialize for Location {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// A loosely specified location, where any component may be missing.
///
/// This is normalised into a [`Location`] with [`TryFrom`], which fails if
/// anything other than the revision is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialLocation {
    /// The organisation.
    pub org: Option<String>,
    /// The course identifier.
    pub course: Option<String>,
    /// The category (XML tag name).
    pub category: Option<String>,
    /// The slug.
    pub slug: Option<String>,
    /// The revision.
    pub revision: Option<String>,
}

impl TryFrom<PartialLocation> for Location {
    type Error = LocationError;

    fn try_from(partial: PartialLocation) -> Result<Self, Self::Error> {
        let PartialLocation {
            org,
            course,
            category,
            slug,
            revision,
        } = partial;

        Ok(Self {
            org: required("org", org.unwrap_or_default())?,
            course: required("course", course.unwrap_or_default())?,
            category: required("category", category.unwrap_or_default())?,
            slug: required("slug", slug.unwrap_or_default())?,
            revision,
        })
    }
}

impl From<Location> for PartialLocation {
    fn from(location: Location) -> Self {
        let Location {
            org,
            course,
            category,
            slug,
            revision,
        } = location;

        Self {
            org: Some(org.as_str().to_owned()),
            course: Some(course.as_str().to_owned()),
            category: Some(category.as_str().to_owned()),
            slug: Some(slug.as_str().to_owned()),
            revision,
        }
    }
}

impl From<&Location> for Location {
    fn from(location: &Location) -> Self {
        location.clone()
    }
}

impl FromStr for Location {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(SCHEME)
            .and_then(|rest| rest.strip_prefix("://"))
            .ok_or_else(|| LocationError::Invalid(s.to_string()))?;

        let mut segments = rest.split('/');
        let mut next = || segments.next().filter(|segment| !segment.is_empty());

        let partial = PartialLocation {
            org: next().map(str::to_owned),
            course: next().map(str::to_owned),
            category: next().map(str::to_owned),
            slug: next().map(str::to_owned),
            revision: next().map(str::to_owned),
        };

        if segments.next().is_some() {
            return Err(LocationError::Invalid(s.to_string()));
        }

        Self::try_from(partial)
    }
}

impl TryFrom<&str> for Location {
    type Error = LocationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}

impl TryFrom<&String> for Location {
    type Error = LocationError;

    fn try_from(value: &String) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}

/// Errors that can occur when constructing a [`Location`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LocationError {
    /// A required component was missing or empty.
    #[error("insufficiently specified location: missing {0}")]
    InsufficientSpecification(&'static str),

    /// The input could not be interpreted as a location at all.
    #[error("invalid location '{0}'")]
    Invalid(String),
}

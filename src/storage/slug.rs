//! Deterministic slug allocation for a single course load.

use std::collections::HashSet;

use crate::{domain::location::clean, storage::xml::XmlElement};

/// Assigns a slug to every content element of one course.
///
/// One allocator is shared by the whole tree of a course, so slugs it
/// generates are unique across that course load. Its state is discarded when
/// the load completes.
///
/// The rules, applied per element:
///
/// 1. An explicit, non-empty `slug` attribute is used verbatim and recorded.
///    Explicit duplicates are not detected.
/// 2. Otherwise a non-empty `name` attribute is cleaned into a candidate.
/// 3. Otherwise the candidate is `{tag}_{n}`, where `n` is the next value of
///    the unnamed-node counter.
/// 4. While the candidate is already used, the counter is incremented and
///    `_{n}` is appended to the original candidate.
#[derive(Debug, Default)]
pub struct SlugAllocator {
    unnamed: usize,
    used: HashSet<String>,
}

impl SlugAllocator {
    /// Creates an allocator with a fresh counter and no used slugs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slug for `element` and marks it as used.
    pub fn allocate(&mut self, element: &XmlElement) -> String {
        if let Some(slug) = element.attribute("slug").filter(|slug| !slug.is_empty()) {
            self.used.insert(slug.to_string());
            return slug.to_string();
        }

        let candidate = element
            .attribute("name")
            .map(clean)
            .filter(|cleaned| !cleaned.is_empty())
            .unwrap_or_else(|| {
                self.unnamed += 1;
                format!("{}_{}", element.tag(), self.unnamed)
            });

        let mut slug = candidate.clone();
        while self.used.contains(&slug) {
            self.unnamed += 1;
            slug = format!("{candidate}_{}", self.unnamed);
        }

        tracing::trace!(tag = element.tag(), slug = %slug, "allocated slug");
        self.used.insert(slug.clone());
        slug
    }

    /// Returns `true` if `slug` has been handed out or seen during this load.
    #[must_use]
    pub fn is_used(&self, slug: &str) -> bool {
        self.used.contains(slug)
    }
}

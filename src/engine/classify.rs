use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Identity of a rendered section.
///
/// Equality and hashing use `id` only; `display_name` is cosmetic and `rank`
/// only orders a section relative to others when the engine has to create a
/// header for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionKey {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub rank: i64,
}

impl SectionKey {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        SectionKey {
            id: id.into(),
            display_name: display_name.into(),
            rank: 0,
        }
    }

    pub fn with_rank(mut self, rank: i64) -> Self {
        self.rank = rank;
        self
    }

    /// Ordering used when placing a section that has no header yet
    pub(crate) fn sorts_before(&self, other: &SectionKey) -> bool {
        (self.rank, &self.id) < (other.rank, &other.id)
    }
}

impl PartialEq for SectionKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SectionKey {}

impl Hash for SectionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name)
    }
}

/// Maps an item to the section it currently belongs to.
///
/// Must be deterministic for a given item state and free of side effects.
pub trait SectionClassifier<T: ?Sized> {
    fn classify(&self, item: &T) -> SectionKey;
}

impl<T: ?Sized, F> SectionClassifier<T> for F
where
    F: Fn(&T) -> SectionKey,
{
    fn classify(&self, item: &T) -> SectionKey {
        self(item)
    }
}

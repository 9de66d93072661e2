//! Relationships: named output channels of a stage
//!
//! A stage declares its relationships once, at construction, as a
//! [`RelationshipSet`]. The set is an immutable value; cloning it shares the
//! same backing slice.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A named output channel
///
/// Identity is the name alone; the description is informational.
#[derive(Debug, Clone)]
pub struct Relationship {
    name: Cow<'static, str>,
    description: Cow<'static, str>,
}

impl Relationship {
    /// Create a relationship from static strings (usable in `const`)
    pub const fn from_static(name: &'static str, description: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            description: Cow::Borrowed(description),
        }
    }

    /// Create a relationship from owned strings
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            description: Cow::Owned(description.into()),
        }
    }

    /// Relationship name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Relationship {}

impl Hash for Relationship {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for Relationship {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Relationship {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Immutable, name-ordered set of relationships
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipSet {
    relationships: Arc<[Relationship]>,
}

impl RelationshipSet {
    /// Build a set; duplicates by name collapse to the first occurrence
    pub fn new(relationships: impl IntoIterator<Item = Relationship>) -> Self {
        let mut list: Vec<Relationship> = Vec::new();
        for rel in relationships {
            if !list.contains(&rel) {
                list.push(rel);
            }
        }
        list.sort();
        Self {
            relationships: list.into(),
        }
    }

    /// Whether `relationship` is declared in this set
    pub fn contains(&self, relationship: &Relationship) -> bool {
        self.relationships.binary_search(relationship).is_ok()
    }

    /// Find a relationship by name
    pub fn get(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name() == name)
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }

    /// Names in order
    pub fn names(&self) -> Vec<&str> {
        self.relationships.iter().map(Relationship::name).collect()
    }

    /// Number of relationships
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}

impl<'a> IntoIterator for &'a RelationshipSet {
    type Item = &'a Relationship;
    type IntoIter = std::slice::Iter<'a, Relationship>;

    fn into_iter(self) -> Self::IntoIter {
        self.relationships.iter()
    }
}

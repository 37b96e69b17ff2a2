//! Key and structural path assignment
//!
//! Keys are unique within a sibling scope; structural paths address durable
//! build state for a component occurrence and stay stable across rebuilds
//! that do not change sibling composition.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Sequence of element keys from the serialized root down to a node.
pub type KeyPath = Vec<String>;

/// Allocates sibling-unique names: the first occurrence of a base name is
/// returned unchanged, later occurrences get a numeric suffix ("Server",
/// "Server1", "Server2", ...).
#[derive(Debug, Default)]
pub struct UniqueNames {
    counts: HashMap<String, usize>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, base: &str) -> String {
        match self.counts.get_mut(base) {
            None => {
                self.counts.insert(base.to_string(), 1);
                base.to_string()
            }
            Some(next) => {
                let name = format!("{base}{next}");
                *next += 1;
                name
            }
        }
    }
}

/// Dotted path of component type names from the root to a node, each segment
/// disambiguated by [`UniqueNames`] within its sibling scope.
///
/// Equivalent component occurrences resolve to the same path across rebuilds
/// even as the exact tree shape shifts, so the path is the address of the
/// occurrence's durable build state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatePath(String);

impl StatePath {
    /// Path of the root scope, before any component has been entered.
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn child(&self, segment: &str) -> Self {
        if self.0.is_empty() {
            Self(segment.to_string())
        } else {
            Self(format!("{}.{}", self.0, segment))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StatePath {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_names_suffixing() {
        let mut names = UniqueNames::new();
        assert_eq!(names.assign("Empty"), "Empty");
        assert_eq!(names.assign("Empty"), "Empty1");
        assert_eq!(names.assign("Dummy"), "Dummy");
        assert_eq!(names.assign("Dummy"), "Dummy1");
        assert_eq!(names.assign("Empty"), "Empty2");
    }

    #[test]
    fn test_state_path_child() {
        let root = StatePath::empty();
        let group = root.child("Group");
        let svc = group.child("Service1");
        assert_eq!(group.as_str(), "Group");
        assert_eq!(svc.as_str(), "Group.Service1");
    }
}

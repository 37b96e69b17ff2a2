//! Element props
//!
//! Props are an ordered name -> value map, frozen once the owning element has
//! been sealed into the arena. Values are opaque JSON data or handle
//! references; children are carried separately on the element and never
//! appear in the map itself.

use crate::arena::HandleId;
use serde_json::Value;
use std::collections::BTreeMap;

/// A single prop value: opaque JSON data, or a reference to a handle cell.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Data(Value),
    Handle(HandleId),
}

impl PropValue {
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            PropValue::Data(v) => Some(v),
            PropValue::Handle(_) => None,
        }
    }

    pub fn as_handle(&self) -> Option<HandleId> {
        match self {
            PropValue::Data(_) => None,
            PropValue::Handle(h) => Some(*h),
        }
    }
}

impl From<Value> for PropValue {
    fn from(v: Value) -> Self {
        PropValue::Data(v)
    }
}

impl From<HandleId> for PropValue {
    fn from(h: HandleId) -> Self {
        PropValue::Handle(h)
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Data(Value::String(s.to_string()))
    }
}

impl From<i64> for PropValue {
    fn from(n: i64) -> Self {
        PropValue::Data(Value::from(n))
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Data(Value::Bool(b))
    }
}

/// Ordered prop map. Mutable only while an element is being assembled;
/// elements expose props by shared reference exclusively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    values: BTreeMap<String, PropValue>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.values.get(name)
    }

    /// JSON data stored under `name`, if the prop exists and is data.
    pub fn data(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(PropValue::as_data)
    }

    /// Handle stored under `name`, if the prop exists and is a handle.
    pub fn handle(&self, name: &str) -> Option<HandleId> {
        self.get(name).and_then(PropValue::as_handle)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Shallow-merge `defaults` under the explicitly set props: a default is
    /// taken only for names the explicit props do not already carry.
    pub fn merge_defaults(&mut self, defaults: Props) {
        for (name, value) in defaults.values {
            self.values.entry(name).or_insert(value);
        }
    }

    /// Shallow-merge `overrides` over these props, replacing on collision.
    pub fn merge_over(&mut self, overrides: Props) {
        for (name, value) in overrides.values {
            self.values.insert(name, value);
        }
    }
}

impl FromIterator<(String, PropValue)> for Props {
    fn from_iter<I: IntoIterator<Item = (String, PropValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_merge_under_explicit() {
        let mut props = Props::new();
        props.insert("image", "nginx:1.25");

        let mut defaults = Props::new();
        defaults.insert("image", "nginx:latest");
        defaults.insert("replicas", 1);

        props.merge_defaults(defaults);
        assert_eq!(props.data("image"), Some(&json!("nginx:1.25")));
        assert_eq!(props.data("replicas"), Some(&json!(1)));
    }

    #[test]
    fn test_merge_over_replaces() {
        let mut props = Props::new();
        props.insert("replicas", 1);

        let mut overrides = Props::new();
        overrides.insert("replicas", 3);
        props.merge_over(overrides);

        assert_eq!(props.data("replicas"), Some(&json!(3)));
    }
}

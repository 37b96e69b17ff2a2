//! Style selectors
//!
//! A selector is a predicate over a candidate element's component type and
//! prop shape. Rules own one selector each; matching never looks at an
//! element's position in the tree, only at the element itself.

use arbor_dom::Element;
use serde_json::Value;

/// Predicate over component type and prop shape.
#[derive(Debug, Clone)]
pub enum Selector {
    /// Matches every element.
    Any,
    /// Matches elements whose component type name equals the given name.
    Type(String),
    /// Matches elements carrying the named prop (data or handle).
    HasProp(String),
    /// Matches elements whose named prop is data equal to the given value.
    PropEquals(String, Value),
    /// Matches when every inner selector matches.
    AllOf(Vec<Selector>),
    /// Matches when any inner selector matches.
    AnyOf(Vec<Selector>),
    /// Matches when the inner selector does not.
    Not(Box<Selector>),
}

impl Selector {
    pub fn component(name: impl Into<String>) -> Self {
        Selector::Type(name.into())
    }

    pub fn prop_equals(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Selector::PropEquals(name.into(), value.into())
    }

    pub fn matches(&self, element: &Element) -> bool {
        match self {
            Selector::Any => true,
            Selector::Type(name) => element.type_name() == name,
            Selector::HasProp(name) => element.props().contains(name),
            Selector::PropEquals(name, value) => element.props().data(name) == Some(value),
            Selector::AllOf(inner) => inner.iter().all(|s| s.matches(element)),
            Selector::AnyOf(inner) => inner.iter().any(|s| s.matches(element)),
            Selector::Not(inner) => !inner.matches(element),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_dom::{DomArena, Element, Group};
    use serde_json::json;

    #[test]
    fn test_selector_matching() {
        let mut arena = DomArena::new();
        let el = Element::builder(Group::shared())
            .prop("tier", "web")
            .build(&mut arena)
            .unwrap();
        let el = arena.element(el).unwrap();

        assert!(Selector::Any.matches(el));
        assert!(Selector::component("Group").matches(el));
        assert!(!Selector::component("Service").matches(el));
        assert!(Selector::HasProp("tier".into()).matches(el));
        assert!(Selector::prop_equals("tier", json!("web")).matches(el));
        assert!(!Selector::prop_equals("tier", json!("db")).matches(el));
        assert!(Selector::AllOf(vec![
            Selector::component("Group"),
            Selector::Not(Box::new(Selector::HasProp("replicas".into()))),
        ])
        .matches(el));
    }
}

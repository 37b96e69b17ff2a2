//! Elements and the element builder
//!
//! An element is one immutable node of the topology tree: a component
//! reference, frozen props, normalized children, a sibling-unique key, and
//! the handle cell created for it. Style bookkeeping lives in an auxiliary
//! record next to the props, never inside them.

use crate::arena::{DomArena, ElementId, HandleId};
use crate::component::{ComponentKind, ComponentRef};
use crate::error::Result;
use crate::props::{PropValue, Props};
use std::collections::HashSet;
use std::fmt;

/// Per-element style bookkeeping: the rules that have already consumed this
/// element (or the substitution chain it came from) and the stop flag set by
/// a rule to block further matching on its output.
#[derive(Debug, Clone, Default)]
pub struct StyleMarks {
    rules: HashSet<usize>,
    stop: bool,
}

impl StyleMarks {
    pub fn contains(&self, rule: usize) -> bool {
        self.rules.contains(&rule)
    }

    pub fn stop(&self) -> bool {
        self.stop
    }

    pub(crate) fn insert(&mut self, rule: usize) {
        self.rules.insert(rule);
    }

    pub(crate) fn set_stop(&mut self) {
        self.stop = true;
    }

    pub(crate) fn absorb(&mut self, other: &StyleMarks) {
        self.rules.extend(other.rules.iter().copied());
        self.stop |= other.stop;
    }
}

/// One immutable node of the tree, stored in a [`DomArena`].
pub struct Element {
    pub(crate) component: ComponentRef,
    pub(crate) props: Props,
    pub(crate) children: Vec<ElementId>,
    pub(crate) key: Option<String>,
    pub(crate) handle: HandleId,
    pub(crate) marks: StyleMarks,
}

impl Element {
    /// Start assembling an element of `component`.
    pub fn builder(component: ComponentRef) -> ElementBuilder {
        ElementBuilder::new(component)
    }

    pub fn component(&self) -> &ComponentRef {
        &self.component
    }

    pub fn type_name(&self) -> &str {
        self.component.type_name()
    }

    pub fn is_primitive(&self) -> bool {
        self.component.kind() == ComponentKind::Primitive
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Flattened, null-filtered children.
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    /// Sibling-unique key. `None` until the element has been mounted by a
    /// build pass, unless supplied by the caller at construction.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    pub fn marks(&self) -> &StyleMarks {
        &self.marks
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("type", &self.type_name())
            .field("key", &self.key)
            .field("props", &self.props)
            .field("children", &self.children)
            .field("handle", &self.handle)
            .finish()
    }
}

/// Assembles an element and seals it into the arena.
///
/// Positional children override any children supplied through the
/// `children`-prop channel; both are flattened and null-filtered into the
/// element's final child list. Defaults declared by the component are
/// shallow-merged under explicitly supplied props.
pub struct ElementBuilder {
    component: ComponentRef,
    props: Props,
    positional: Option<Vec<Option<ElementId>>>,
    prop_children: Option<Vec<Option<ElementId>>>,
    key: Option<String>,
    handle: Option<HandleId>,
}

impl ElementBuilder {
    pub fn new(component: ComponentRef) -> Self {
        Self {
            component,
            props: Props::new(),
            positional: None,
            prop_children: None,
            key: None,
            handle: None,
        }
    }

    /// User-supplied key; never overwritten by the engine.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name, value);
        self
    }

    pub fn props(mut self, props: Props) -> Self {
        self.props.merge_over(props);
        self
    }

    /// Attach an explicitly created handle instead of the implicit one.
    pub fn handle(mut self, handle: HandleId) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Append a positional child.
    pub fn child(mut self, child: ElementId) -> Self {
        self.positional.get_or_insert_with(Vec::new).push(Some(child));
        self
    }

    /// Append a positional child slot that may be empty; empty slots are
    /// dropped during normalization.
    pub fn maybe_child(mut self, child: Option<ElementId>) -> Self {
        self.positional.get_or_insert_with(Vec::new).push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = ElementId>) -> Self {
        self.positional
            .get_or_insert_with(Vec::new)
            .extend(children.into_iter().map(Some));
        self
    }

    /// Children supplied through the `children` prop channel; overridden by
    /// any positional child.
    pub fn children_prop(mut self, children: impl IntoIterator<Item = Option<ElementId>>) -> Self {
        self.prop_children = Some(children.into_iter().collect());
        self
    }

    /// Seal the element into the arena. The element's handle is associated
    /// here; props are frozen from this point on.
    pub fn build(self, arena: &mut DomArena) -> Result<ElementId> {
        let ElementBuilder {
            component,
            mut props,
            positional,
            prop_children,
            key,
            handle,
        } = self;

        props.merge_defaults(component.default_props());

        let children: Vec<ElementId> = positional
            .or(prop_children)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .collect();

        let handle = handle.unwrap_or_else(|| arena.new_handle(None));
        let element = Element {
            component,
            props,
            children,
            key,
            handle,
            marks: StyleMarks::default(),
        };
        let id = arena.insert_element(element);
        arena.associate(handle, Some(id))?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::Group;
    use serde_json::json;

    #[test]
    fn test_positional_children_override_prop_children() {
        let mut arena = DomArena::new();
        let a = Element::builder(Group::shared()).build(&mut arena).unwrap();
        let b = Element::builder(Group::shared()).build(&mut arena).unwrap();

        let parent = Element::builder(Group::shared())
            .children_prop([Some(a)])
            .child(b)
            .build(&mut arena)
            .unwrap();

        assert_eq!(arena.element(parent).unwrap().children(), &[b]);
    }

    #[test]
    fn test_children_drop_empty_slots() {
        let mut arena = DomArena::new();
        let a = Element::builder(Group::shared()).build(&mut arena).unwrap();

        let parent = Element::builder(Group::shared())
            .maybe_child(None)
            .maybe_child(Some(a))
            .maybe_child(None)
            .build(&mut arena)
            .unwrap();

        assert_eq!(arena.element(parent).unwrap().children(), &[a]);
    }

    #[test]
    fn test_user_key_preserved() {
        let mut arena = DomArena::new();
        let el = Element::builder(Group::shared())
            .key("api")
            .prop("replicas", json!(2))
            .build(&mut arena)
            .unwrap();

        let el = arena.element(el).unwrap();
        assert_eq!(el.key(), Some("api"));
        assert_eq!(el.props().data("replicas"), Some(&json!(2)));
    }
}

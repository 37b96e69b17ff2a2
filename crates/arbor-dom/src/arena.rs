//! The DOM arena
//!
//! Elements and handle cells live in flat tables owned by one deployment,
//! referenced by index. This breaks the ownership cycle between handles and
//! elements (a handle records which elements it points at, an element records
//! which handle was created for it) while keeping lookups O(1).

use crate::element::{Element, StyleMarks};
use crate::error::{DomError, HandleProtocolError, Result};
use crate::key::KeyPath;
use crate::props::Props;
use std::collections::HashMap;
use std::fmt;

/// Index of an element in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element-{}", self.0)
    }
}

/// Index of a handle cell in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub(crate) usize);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle-{}", self.0)
    }
}

/// One-shot write slot for the two handle protocol writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Slot {
    #[default]
    Unset,
    Set(Option<ElementId>),
}

/// A forward-reference cell.
///
/// `orig` is written by `associate` (the element the handle was created
/// for; `None` marks a handle intentionally reconstructed without a live
/// tree). `replacement` is written by `replace_target` when the associated
/// element is substituted during a build. Both writes are one-shot.
#[derive(Debug, Default)]
struct HandleCell {
    name: Option<String>,
    orig: Slot,
    replacement: Slot,
    unresolved_target: Option<KeyPath>,
}

/// Flat element/handle tables for one deployment.
#[derive(Debug, Default)]
pub struct DomArena {
    elements: Vec<Element>,
    handles: Vec<HandleCell>,
    /// Pass-scoped map from template element to its current instance,
    /// cleared at each pass start. Bookkeeping for cross-pass handle
    /// resolution, not part of the handle protocol.
    mounts: HashMap<ElementId, ElementId>,
}

impl DomArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    // ---- elements ----------------------------------------------------

    pub(crate) fn insert_element(&mut self, element: Element) -> ElementId {
        let id = ElementId(self.elements.len());
        self.elements.push(element);
        id
    }

    pub fn element(&self, id: ElementId) -> Result<&Element> {
        self.elements.get(id.0).ok_or(DomError::UnknownElement(id))
    }

    fn element_mut(&mut self, id: ElementId) -> Result<&mut Element> {
        self.elements
            .get_mut(id.0)
            .ok_or(DomError::UnknownElement(id))
    }

    /// New element with shallow-merged props, an optionally different child
    /// list, the original component reference, and a fresh handle. Style
    /// marks carry over so a substitution chain cannot re-trigger a rule.
    pub fn clone_element(
        &mut self,
        src: ElementId,
        overrides: Props,
        children: Option<Vec<ElementId>>,
    ) -> Result<ElementId> {
        let source = self.element(src)?;
        let component = source.component.clone();
        let mut props = source.props.clone();
        let key = source.key.clone();
        let marks = source.marks.clone();
        let children = children.unwrap_or_else(|| source.children.clone());
        props.merge_over(overrides);

        let handle = self.new_handle(None);
        let id = self.insert_element(Element {
            component,
            props,
            children,
            key,
            handle,
            marks,
        });
        self.associate(handle, Some(id))?;
        Ok(id)
    }

    /// Assign or overwrite an element's key. Engine bookkeeping during
    /// mounting; user-supplied keys are read before this is called and are
    /// never overwritten by the engine.
    pub fn set_key(&mut self, id: ElementId, key: impl Into<String>) -> Result<()> {
        self.element_mut(id)?.key = Some(key.into());
        Ok(())
    }

    /// Replace an element's child list while it is being mounted.
    pub fn set_children(&mut self, id: ElementId, children: Vec<ElementId>) -> Result<()> {
        self.element_mut(id)?.children = children;
        Ok(())
    }

    // ---- style marks -------------------------------------------------

    pub fn marks(&self, id: ElementId) -> Result<&StyleMarks> {
        Ok(self.element(id)?.marks())
    }

    pub fn mark_rule_matched(&mut self, id: ElementId, rule: usize) -> Result<()> {
        self.element_mut(id)?.marks.insert(rule);
        Ok(())
    }

    pub fn mark_stop(&mut self, id: ElementId) -> Result<()> {
        self.element_mut(id)?.marks.set_stop();
        Ok(())
    }

    /// Union `from`'s matched set and stop flag into `to`, so matching state
    /// survives substitution.
    pub fn propagate_marks(&mut self, from: ElementId, to: ElementId) -> Result<()> {
        let source = self.element(from)?.marks.clone();
        self.element_mut(to)?.marks.absorb(&source);
        Ok(())
    }

    // ---- handles -----------------------------------------------------

    pub fn new_handle(&mut self, name: Option<String>) -> HandleId {
        let id = HandleId(self.handles.len());
        self.handles.push(HandleCell {
            name,
            ..HandleCell::default()
        });
        id
    }

    /// Handle reconstructed from persisted state. A `None` target is an
    /// intentional association with no live element; otherwise the key path
    /// is recorded unresolved and the cell is left unassociated.
    pub fn reanimated_handle(&mut self, name: Option<String>, target: Option<KeyPath>) -> HandleId {
        let id = HandleId(self.handles.len());
        let cell = match target {
            None => HandleCell {
                name,
                orig: Slot::Set(None),
                ..HandleCell::default()
            },
            Some(path) => HandleCell {
                name,
                unresolved_target: Some(path),
                ..HandleCell::default()
            },
        };
        self.handles.push(cell);
        id
    }

    fn cell(&self, id: HandleId) -> std::result::Result<&HandleCell, HandleProtocolError> {
        self.handles
            .get(id.0)
            .ok_or(HandleProtocolError::UnknownHandle(id))
    }

    fn cell_mut(
        &mut self,
        id: HandleId,
    ) -> std::result::Result<&mut HandleCell, HandleProtocolError> {
        self.handles
            .get_mut(id.0)
            .ok_or(HandleProtocolError::UnknownHandle(id))
    }

    pub fn handle_name(&self, id: HandleId) -> Result<Option<&str>> {
        Ok(self.cell(id)?.name.as_deref())
    }

    /// Key path recorded for a reanimated handle that has not been resolved
    /// against a live tree.
    pub fn unresolved_target(&self, id: HandleId) -> Result<Option<&KeyPath>> {
        Ok(self.cell(id)?.unresolved_target.as_ref())
    }

    pub fn is_associated(&self, id: HandleId) -> Result<bool> {
        Ok(self.cell(id)?.orig != Slot::Unset)
    }

    /// Bind a handle to the element it was created for. One-shot; `None`
    /// marks the handle intentionally unassociated.
    pub fn associate(&mut self, id: HandleId, element: Option<ElementId>) -> Result<()> {
        let existing = match self.cell(id)?.orig {
            Slot::Unset => None,
            Slot::Set(el) => Some(el),
        };
        if let Some(el) = existing {
            let existing = match el {
                Some(el) => self.element(el)?.type_name().to_string(),
                None => "<none>".to_string(),
            };
            return Err(HandleProtocolError::AlreadyAssociated { handle: id, existing }.into());
        }
        self.cell_mut(id)?.orig = Slot::Set(element);
        Ok(())
    }

    /// Record that the associated element was substituted by `element`
    /// (`None` when it was removed) during a build. One-shot, except that
    /// replacing with the originally associated element is a no-op and does
    /// not consume the write.
    pub fn replace_target(&mut self, id: HandleId, element: Option<ElementId>) -> Result<()> {
        let cell = self.cell(id)?;
        if cell.replacement != Slot::Unset {
            return Err(HandleProtocolError::AlreadyReplaced(id).into());
        }
        if cell.orig == Slot::Set(element) {
            return Ok(());
        }
        self.cell_mut(id)?.replacement = Slot::Set(element);
        Ok(())
    }

    /// Resolve the current element behind a handle.
    ///
    /// Starts at the originally associated element and follows replacement
    /// hops (and the current pass's mount hops) until a cell with no
    /// replacement is reached. `Ok(None)` means the handle has no live
    /// counterpart in the tree.
    pub fn target(&self, id: HandleId) -> Result<Option<ElementId>> {
        let cell = self.cell(id)?;
        let mut current = match cell.orig {
            Slot::Unset => return Err(HandleProtocolError::NeverAssociated(id).into()),
            Slot::Set(el) => el,
        };
        loop {
            let Some(el) = current else {
                return Ok(None);
            };
            if let Some(&instance) = self.mounts.get(&el) {
                current = Some(instance);
                continue;
            }
            let element = self.elements.get(el.0).ok_or(
                HandleProtocolError::DanglingReplacement {
                    handle: id,
                    element: el,
                },
            )?;
            match self.cell(element.handle)?.replacement {
                Slot::Unset => return Ok(Some(el)),
                Slot::Set(next) => current = next,
            }
        }
    }

    // ---- pass bookkeeping --------------------------------------------

    /// Drop the previous pass's template-to-instance mapping.
    pub fn begin_pass(&mut self) {
        self.mounts.clear();
    }

    /// Record that `template` is realized by `instance` in the current pass.
    pub fn record_mount(&mut self, template: ElementId, instance: ElementId) {
        self.mounts.insert(template, instance);
    }

    /// The instance realizing `template` in the current pass, if any.
    pub fn mount_of(&self, template: ElementId) -> Option<ElementId> {
        self.mounts.get(&template).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::Group;
    use crate::element::Element;
    use crate::error::DomError;

    fn leaf(arena: &mut DomArena) -> ElementId {
        Element::builder(Group::shared()).build(arena).unwrap()
    }

    #[test]
    fn test_double_association_fails() {
        let mut arena = DomArena::new();
        let el = leaf(&mut arena);
        let handle = arena.element(el).unwrap().handle();
        let err = arena.associate(handle, Some(el)).unwrap_err();
        assert!(matches!(
            err,
            DomError::Handle(HandleProtocolError::AlreadyAssociated { .. })
        ));
    }

    #[test]
    fn test_double_replacement_fails() {
        let mut arena = DomArena::new();
        let el = leaf(&mut arena);
        let a = leaf(&mut arena);
        let b = leaf(&mut arena);
        let handle = arena.element(el).unwrap().handle();

        arena.replace_target(handle, Some(a)).unwrap();
        let err = arena.replace_target(handle, Some(b)).unwrap_err();
        assert!(matches!(
            err,
            DomError::Handle(HandleProtocolError::AlreadyReplaced(_))
        ));
    }

    #[test]
    fn test_target_on_unassociated_handle_fails() {
        let mut arena = DomArena::new();
        let handle = arena.new_handle(Some("db".into()));
        let err = arena.target(handle).unwrap_err();
        assert!(matches!(
            err,
            DomError::Handle(HandleProtocolError::NeverAssociated(_))
        ));
    }

    #[test]
    fn test_self_replacement_is_noop() {
        let mut arena = DomArena::new();
        let el = leaf(&mut arena);
        let handle = arena.element(el).unwrap().handle();

        arena.replace_target(handle, Some(el)).unwrap();
        assert_eq!(arena.target(handle).unwrap(), Some(el));

        // The no-op did not consume the one-shot write.
        let other = leaf(&mut arena);
        arena.replace_target(handle, Some(other)).unwrap();
        assert_eq!(arena.target(handle).unwrap(), Some(other));
    }

    #[test]
    fn test_target_follows_replacement_chain() {
        let mut arena = DomArena::new();
        let a = leaf(&mut arena);
        let b = leaf(&mut arena);
        let c = leaf(&mut arena);

        let ha = arena.element(a).unwrap().handle();
        let hb = arena.element(b).unwrap().handle();

        arena.replace_target(ha, Some(b)).unwrap();
        arena.replace_target(hb, Some(c)).unwrap();
        assert_eq!(arena.target(ha).unwrap(), Some(c));
    }

    #[test]
    fn test_replacement_with_none_ends_chain() {
        let mut arena = DomArena::new();
        let a = leaf(&mut arena);
        let ha = arena.element(a).unwrap().handle();
        arena.replace_target(ha, None).unwrap();
        assert_eq!(arena.target(ha).unwrap(), None);
    }

    #[test]
    fn test_target_follows_mount_hop() {
        let mut arena = DomArena::new();
        let template = leaf(&mut arena);
        let instance = leaf(&mut arena);
        let handle = arena.element(template).unwrap().handle();

        arena.begin_pass();
        arena.record_mount(template, instance);
        assert_eq!(arena.target(handle).unwrap(), Some(instance));

        // A later pass remounts; resolution tracks the newest instance.
        let next = leaf(&mut arena);
        arena.begin_pass();
        arena.record_mount(template, next);
        assert_eq!(arena.target(handle).unwrap(), Some(next));
    }

    #[test]
    fn test_reanimated_handle_with_null_target() {
        let mut arena = DomArena::new();
        let handle = arena.reanimated_handle(Some("db".into()), None);
        assert_eq!(arena.target(handle).unwrap(), None);
    }
}

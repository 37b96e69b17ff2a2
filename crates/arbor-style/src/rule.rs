//! Style rules
//!
//! A rule pairs a selector with a production that builds the replacement
//! subtree for a matched element. Productions get arena access so they can
//! clone the matched element with overrides or assemble a wrapper around it.

use crate::selector::Selector;
use arbor_dom::{DomArena, Element, ElementId, Props, Result};

/// Context handed to a rule's production.
pub struct ProductionCx<'a> {
    arena: &'a mut DomArena,
    element: ElementId,
}

impl<'a> ProductionCx<'a> {
    pub(crate) fn new(arena: &'a mut DomArena, element: ElementId) -> Self {
        Self { arena, element }
    }

    /// The matched element.
    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn arena(&mut self) -> &mut DomArena {
        self.arena
    }

    pub fn matched(&self) -> Result<&Element> {
        self.arena.element(self.element)
    }

    /// Clone of the matched element with `overrides` shallow-merged over its
    /// props. The common body of an override rule.
    pub fn clone_with(&mut self, overrides: Props) -> Result<ElementId> {
        self.arena.clone_element(self.element, overrides, None)
    }
}

/// Production function: given the matched element, yield the replacement
/// subtree (`None` removes the element from the tree).
pub type Production = Box<dyn Fn(&mut ProductionCx<'_>) -> Result<Option<ElementId>> + Send + Sync>;

/// A single cross-cutting override: selector, production, and an optional
/// stop flag that blocks any further rule from matching the production's
/// output.
pub struct StyleRule {
    pub(crate) selector: Selector,
    pub(crate) production: Production,
    pub(crate) stop: bool,
}

impl StyleRule {
    pub fn new(
        selector: Selector,
        production: impl Fn(&mut ProductionCx<'_>) -> Result<Option<ElementId>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            selector,
            production: Box::new(production),
            stop: false,
        }
    }

    /// Block further rule application on this rule's output.
    pub fn stop(mut self) -> Self {
        self.stop = true;
        self
    }
}

impl std::fmt::Debug for StyleRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StyleRule")
            .field("selector", &self.selector)
            .field("stop", &self.stop)
            .finish()
    }
}

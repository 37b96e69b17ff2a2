//! The style sheet and matcher
//!
//! Applies the ordered rule set to one element at a time: the first rule
//! whose selector matches, and which has not already consumed this element
//! or the substitution chain it came from, produces the replacement. The
//! caller (the build loop) treats the replacement as the new current element
//! and wires the matched element's handle to it.

use crate::rule::{ProductionCx, StyleRule};
use arbor_dom::{DomArena, ElementId, Result};
use tracing::debug;

/// Result of applying a sheet to one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleOutcome {
    /// No rule matched; the element passes through unchanged.
    Unmatched,
    /// A rule consumed the element and produced `element` in its place
    /// (`None` removes the element from the tree).
    Replaced {
        rule: usize,
        element: Option<ElementId>,
    },
}

/// Ordered set of style rules for one deployment build.
#[derive(Debug, Default)]
pub struct StyleSheet {
    rules: Vec<StyleRule>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: StyleRule) {
        self.rules.push(rule);
    }

    pub fn rule(mut self, rule: StyleRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply the first eligible rule to `element`.
    ///
    /// The matched rule is recorded on both the input and the output, and
    /// the input's matched set is propagated onto the output, so the same
    /// rule never reapplies along a substitution chain. A rule with the
    /// stop flag marks its output to end all further matching for it.
    pub fn apply(&self, arena: &mut DomArena, element: ElementId) -> Result<StyleOutcome> {
        let marks = arena.marks(element)?.clone();
        if marks.stop() {
            return Ok(StyleOutcome::Unmatched);
        }

        for (idx, rule) in self.rules.iter().enumerate() {
            if marks.contains(idx) {
                continue;
            }
            if !rule.selector.matches(arena.element(element)?) {
                continue;
            }

            let replacement = {
                let mut cx = ProductionCx::new(arena, element);
                (rule.production)(&mut cx)?
            };

            arena.mark_rule_matched(element, idx)?;
            if let Some(out) = replacement {
                if out != element {
                    arena.propagate_marks(element, out)?;
                }
                arena.mark_rule_matched(out, idx)?;
                if rule.stop {
                    arena.mark_stop(out)?;
                }
            }

            debug!(rule = idx, %element, "style rule matched");
            return Ok(StyleOutcome::Replaced {
                rule: idx,
                element: replacement,
            });
        }

        Ok(StyleOutcome::Unmatched)
    }
}

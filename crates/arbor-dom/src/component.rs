//! Component contract
//!
//! A component is a stateless description of how one node of the topology
//! behaves: primitives are terminal and represent an actual resource,
//! composites expand into a successor subtree during a build pass.

use crate::arena::{DomArena, ElementId, HandleId};
use crate::element::Element;
use crate::error::{DomError, Result};
use crate::key::StatePath;
use crate::props::Props;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Shared reference to a component definition. Identity (for registry
/// lookups and selector short-circuits) is the allocation, so components are
/// defined once per process, typically behind a `LazyLock`.
pub type ComponentRef = Arc<dyn Component>;

/// Whether elements of a component are terminal or expandable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// Terminal node representing an actual resource.
    Primitive,
    /// Expandable node; `build` produces its successor subtree.
    Composite,
}

/// A scheduled asynchronous operation. Resolves to the value committed into
/// the requesting occurrence's state slot, or an error message delivered back
/// into that component's next expansion.
pub type AsyncOp = Pin<Box<dyn Future<Output = std::result::Result<Value, String>> + Send>>;

/// Expansion context handed to [`Component::build`].
///
/// Gives a composite access to the arena (to assemble its successor
/// subtree), to durable state for its structural path, and to the
/// state/async bridge. Hook methods are slot-addressed by call order and
/// must not be called conditionally.
pub trait BuildCx {
    /// The element currently being expanded.
    fn element(&self) -> ElementId;

    /// Arena access for assembling the successor subtree.
    fn arena(&mut self) -> &mut DomArena;

    /// Props of the element being expanded.
    fn props(&self) -> &Props;

    /// Normalized children of the element being expanded.
    fn children(&self) -> &[ElementId];

    /// Structural path addressing this occurrence's durable state.
    fn state_path(&self) -> &StatePath;

    /// Explicit component state stored for this occurrence, if any.
    fn state(&self) -> Option<&Value>;

    /// Replace this occurrence's explicit state. A change owes a rebuild.
    fn set_state(&mut self, value: Value);

    /// Asynchronous value slot. The first access for this occurrence returns
    /// `initial` and schedules `op`; later passes return the most recently
    /// committed result and schedule a refresh. A failed operation is
    /// returned as `Err` on the pass after it settles.
    fn use_async(&mut self, initial: Value, op: AsyncOp) -> Result<Value>;

    /// Deferred method invocation through a handle. Resolved at the end of
    /// the pass, when handle targets are settled; an unresolved handle or a
    /// missing method yields `initial`.
    fn use_method(
        &mut self,
        handle: Option<HandleId>,
        initial: Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value>;

    /// Deferred field read through a handle; same timing as [`use_method`].
    ///
    /// [`use_method`]: BuildCx::use_method
    fn use_field(&mut self, handle: Option<HandleId>, initial: Value, field: &str)
        -> Result<Value>;
}

/// A component definition.
pub trait Component: Send + Sync {
    /// Type name used for keys, structural paths, and selector matching.
    fn type_name(&self) -> &str;

    fn kind(&self) -> ComponentKind;

    /// Defaults shallow-merged under explicitly supplied props at element
    /// construction.
    fn default_props(&self) -> Props {
        Props::new()
    }

    /// Expand an element of this component into its successor subtree.
    /// `Ok(None)` removes the element from the output tree.
    ///
    /// Composites must override this; invoking it on a primitive is a logic
    /// defect.
    fn build(&self, cx: &mut dyn BuildCx) -> Result<Option<ElementId>> {
        let _ = cx;
        Err(DomError::NotExpandable(self.type_name().to_string()))
    }

    /// Instance method surface reachable through handles. `None` when the
    /// method does not exist on this component.
    fn invoke(&self, element: &Element, method: &str, args: &[Value]) -> Option<Value> {
        let _ = (element, method, args);
        None
    }

    /// Instance field surface reachable through handles.
    fn get_field(&self, element: &Element, field: &str) -> Option<Value> {
        let _ = (element, field);
        None
    }
}

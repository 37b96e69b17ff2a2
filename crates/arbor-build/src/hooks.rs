//! Immediate instance access through handles
//!
//! The hook variants on the expansion context defer resolution to the gap
//! between passes; these helpers resolve a handle's current target right
//! away. By default an unresolved handle or a missing method/field yields
//! the caller's default value; strict mode turns those into errors.

use arbor_dom::{DomArena, DomError, ElementId, HandleId, Result};
use serde_json::Value;

/// Resolution options for the immediate helpers.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceValueOptions {
    /// Fail instead of yielding the default when the handle is unresolved
    /// or the method/field is missing.
    pub strict: bool,
}

/// Invoke a named method on the instance behind `handle`.
pub fn call_instance_method(
    arena: &DomArena,
    handle: HandleId,
    default: Value,
    method: &str,
    args: &[Value],
    options: InstanceValueOptions,
) -> Result<Value> {
    match resolve(arena, handle, method, options)? {
        None => Ok(default),
        Some(target) => {
            let element = arena.element(target)?;
            match element.component().invoke(element, method, args) {
                Some(value) => Ok(value),
                None if options.strict => Err(DomError::Component(format!(
                    "method {method} does not exist on instance behind {handle}"
                ))),
                None => Ok(default),
            }
        }
    }
}

/// Read a named field from the instance behind `handle`.
pub fn get_instance_value(
    arena: &DomArena,
    handle: HandleId,
    default: Value,
    field: &str,
    options: InstanceValueOptions,
) -> Result<Value> {
    match resolve(arena, handle, field, options)? {
        None => Ok(default),
        Some(target) => {
            let element = arena.element(target)?;
            match element.component().get_field(element, field) {
                Some(value) => Ok(value),
                None if options.strict => Err(DomError::Component(format!(
                    "field {field} does not exist on instance behind {handle}"
                ))),
                None => Ok(default),
            }
        }
    }
}

fn resolve(
    arena: &DomArena,
    handle: HandleId,
    what: &str,
    options: InstanceValueOptions,
) -> Result<Option<ElementId>> {
    if !arena.is_associated(handle)? {
        if options.strict {
            return Err(DomError::Component(format!(
                "cannot resolve {what}: {handle} is not associated with an element"
            )));
        }
        return Ok(None);
    }
    let target = arena.target(handle)?;
    if target.is_none() && options.strict {
        return Err(DomError::Component(format!(
            "cannot resolve {what}: {handle} has no live element in the tree"
        )));
    }
    Ok(target)
}

//! The schedule/join async bridge
//!
//! Expansions never block a pass: hooks record pending operations and return
//! the last committed value. Once the pass's depth-first walk completes, the
//! whole set of operations scheduled during the pass is joined (fan-out,
//! fan-in) and the results committed to build state in the gap before the
//! next pass starts. Handle-based instance operations are evaluated in the
//! same gap, when handle targets have settled.

use crate::error::Result;
use crate::state::{BuildStateStore, HookSlot};
use arbor_dom::{AsyncOp, DomArena, HandleId, StatePath};
use futures::future::join_all;
use serde_json::Value;
use tracing::debug;

/// One operation scheduled during a pass, addressed to the slot its result
/// is committed into.
pub(crate) enum PendingOp {
    /// Arbitrary asynchronous operation.
    Future {
        path: StatePath,
        slot: usize,
        op: AsyncOp,
    },
    /// Method invocation through a handle, deferred until targets settle.
    Method {
        path: StatePath,
        slot: usize,
        handle: Option<HandleId>,
        initial: Value,
        method: String,
        args: Vec<Value>,
    },
    /// Field read through a handle, deferred until targets settle.
    Field {
        path: StatePath,
        slot: usize,
        handle: Option<HandleId>,
        initial: Value,
        field: String,
    },
}

/// Await every operation scheduled during one pass and commit the results.
///
/// Futures run concurrently; instance operations are evaluated afterwards
/// against the settled tree. State mutation happens only here, in the gap
/// between passes.
pub(crate) async fn join_ops(
    arena: &DomArena,
    state: &mut BuildStateStore,
    pending: Vec<PendingOp>,
) -> Result<()> {
    let mut futures = Vec::new();
    let mut instance_ops = Vec::new();
    for op in pending {
        match op {
            PendingOp::Future { path, slot, op } => futures.push((path, slot, op)),
            other => instance_ops.push(other),
        }
    }

    debug!(
        futures = futures.len(),
        instance_ops = instance_ops.len(),
        "joining scheduled operations"
    );

    let settled = join_all(
        futures
            .into_iter()
            .map(|(path, slot, op)| async move { (path, slot, op.await) }),
    )
    .await;

    for (path, slot, outcome) in settled {
        let value = match outcome {
            Ok(value) => HookSlot::Value(value),
            Err(message) => HookSlot::Error(message),
        };
        state.commit_hook(&path, slot, value);
    }

    for op in instance_ops {
        let (path, slot, value) = eval_instance_op(arena, op)?;
        state.commit_hook(&path, slot, HookSlot::Value(value));
    }

    Ok(())
}

/// Resolve a deferred instance operation against the settled tree. An
/// unresolved handle or a missing method/field yields the caller's initial
/// value; protocol violations stay fatal.
fn eval_instance_op(arena: &DomArena, op: PendingOp) -> Result<(StatePath, usize, Value)> {
    match op {
        PendingOp::Future { .. } => unreachable!("futures are joined, not evaluated"),
        PendingOp::Method {
            path,
            slot,
            handle,
            initial,
            method,
            args,
        } => {
            let value = match resolve_live(arena, handle)? {
                None => initial,
                Some(target) => {
                    let element = arena.element(target)?;
                    element
                        .component()
                        .invoke(element, &method, &args)
                        .unwrap_or(initial)
                }
            };
            Ok((path, slot, value))
        }
        PendingOp::Field {
            path,
            slot,
            handle,
            initial,
            field,
        } => {
            let value = match resolve_live(arena, handle)? {
                None => initial,
                Some(target) => {
                    let element = arena.element(target)?;
                    element
                        .component()
                        .get_field(element, &field)
                        .unwrap_or(initial)
                }
            };
            Ok((path, slot, value))
        }
    }
}

/// Current live element behind `handle`, or `None` when the handle is
/// absent, not associated, or has no live counterpart in the tree.
fn resolve_live(arena: &DomArena, handle: Option<HandleId>) -> Result<Option<arbor_dom::ElementId>> {
    let Some(handle) = handle else {
        return Ok(None);
    };
    if !arena.is_associated(handle)? {
        return Ok(None);
    }
    Ok(arena.target(handle)?)
}

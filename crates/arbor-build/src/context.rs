//! Expansion context
//!
//! Concrete [`BuildCx`] handed to `Component::build`: arena access for
//! assembling the successor subtree, durable state for the occurrence's
//! structural path, and the hook side of the schedule/join bridge.

use crate::bridge::PendingOp;
use crate::state::{BuildStateStore, HookSlot};
use arbor_dom::{
    AsyncOp, BuildCx, DomArena, DomError, ElementId, HandleId, Props, Result as DomResult,
    StatePath,
};
use serde_json::Value;

pub(crate) struct BuildContext<'a> {
    arena: &'a mut DomArena,
    state: &'a mut BuildStateStore,
    pending: &'a mut Vec<PendingOp>,
    element: ElementId,
    props: Props,
    children: Vec<ElementId>,
    path: StatePath,
    hook_index: usize,
}

impl<'a> BuildContext<'a> {
    pub(crate) fn new(
        arena: &'a mut DomArena,
        state: &'a mut BuildStateStore,
        pending: &'a mut Vec<PendingOp>,
        element: ElementId,
        path: StatePath,
    ) -> DomResult<Self> {
        let el = arena.element(element)?;
        let props = el.props().clone();
        let children = el.children().to_vec();
        Ok(Self {
            arena,
            state,
            pending,
            element,
            props,
            children,
            path,
            hook_index: 0,
        })
    }

    /// Current slot value for the next hook call, advancing the call-order
    /// cursor.
    fn next_slot(&mut self) -> usize {
        let slot = self.hook_index;
        self.hook_index += 1;
        slot
    }

    fn slot_value(&self, slot: usize, initial: Value) -> DomResult<Value> {
        match self.state.hook_slot(&self.path, slot) {
            None => Ok(initial),
            Some(HookSlot::Value(v)) => Ok(v.clone()),
            Some(HookSlot::Error(message)) => Err(DomError::AsyncOp {
                path: self.path.to_string(),
                message: message.clone(),
            }),
        }
    }
}

impl BuildCx for BuildContext<'_> {
    fn element(&self) -> ElementId {
        self.element
    }

    fn arena(&mut self) -> &mut DomArena {
        self.arena
    }

    fn props(&self) -> &Props {
        &self.props
    }

    fn children(&self) -> &[ElementId] {
        &self.children
    }

    fn state_path(&self) -> &StatePath {
        &self.path
    }

    fn state(&self) -> Option<&Value> {
        self.state.data(&self.path)
    }

    fn set_state(&mut self, value: Value) {
        self.state.set_data(&self.path, value);
    }

    fn use_async(&mut self, initial: Value, op: AsyncOp) -> DomResult<Value> {
        let slot = self.next_slot();
        self.pending.push(PendingOp::Future {
            path: self.path.clone(),
            slot,
            op,
        });
        self.slot_value(slot, initial)
    }

    fn use_method(
        &mut self,
        handle: Option<HandleId>,
        initial: Value,
        method: &str,
        args: Vec<Value>,
    ) -> DomResult<Value> {
        let slot = self.next_slot();
        self.pending.push(PendingOp::Method {
            path: self.path.clone(),
            slot,
            handle,
            initial: initial.clone(),
            method: method.to_string(),
            args,
        });
        self.slot_value(slot, initial)
    }

    fn use_field(
        &mut self,
        handle: Option<HandleId>,
        initial: Value,
        field: &str,
    ) -> DomResult<Value> {
        let slot = self.next_slot();
        self.pending.push(PendingOp::Field {
            path: self.path.clone(),
            slot,
            handle,
            initial: initial.clone(),
            field: field.to_string(),
        });
        self.slot_value(slot, initial)
    }
}

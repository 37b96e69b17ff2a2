//! Durable build state
//!
//! State is keyed by structural path, so equivalent component occurrences
//! resolve to the same slot across rebuilds even as the exact tree shape
//! shifts. Entries persist across passes within one deployment lifetime and
//! are carried into reanimation as a plain path -> JSON mapping.

use arbor_dom::StatePath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Last committed result of one scheduled operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookSlot {
    Value(Value),
    Error(String),
}

/// State stored for one component occurrence: hook slots in call order plus
/// whatever the component stored explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathState {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<Option<HookSlot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Build state for one deployment.
///
/// The dirty flag records whether any commit actually changed a value since
/// it was last taken; the build loop reads it in the gap between passes to
/// decide whether another pass is owed.
#[derive(Debug, Default)]
pub struct BuildStateStore {
    entries: BTreeMap<StatePath, PathState>,
    dirty: bool,
}

impl BuildStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &StatePath) -> Option<&PathState> {
        self.entries.get(path)
    }

    /// Explicit component state for a path.
    pub fn data(&self, path: &StatePath) -> Option<&Value> {
        self.entries.get(path).and_then(|s| s.data.as_ref())
    }

    /// Replace explicit component state; marks dirty only on change.
    pub fn set_data(&mut self, path: &StatePath, value: Value) {
        let entry = self.entries.entry(path.clone()).or_default();
        if entry.data.as_ref() != Some(&value) {
            entry.data = Some(value);
            self.dirty = true;
        }
    }

    pub(crate) fn hook_slot(&self, path: &StatePath, slot: usize) -> Option<&HookSlot> {
        self.entries
            .get(path)
            .and_then(|s| s.hooks.get(slot))
            .and_then(Option::as_ref)
    }

    /// Commit one scheduled-operation result; marks dirty only on change.
    pub(crate) fn commit_hook(&mut self, path: &StatePath, slot: usize, value: HookSlot) {
        let entry = self.entries.entry(path.clone()).or_default();
        if entry.hooks.len() <= slot {
            entry.hooks.resize(slot + 1, None);
        }
        if entry.hooks[slot].as_ref() != Some(&value) {
            entry.hooks[slot] = Some(value);
            self.dirty = true;
        }
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Persistable form: structural path string to opaque JSON value.
    pub fn to_persisted(&self) -> BTreeMap<String, Value> {
        self.entries
            .iter()
            .map(|(path, state)| {
                let value = serde_json::to_value(state).unwrap_or(Value::Null);
                (path.to_string(), value)
            })
            .collect()
    }

    /// Restore from the persisted form.
    pub fn from_persisted(
        map: &BTreeMap<String, Value>,
    ) -> std::result::Result<Self, serde_json::Error> {
        let mut entries = BTreeMap::new();
        for (path, value) in map {
            let state: PathState = serde_json::from_value(value.clone())?;
            entries.insert(StatePath::from(path.as_str()), state);
        }
        Ok(Self {
            entries,
            dirty: false,
        })
    }
}

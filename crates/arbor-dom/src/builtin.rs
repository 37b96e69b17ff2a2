//! Builtin components

use crate::component::{Component, ComponentKind, ComponentRef};
use std::sync::{Arc, LazyLock};

/// Primitive container that groups children without adding semantics of its
/// own. The usual root for topologies with more than one resource.
#[derive(Debug)]
pub struct Group;

static GROUP: LazyLock<ComponentRef> = LazyLock::new(|| Arc::new(Group));

impl Group {
    pub fn shared() -> ComponentRef {
        GROUP.clone()
    }
}

impl Component for Group {
    fn type_name(&self) -> &str {
        "Group"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Primitive
    }
}

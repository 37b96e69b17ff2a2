//! Arbor DOM - element/component model and handle indirection
//!
//! The foundation of the composition engine: immutable elements referencing
//! component definitions, frozen props, forward-reference handle cells, and
//! the index-based arena both live in.
//!
//! ## Key Concepts
//!
//! - **Element**: one immutable node (component reference + props +
//!   normalized children + sibling-unique key)
//! - **Handle**: a cell that lets code reference the final resource produced
//!   by a point in the tree before it exists, and that keeps resolving
//!   correctly across every substitution performed during reconciliation
//! - **Arena**: flat element/handle tables addressed by index, owned by one
//!   deployment
//! - **Component**: primitive (terminal resource) or composite (expandable
//!   via `build`)

#![deny(unsafe_code)]

pub mod arena;
pub mod builtin;
pub mod component;
pub mod element;
pub mod error;
pub mod key;
pub mod props;

// Re-export main types
pub use arena::{DomArena, ElementId, HandleId};
pub use builtin::Group;
pub use component::{AsyncOp, BuildCx, Component, ComponentKind, ComponentRef};
pub use element::{Element, ElementBuilder, StyleMarks};
pub use error::{DomError, HandleProtocolError, Result};
pub use key::{KeyPath, StatePath, UniqueNames};
pub use props::{PropValue, Props};

//! Arbor Style - cross-cutting element substitution
//!
//! Style rules let a deployment override parts of a topology without the
//! original components knowing about it: a selector picks elements by
//! component type and prop shape, a production builds the replacement
//! subtree, and per-element bookkeeping guarantees each rule consumes a
//! given element (and its substitution chain) at most once.
//!
//! Malformed rules that keep producing structurally matching output are not
//! detected here; the build loop's iteration caps are the backstop.

#![deny(unsafe_code)]

pub mod rule;
pub mod selector;
pub mod sheet;

// Re-export main types
pub use rule::{Production, ProductionCx, StyleRule};
pub use selector::Selector;
pub use sheet::{StyleOutcome, StyleSheet};

//! Arbor Build - the reconciliation engine
//!
//! Drives repeated expansion of a component tree into a primitive-only
//! resource tree. A deployment build is a strictly sequential series of
//! passes: within a pass the tree is walked depth-first, style overrides are
//! applied, composites expand with access to durable per-occurrence state,
//! and asynchronous operations are scheduled; between passes the scheduled
//! set is joined and committed, and a changed commitment owes another pass.
//!
//! ## Key Components
//!
//! - [`Builder`]: the pass loop, with [`BuildOptions`] caps
//! - [`BuildStateStore`]: durable state keyed by structural path
//! - hooks on the expansion context: `use_async`, `use_method`, `use_field`
//! - [`call_instance_method`]/[`get_instance_value`]: immediate handle access

#![deny(unsafe_code)]

pub mod bridge;
pub mod builder;
pub mod context;
pub mod error;
pub mod hooks;
pub mod state;

// Re-export main types
pub use builder::{BuildOptions, BuildOutput, BuildPhase, Builder, PassOutput};
pub use error::{BuildLoopError, Result};
pub use hooks::{call_instance_method, get_instance_value, InstanceValueOptions};
pub use state::{BuildStateStore, HookSlot, PathState};

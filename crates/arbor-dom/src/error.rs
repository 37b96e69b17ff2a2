//! DOM and handle protocol error types

use crate::arena::{ElementId, HandleId};
use thiserror::Error;

/// Violations of the handle write-once protocol.
///
/// Every variant indicates a logic defect in the caller or the engine, not a
/// recoverable runtime condition.
#[derive(Debug, Error)]
pub enum HandleProtocolError {
    #[error("handle {handle} already associated with element of type {existing}")]
    AlreadyAssociated { handle: HandleId, existing: String },

    #[error("replace_target called more than once on handle {0}")]
    AlreadyReplaced(HandleId),

    #[error("handle {0} was never associated with an element")]
    NeverAssociated(HandleId),

    #[error("replacement chain for handle {handle} reached unknown element {element}")]
    DanglingReplacement {
        handle: HandleId,
        element: ElementId,
    },

    #[error("unknown handle: {0}")]
    UnknownHandle(HandleId),
}

/// DOM-level errors, including failures raised from component expansion.
#[derive(Debug, Error)]
pub enum DomError {
    #[error(transparent)]
    Handle(#[from] HandleProtocolError),

    #[error("unknown element: {0}")]
    UnknownElement(ElementId),

    #[error("cannot expand non-composite component: {0}")]
    NotExpandable(String),

    #[error("scheduled operation for {path} failed: {message}")]
    AsyncOp { path: String, message: String },

    #[error("{0}")]
    Component(String),
}

impl DomError {
    /// Component-defined expansion failure.
    pub fn component(message: impl Into<String>) -> Self {
        DomError::Component(message.into())
    }
}

/// Result type for DOM operations
pub type Result<T> = std::result::Result<T, DomError>;

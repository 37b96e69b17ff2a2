//! Deployment error types

use crate::record::DeploymentId;
use arbor_build::BuildLoopError;
use arbor_dom::DomError;
use arbor_reanimate::ReanimationError;
use thiserror::Error;

/// Failure reported by a driver across the action boundary.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DriverError(pub String);

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Deployment orchestration errors.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("deployment not found: {0}")]
    NotFound(DeploymentId),

    #[error(transparent)]
    Build(#[from] BuildLoopError),

    #[error(transparent)]
    Reanimate(#[from] ReanimationError),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("deployment store error: {0}")]
    Store(String),
}

/// Result type for deployment operations
pub type Result<T> = std::result::Result<T, DeployError>;

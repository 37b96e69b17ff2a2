//! Reanimation error types

use arbor_dom::DomError;
use thiserror::Error;

/// Failures while registering, serializing, or reanimating durable
/// identities. Fatal to the operation for the specific object involved; the
/// only permitted degrade is the bare-package-name fallback during package
/// resolution, which happens before any of these are raised.
#[derive(Debug, Error)]
pub enum ReanimationError {
    #[error("malformed identity urn: {0}")]
    MalformedUrn(String),

    #[error("identity record field {field} must not contain ':' (got {value})")]
    InvalidRecordField { field: String, value: String },

    #[error("component is not registered: {type_name}")]
    UnregisteredComponent { type_name: String },

    #[error("cannot locate package {package} while reanimating {urn}")]
    PackageNotFound { package: String, urn: String },

    #[error("package {package} has no module {path}")]
    ModuleNotFound { package: String, path: String },

    #[error("unable to reanimate {urn}: export {name} not found after module load")]
    ExportNotFound { urn: String, name: String },

    #[error("malformed serialized tree: {0}")]
    MalformedDocument(String),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Dom(#[from] DomError),
}

impl ReanimationError {
    pub fn document(message: impl Into<String>) -> Self {
        ReanimationError::MalformedDocument(message.into())
    }
}

/// Result type for reanimation operations
pub type Result<T> = std::result::Result<T, ReanimationError>;

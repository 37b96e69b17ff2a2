//! Build loop error types

use arbor_dom::DomError;
use thiserror::Error;

/// Fatal build failures. None of these are retried; they fail the whole
/// deployment build with enough path context to find the offending node.
#[derive(Debug, Error)]
pub enum BuildLoopError {
    #[error("build pass limit of {limit} exceeded; state changes or rewrites keep owing rebuilds")]
    PassLimitExceeded { limit: usize },

    #[error("rewrite limit of {limit} exceeded at {path}; a rule or expansion keeps substituting")]
    RewriteLimitExceeded { limit: usize, path: String },

    #[error("element remounted within a single pass at {path}")]
    Remount { path: String },

    #[error("expansion of {path} failed: {source}")]
    Expand {
        path: String,
        #[source]
        source: DomError,
    },

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("restored build state is malformed: {0}")]
    MalformedState(#[from] serde_json::Error),
}

/// Result type for build operations
pub type Result<T> = std::result::Result<T, BuildLoopError>;

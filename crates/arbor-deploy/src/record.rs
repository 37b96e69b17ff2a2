//! Persisted deployment records
//!
//! A record is everything two process lifetimes share: the serialized tree
//! (current and previous) and the build state mapping, plus identity and
//! timestamps. Persistence of this record between "create" and a later
//! "update" is the sole coordination mechanism across processes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a deployment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentId(Uuid);

impl DeploymentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deploy:{}", self.0)
    }
}

/// Durable snapshot of one deployment between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: DeploymentId,

    /// When the deployment was first created.
    pub created_at: DateTime<Utc>,

    /// When the record was last written.
    pub updated_at: DateTime<Utc>,

    /// Serialized current tree; `None` when the build produced no output.
    pub dom: Option<String>,

    /// Serialized tree of the previous invocation, for driver diffing.
    pub previous_dom: Option<String>,

    /// Build state as structural path string to opaque JSON value.
    pub build_state: BTreeMap<String, Value>,
}

//! Deployment record storage
//!
//! The in-memory implementation is suitable for development and testing;
//! production deployments use a persistent backend behind the same trait.

use crate::error::Result;
use crate::record::{DeploymentId, DeploymentRecord};
use async_trait::async_trait;
use dashmap::DashMap;

/// Persistence boundary for deployment records.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    async fn save(&self, record: &DeploymentRecord) -> Result<()>;
    async fn load(&self, id: &DeploymentId) -> Result<Option<DeploymentRecord>>;
    async fn list(&self) -> Result<Vec<DeploymentId>>;
    async fn delete(&self, id: &DeploymentId) -> Result<()>;
}

/// In-memory deployment store
#[derive(Debug, Default)]
pub struct InMemoryDeploymentStore {
    records: DashMap<DeploymentId, DeploymentRecord>,
}

impl InMemoryDeploymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeploymentStore for InMemoryDeploymentStore {
    async fn save(&self, record: &DeploymentRecord) -> Result<()> {
        self.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn load(&self, id: &DeploymentId) -> Result<Option<DeploymentRecord>> {
        Ok(self.records.get(id).map(|r| r.clone()))
    }

    async fn list(&self) -> Result<Vec<DeploymentId>> {
        Ok(self.records.iter().map(|r| r.key().clone()).collect())
    }

    async fn delete(&self, id: &DeploymentId) -> Result<()> {
        self.records.remove(id);
        Ok(())
    }
}

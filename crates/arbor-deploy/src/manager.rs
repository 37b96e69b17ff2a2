//! Deployment orchestration
//!
//! Ties the engine together at its outer boundary: build a template against
//! a stylesheet, serialize and persist the result, and drive the driver
//! protocol. `update` is the reanimation path: it restores the previous
//! invocation's tree and build state from the persisted record before
//! rebuilding, which is how two separate process lifetimes cooperate.

use crate::driver::{
    execute_actions, ActionOutcome, DeploymentDriver, DomView, DriverOptions,
};
use crate::error::{DeployError, Result};
use crate::record::{DeploymentId, DeploymentRecord};
use crate::storage::DeploymentStore;
use arbor_build::{BuildOptions, BuildStateStore, Builder};
use arbor_dom::{DomArena, ElementId};
use arbor_reanimate::{reanimate_dom, serialize_dom, MummyRegistry, SerializeOptions};
use arbor_style::StyleSheet;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};

/// Configuration for the deploy manager.
#[derive(Debug, Clone)]
pub struct DeployManagerConfig {
    pub build: BuildOptions,
    pub serialize: SerializeOptions,
}

impl Default for DeployManagerConfig {
    fn default() -> Self {
        Self {
            build: BuildOptions::default(),
            serialize: SerializeOptions {
                reanimateable: true,
            },
        }
    }
}

/// Result of a create or update operation.
#[derive(Debug)]
pub struct DeployOutcome {
    pub record: DeploymentRecord,
    pub actions: Vec<ActionOutcome>,
    /// Passes the build took to stabilize.
    pub passes: usize,
}

/// Orchestrates deployment operations against one driver and store.
pub struct DeployManager {
    registry: Arc<MummyRegistry>,
    store: Arc<dyn DeploymentStore>,
    driver: Arc<dyn DeploymentDriver>,
    config: DeployManagerConfig,
}

impl DeployManager {
    pub fn new(
        registry: Arc<MummyRegistry>,
        store: Arc<dyn DeploymentStore>,
        driver: Arc<dyn DeploymentDriver>,
    ) -> Self {
        Self {
            registry,
            store,
            driver,
            config: DeployManagerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DeployManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Create a new deployment from a template tree.
    #[instrument(skip(self, arena, sheet), fields(root = %root))]
    pub async fn create(
        &self,
        arena: &mut DomArena,
        root: ElementId,
        sheet: StyleSheet,
    ) -> Result<DeployOutcome> {
        let id = DeploymentId::generate();
        let mut builder = Builder::new(sheet).with_options(self.config.build.clone());
        let built = builder.build(arena, root).await?;

        let dom = self.serialize(arena, built.root)?;
        let now = Utc::now();
        let record = DeploymentRecord {
            id: id.clone(),
            created_at: now,
            updated_at: now,
            dom,
            previous_dom: None,
            build_state: builder.state().to_persisted(),
        };
        self.store.save(&record).await?;

        let actions = self
            .drive(
                &id,
                None,
                DomView {
                    arena: &*arena,
                    root: built.root,
                },
            )
            .await?;

        info!(deployment_id = %id, passes = built.passes, "deployment created");
        Ok(DeployOutcome {
            record,
            actions,
            passes: built.passes,
        })
    }

    /// Update an existing deployment: reanimate the previous tree, rebuild
    /// with the restored build state, and reconcile through the driver.
    #[instrument(skip(self, arena, sheet), fields(deployment_id = %id, root = %root))]
    pub async fn update(
        &self,
        id: &DeploymentId,
        arena: &mut DomArena,
        root: ElementId,
        sheet: StyleSheet,
    ) -> Result<DeployOutcome> {
        let record = self
            .store
            .load(id)
            .await?
            .ok_or_else(|| DeployError::NotFound(id.clone()))?;

        let previous = match &record.dom {
            Some(xml) => Some(reanimate_dom(&self.registry, xml)?),
            None => None,
        };
        let state = BuildStateStore::from_persisted(&record.build_state)
            .map_err(arbor_build::BuildLoopError::from)?;

        let mut builder =
            Builder::with_state(sheet, state).with_options(self.config.build.clone());
        let built = builder.build(arena, root).await?;

        let dom = self.serialize(arena, built.root)?;
        let actions = self
            .drive(
                id,
                previous.as_ref().map(|p| DomView {
                    arena: &p.arena,
                    root: p.root,
                }),
                DomView {
                    arena: &*arena,
                    root: built.root,
                },
            )
            .await?;

        let updated = DeploymentRecord {
            id: record.id.clone(),
            created_at: record.created_at,
            updated_at: Utc::now(),
            previous_dom: record.dom,
            dom,
            build_state: builder.state().to_persisted(),
        };
        self.store.save(&updated).await?;

        info!(deployment_id = %id, passes = built.passes, "deployment updated");
        Ok(DeployOutcome {
            record: updated,
            actions,
            passes: built.passes,
        })
    }

    fn serialize(&self, arena: &DomArena, root: Option<ElementId>) -> Result<Option<String>> {
        root.map(|r| serialize_dom(&self.registry, arena, r, self.config.serialize))
            .transpose()
            .map_err(DeployError::from)
    }

    /// Run the driver protocol over the previous and current trees and
    /// execute whatever actions come back.
    async fn drive(
        &self,
        id: &DeploymentId,
        previous: Option<DomView<'_>>,
        current: DomView<'_>,
    ) -> Result<Vec<ActionOutcome>> {
        self.driver
            .start(DriverOptions {
                deployment_id: Some(id.clone()),
                dry_run: false,
            })
            .await?;
        let observations = self.driver.observe(previous, current).await?;
        let actions = self.driver.analyze(previous, current, &observations).await?;
        let outcomes = execute_actions(actions).await;
        self.driver.finish().await?;
        Ok(outcomes)
    }
}

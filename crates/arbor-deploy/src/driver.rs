//! The driver action boundary
//!
//! Drivers own all knowledge of how to apply changes to real
//! infrastructure. The engine's only obligations at this boundary are to
//! hand over fully built, primitive-only trees (current and previous) and
//! to execute the actions a driver's analyze step returns, propagating
//! individual action failures without aborting unrelated actions.

use crate::error::DriverError;
use crate::record::DeploymentId;
use arbor_dom::{DomArena, ElementId};
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

/// Driver-defined snapshot of live external state.
pub type Observations = Value;

/// Options handed to a driver at the start of a deployment operation.
#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    pub deployment_id: Option<DeploymentId>,
    /// Analyze only; actions are returned but should change nothing.
    pub dry_run: bool,
}

/// Borrowed view of a built tree handed across the boundary.
#[derive(Clone, Copy)]
pub struct DomView<'a> {
    pub arena: &'a DomArena,
    /// `None` when the deployment built to an empty tree.
    pub root: Option<ElementId>,
}

/// A described, externally-applied change returned by a driver's analyze
/// step.
#[async_trait]
pub trait Action: Send + Sync {
    fn description(&self) -> &str;

    /// Apply the change. Errors are reported per action, not raised.
    async fn act(&self) -> std::result::Result<(), String>;
}

/// An infrastructure driver.
#[async_trait]
pub trait DeploymentDriver: Send + Sync {
    async fn start(&self, options: DriverOptions) -> std::result::Result<(), DriverError>;

    /// Snapshot whatever external state the driver needs for analysis.
    async fn observe(
        &self,
        previous: Option<DomView<'_>>,
        current: DomView<'_>,
    ) -> std::result::Result<Observations, DriverError>;

    /// Compute the actions that reconcile external state with the tree.
    async fn analyze(
        &self,
        previous: Option<DomView<'_>>,
        current: DomView<'_>,
        observations: &Observations,
    ) -> std::result::Result<Vec<Box<dyn Action>>, DriverError>;

    async fn finish(&self) -> std::result::Result<(), DriverError>;
}

/// Result of executing one action.
#[derive(Debug)]
pub struct ActionOutcome {
    pub description: String,
    pub result: std::result::Result<(), String>,
}

impl ActionOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Execute every action in analyze order. A failing action is recorded and
/// the rest still run.
pub async fn execute_actions(actions: Vec<Box<dyn Action>>) -> Vec<ActionOutcome> {
    let mut outcomes = Vec::with_capacity(actions.len());
    for action in actions {
        let description = action.description().to_string();
        let result = action.act().await;
        if let Err(err) = &result {
            warn!(action = %description, error = %err, "action failed");
        }
        outcomes.push(ActionOutcome {
            description,
            result,
        });
    }
    outcomes
}

/// Driver that observes nothing and changes nothing. Useful as a stand-in
/// while a topology is developed.
#[derive(Debug, Default)]
pub struct NoopDriver;

#[async_trait]
impl DeploymentDriver for NoopDriver {
    async fn start(&self, _options: DriverOptions) -> std::result::Result<(), DriverError> {
        Ok(())
    }

    async fn observe(
        &self,
        _previous: Option<DomView<'_>>,
        _current: DomView<'_>,
    ) -> std::result::Result<Observations, DriverError> {
        Ok(Value::Null)
    }

    async fn analyze(
        &self,
        _previous: Option<DomView<'_>>,
        _current: DomView<'_>,
        _observations: &Observations,
    ) -> std::result::Result<Vec<Box<dyn Action>>, DriverError> {
        Ok(Vec::new())
    }

    async fn finish(&self) -> std::result::Result<(), DriverError> {
        Ok(())
    }
}

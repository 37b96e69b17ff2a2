//! Arbor Deploy - the engine's outer boundary
//!
//! Consumes what the core produces: a fully built, primitive-only tree and
//! its durable record. Drivers receive the previous and current trees,
//! observe external state, and return described actions; the engine executes
//! them and persists the deployment record that a later process restores
//! through reanimation.
//!
//! ## Key Components
//!
//! - [`DeploymentDriver`] / [`Action`]: the plugin action protocol
//! - [`DeploymentRecord`] / [`DeploymentStore`]: persistence between
//!   invocations
//! - [`DeployManager`]: create/update orchestration over a driver and store

#![deny(unsafe_code)]

pub mod driver;
pub mod error;
pub mod manager;
pub mod record;
pub mod storage;

// Re-export main types
pub use driver::{
    execute_actions, Action, ActionOutcome, DeploymentDriver, DomView, DriverOptions, NoopDriver,
    Observations,
};
pub use error::{DeployError, DriverError, Result};
pub use manager::{DeployManager, DeployManagerConfig, DeployOutcome};
pub use record::{DeploymentId, DeploymentRecord};
pub use storage::{DeploymentStore, InMemoryDeploymentStore};

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_dom::{
        BuildCx, Component, ComponentKind, ComponentRef, DomArena, Element, ElementId,
        Result as DomResult,
    };
    use arbor_reanimate::{register_builtins, MummyRecord, MummyRegistry, PackageManifest};
    use arbor_style::StyleSheet;
    use async_trait::async_trait;
    use semver::Version;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, LazyLock};

    #[derive(Debug)]
    struct Service;

    impl Component for Service {
        fn type_name(&self) -> &str {
            "Service"
        }
        fn kind(&self) -> ComponentKind {
            ComponentKind::Primitive
        }
    }

    fn service() -> ComponentRef {
        static SERVICE: LazyLock<ComponentRef> = LazyLock::new(|| Arc::new(Service));
        SERVICE.clone()
    }

    /// Composite whose output depends on an asynchronously fetched config.
    #[derive(Debug)]
    struct WebApp;

    impl Component for WebApp {
        fn type_name(&self) -> &str {
            "WebApp"
        }
        fn kind(&self) -> ComponentKind {
            ComponentKind::Composite
        }
        fn build(&self, cx: &mut dyn BuildCx) -> DomResult<Option<ElementId>> {
            let config = cx.use_async(
                json!("pending"),
                Box::pin(async { Ok::<_, String>(json!("ready")) }),
            )?;
            Ok(Some(
                Element::builder(service())
                    .prop("config", config)
                    .build(cx.arena())?,
            ))
        }
    }

    fn web_app() -> ComponentRef {
        static WEB_APP: LazyLock<ComponentRef> = LazyLock::new(|| Arc::new(WebApp));
        WEB_APP.clone()
    }

    fn infra_manifest() -> PackageManifest {
        PackageManifest::new("shop-infra", Version::new(0, 3, 0))
            .module("src/widgets.rs", |m| m.register("Service", service()))
    }

    /// Registry of the process that builds the deployment.
    fn live_registry() -> Arc<MummyRegistry> {
        let registry = MummyRegistry::new();
        register_builtins(&registry);
        registry.install_package(infra_manifest());
        registry.register(
            service(),
            MummyRecord::new("Service", "shop-infra", "0.3.0", "src/widgets.rs"),
        );
        Arc::new(registry)
    }

    /// Registry of a later process: only the manifest is installed;
    /// reanimation loads the module.
    fn later_registry() -> Arc<MummyRegistry> {
        let registry = MummyRegistry::new();
        register_builtins(&registry);
        registry.install_package(infra_manifest());
        Arc::new(registry)
    }

    struct NoteAction {
        applied: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Action for NoteAction {
        fn description(&self) -> &str {
            "record deployment"
        }
        async fn act(&self) -> std::result::Result<(), String> {
            self.applied.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingAction;

    #[async_trait]
    impl Action for FailingAction {
        fn description(&self) -> &str {
            "exceed quota"
        }
        async fn act(&self) -> std::result::Result<(), String> {
            Err("quota exhausted".to_string())
        }
    }

    /// Driver that records the shape of what it was handed.
    #[derive(Default)]
    struct RecordingDriver {
        started: AtomicUsize,
        finished: AtomicUsize,
        saw_previous: AtomicBool,
        applied: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DeploymentDriver for RecordingDriver {
        async fn start(&self, _options: DriverOptions) -> std::result::Result<(), DriverError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn observe(
            &self,
            previous: Option<DomView<'_>>,
            _current: DomView<'_>,
        ) -> std::result::Result<Observations, DriverError> {
            self.saw_previous
                .store(previous.is_some(), Ordering::SeqCst);
            Ok(json!({ "healthy": true }))
        }

        async fn analyze(
            &self,
            _previous: Option<DomView<'_>>,
            current: DomView<'_>,
            _observations: &Observations,
        ) -> std::result::Result<Vec<Box<dyn Action>>, DriverError> {
            // A real driver diffs the trees here; one action per run is
            // enough to exercise the boundary.
            assert!(current.root.is_some());
            Ok(vec![Box::new(NoteAction {
                applied: self.applied.clone(),
            })])
        }

        async fn finish(&self) -> std::result::Result<(), DriverError> {
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_execute_actions_isolates_failures() {
        let applied = Arc::new(AtomicUsize::new(0));
        let actions: Vec<Box<dyn Action>> = vec![
            Box::new(NoteAction {
                applied: applied.clone(),
            }),
            Box::new(FailingAction),
            Box::new(NoteAction {
                applied: applied.clone(),
            }),
        ];

        let outcomes = execute_actions(actions).await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(!outcomes[1].is_ok());
        assert!(outcomes[2].is_ok());
        // Both unrelated actions ran despite the failure between them.
        assert_eq!(applied.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_create_and_update_across_processes() {
        let store = Arc::new(InMemoryDeploymentStore::new());

        // First process: create.
        let driver = Arc::new(RecordingDriver::default());
        let manager = DeployManager::new(live_registry(), store.clone(), driver.clone());

        let mut arena = DomArena::new();
        let root = Element::builder(web_app()).build(&mut arena).unwrap();
        let created = manager
            .create(&mut arena, root, StyleSheet::new())
            .await
            .unwrap();

        assert_eq!(created.passes, 2);
        assert!(!driver.saw_previous.load(Ordering::SeqCst));
        assert_eq!(driver.started.load(Ordering::SeqCst), 1);
        assert_eq!(driver.finished.load(Ordering::SeqCst), 1);
        assert_eq!(driver.applied.load(Ordering::SeqCst), 1);
        let dom = created.record.dom.clone().unwrap();
        assert!(dom.contains("Service"));
        assert!(dom.contains("ready"));

        // Second process: fresh arena, fresh template, registry that has to
        // reanimate, same store.
        let driver = Arc::new(RecordingDriver::default());
        let manager = DeployManager::new(later_registry(), store.clone(), driver.clone());

        let mut arena = DomArena::new();
        let root = Element::builder(web_app()).build(&mut arena).unwrap();
        let updated = manager
            .update(&created.record.id, &mut arena, root, StyleSheet::new())
            .await
            .unwrap();

        // The restored build state already carries the fetched config, so
        // one pass suffices; the driver saw the reanimated previous tree.
        assert_eq!(updated.passes, 1);
        assert!(driver.saw_previous.load(Ordering::SeqCst));
        assert_eq!(updated.record.previous_dom, created.record.dom);
        assert_eq!(updated.record.dom, created.record.dom);
        assert_eq!(updated.record.created_at, created.record.created_at);
    }

    #[tokio::test]
    async fn test_update_unknown_deployment_fails() {
        let manager = DeployManager::new(
            live_registry(),
            Arc::new(InMemoryDeploymentStore::new()),
            Arc::new(NoopDriver),
        );

        let mut arena = DomArena::new();
        let root = Element::builder(web_app()).build(&mut arena).unwrap();
        let missing = DeploymentId::generate();
        let err = manager
            .update(&missing, &mut arena, root, StyleSheet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_noop_driver_returns_no_actions() {
        let manager = DeployManager::new(
            live_registry(),
            Arc::new(InMemoryDeploymentStore::new()),
            Arc::new(NoopDriver),
        );

        let mut arena = DomArena::new();
        let root = Element::builder(web_app()).build(&mut arena).unwrap();
        let outcome = manager
            .create(&mut arena, root, StyleSheet::new())
            .await
            .unwrap();
        assert!(outcome.actions.is_empty());
    }
}

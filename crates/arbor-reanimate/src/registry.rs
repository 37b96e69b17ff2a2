//! The mummy registry
//!
//! Two content-addressed maps are maintained: URN to component and component
//! to identity record. Components register explicitly (the durable
//! replacement for load-time self-registration); packages install manifests
//! whose module init closures run lazily when reanimation needs an identity
//! that is not yet in-process. The registry is process-wide, append-only
//! state; tests construct their own instances to model a fresh process.

use crate::error::{ReanimationError, Result};
use crate::mummy::MummyRecord;
use arbor_dom::{ComponentRef, Group};
use dashmap::DashMap;
use semver::Version;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

/// Identity of a component definition: the allocation behind its shared ref.
fn component_key(component: &ComponentRef) -> usize {
    Arc::as_ptr(component) as *const () as usize
}

/// Context handed to a module init closure while it is "loaded".
///
/// `register` is full self-registration: the component becomes reanimateable
/// immediately. `export` only records the name for the export-scan fallback,
/// modeling modules whose registration happens lazily.
pub struct ModuleCx<'a> {
    registry: &'a MummyRegistry,
    package_name: &'a str,
    package_version: &'a str,
    module_path: &'a str,
    exports: Vec<(String, String, ComponentRef)>,
}

impl ModuleCx<'_> {
    /// Identity derives from the package that actually owns the module, so
    /// a registration made under a drifted version is findable through the
    /// export scan.
    pub fn register(&mut self, name: &str, component: ComponentRef) {
        let record = MummyRecord::new(
            name,
            self.package_name,
            self.package_version,
            self.module_path,
        );
        self.registry.register(component.clone(), record);
        self.exports
            .push((String::new(), name.to_string(), component));
    }

    pub fn export(&mut self, name: &str, component: ComponentRef) {
        self.exports
            .push((String::new(), name.to_string(), component));
    }

    pub fn export_in_namespace(&mut self, namespace: &str, name: &str, component: ComponentRef) {
        self.exports
            .push((namespace.to_string(), name.to_string(), component));
    }
}

type ModuleInit = Box<dyn Fn(&mut ModuleCx<'_>) + Send + Sync>;

/// Installable description of a package: its identity plus the modules that
/// define reanimateable components, keyed by relative file path.
pub struct PackageManifest {
    name: String,
    version: Version,
    modules: BTreeMap<String, ModuleInit>,
}

impl PackageManifest {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            modules: BTreeMap::new(),
        }
    }

    /// Add a module init closure, run when reanimation loads this module.
    pub fn module(
        mut self,
        relative_path: impl Into<String>,
        init: impl Fn(&mut ModuleCx<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.modules.insert(relative_path.into(), Box::new(init));
        self
    }

    pub fn package_id(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// Process-wide identity registry.
#[derive(Default)]
pub struct MummyRegistry {
    by_urn: DashMap<String, ComponentRef>,
    by_component: DashMap<usize, MummyRecord>,
    packages: DashMap<String, Arc<PackageManifest>>,
    versions: DashMap<String, Vec<Version>>,
}

impl MummyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a package's modules loadable by reanimation.
    pub fn install_package(&self, manifest: PackageManifest) {
        let id = manifest.package_id();
        self.versions
            .entry(manifest.name.clone())
            .or_default()
            .push(manifest.version.clone());
        self.packages.insert(id, Arc::new(manifest));
    }

    /// Register a component under its identity record.
    ///
    /// Registering the same component under the same record is idempotent.
    /// Re-registering a *different* record for an already-registered
    /// component is logged and ignored; the first registration wins.
    pub fn register(&self, component: ComponentRef, record: MummyRecord) {
        if let Err(err) = record.validate() {
            warn!(%record, %err, "refusing to register invalid identity record");
            return;
        }
        let key = component_key(&component);
        if let Some(existing) = self.by_component.get(&key) {
            if *existing != record {
                warn!(
                    existing = %*existing,
                    new = %record,
                    "component already registered under a different identity; keeping the first"
                );
            }
        } else {
            self.by_component.insert(key, record.clone());
        }
        self.by_urn.insert(record.urn(), component);
    }

    /// Identity record for an in-process component.
    pub fn find_record(&self, component: &ComponentRef) -> Result<MummyRecord> {
        self.by_component
            .get(&component_key(component))
            .map(|r| r.clone())
            .ok_or_else(|| ReanimationError::UnregisteredComponent {
                type_name: component.type_name().to_string(),
            })
    }

    pub fn find_urn(&self, component: &ComponentRef) -> Result<String> {
        Ok(self.find_record(component)?.urn())
    }

    /// Resolve a URN back to its component definition.
    ///
    /// In-process registrations are used directly. Otherwise the owning
    /// package is resolved by exact `name@version`, degrading to the bare
    /// package name (highest installed version) with a warning; the recorded
    /// module's init is run, which is expected to self-register. If it only
    /// exported, the exports are scanned for the recorded name before the
    /// lookup is declared failed.
    pub fn reanimate(&self, urn: &str) -> Result<ComponentRef> {
        if let Some(component) = self.by_urn.get(urn) {
            return Ok(component.clone());
        }

        let record = MummyRecord::parse_urn(urn)?;
        let manifest = self.resolve_package(&record, urn)?;
        let init = manifest.modules.get(&record.relative_file_path).ok_or_else(|| {
            ReanimationError::ModuleNotFound {
                package: manifest.package_id(),
                path: record.relative_file_path.clone(),
            }
        })?;

        let version = manifest.version.to_string();
        let mut cx = ModuleCx {
            registry: self,
            package_name: &manifest.name,
            package_version: &version,
            module_path: &record.relative_file_path,
            exports: Vec::new(),
        };
        init(&mut cx);
        let exports = cx.exports;

        // Loading should have triggered self-registration.
        if let Some(component) = self.by_urn.get(urn) {
            return Ok(component.clone());
        }

        // Registration happens lazily in some modules; fall back to the
        // exported names.
        debug!(%urn, exports = exports.len(), "searching module exports");
        for (namespace, name, component) in exports {
            if name == record.name && namespace == record.namespace {
                self.register(component.clone(), record);
                return Ok(component);
            }
        }

        Err(ReanimationError::ExportNotFound {
            urn: urn.to_string(),
            name: record.name,
        })
    }

    fn resolve_package(&self, record: &MummyRecord, urn: &str) -> Result<Arc<PackageManifest>> {
        if let Some(manifest) = self.packages.get(&record.package_id()) {
            return Ok(manifest.clone());
        }

        // No exact name@version match, typically because of dependency
        // version drift. Degrade to the bare package name before failing.
        warn!(
            package = %record.package_id(),
            "unable to find exact package version; falling back to package name"
        );
        let best = self
            .versions
            .get(&record.package_name)
            .and_then(|versions| versions.iter().max().cloned());
        let version = best.ok_or_else(|| ReanimationError::PackageNotFound {
            package: record.package_name.clone(),
            urn: urn.to_string(),
        })?;
        let id = format!("{}@{}", record.package_name, version);
        self.packages
            .get(&id)
            .map(|m| m.clone())
            .ok_or_else(|| ReanimationError::PackageNotFound {
                package: id,
                urn: urn.to_string(),
            })
    }
}

static GLOBAL: LazyLock<MummyRegistry> = LazyLock::new(|| {
    let registry = MummyRegistry::new();
    register_builtins(&registry);
    registry
});

/// The process-wide registry instance.
pub fn global() -> &'static MummyRegistry {
    &GLOBAL
}

/// Builtin components shipped by the engine itself, as an installable
/// package.
pub fn builtin_manifest() -> PackageManifest {
    let version = Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or(Version::new(0, 1, 0));
    PackageManifest::new("arbor", version).module("src/builtin.rs", |m| {
        m.register("Group", Group::shared());
    })
}

/// Install and eagerly register the engine's builtin components.
pub fn register_builtins(registry: &MummyRegistry) {
    let manifest = builtin_manifest();
    let record = MummyRecord::new(
        "Group",
        "arbor",
        manifest.version.to_string(),
        "src/builtin.rs",
    );
    registry.install_package(manifest);
    registry.register(Group::shared(), record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_dom::{Component, ComponentKind, Element};

    #[derive(Debug)]
    struct Server;

    impl Component for Server {
        fn type_name(&self) -> &str {
            "Server"
        }
        fn kind(&self) -> ComponentKind {
            ComponentKind::Primitive
        }
    }

    fn server() -> ComponentRef {
        static SERVER: LazyLock<ComponentRef> = LazyLock::new(|| Arc::new(Server));
        SERVER.clone()
    }

    fn server_record(version: &str) -> MummyRecord {
        MummyRecord::new("Server", "cloud-widgets", version, "src/server.rs")
    }

    #[test]
    fn test_register_and_reanimate_in_process() {
        let registry = MummyRegistry::new();
        registry.register(server(), server_record("1.2.0"));

        let urn = registry.find_urn(&server()).unwrap();
        let back = registry.reanimate(&urn).unwrap();
        assert!(Arc::ptr_eq(&back, &server()));
    }

    #[test]
    fn test_reanimate_runs_module_init() {
        // A fresh registry models a brand-new process: nothing registered,
        // only the package manifests installed.
        let registry = MummyRegistry::new();
        registry.install_package(
            PackageManifest::new("cloud-widgets", Version::new(1, 2, 0)).module(
                "src/server.rs",
                |m| m.register("Server", server()),
            ),
        );

        let urn = server_record("1.2.0").urn();
        let back = registry.reanimate(&urn).unwrap();
        assert!(Arc::ptr_eq(&back, &server()));
        // Loading entombed it; this time the fast path hits.
        assert!(registry.find_record(&server()).is_ok());
    }

    #[test]
    fn test_reanimate_scans_exports_when_registration_is_lazy() {
        let registry = MummyRegistry::new();
        registry.install_package(
            PackageManifest::new("cloud-widgets", Version::new(1, 2, 0)).module(
                "src/server.rs",
                |m| m.export("Server", server()),
            ),
        );

        let urn = server_record("1.2.0").urn();
        let back = registry.reanimate(&urn).unwrap();
        assert!(Arc::ptr_eq(&back, &server()));
    }

    #[test]
    fn test_reanimate_falls_back_to_bare_package_name() {
        let registry = MummyRegistry::new();
        registry.install_package(
            PackageManifest::new("cloud-widgets", Version::new(1, 5, 0)).module(
                "src/server.rs",
                |m| m.register("Server", server()),
            ),
        );

        // The recorded version is not installed; the bare name resolves.
        let urn = server_record("2.0.0").urn();
        assert!(registry.reanimate(&urn).is_ok());

        // An unknown package is a hard failure.
        let missing = MummyRecord::new("Server", "gone", "1.0.0", "src/server.rs").urn();
        assert!(matches!(
            registry.reanimate(&missing),
            Err(ReanimationError::PackageNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_export_fails() {
        let registry = MummyRegistry::new();
        registry.install_package(
            PackageManifest::new("cloud-widgets", Version::new(1, 2, 0))
                .module("src/server.rs", |_| {}),
        );

        let urn = server_record("1.2.0").urn();
        assert!(matches!(
            registry.reanimate(&urn),
            Err(ReanimationError::ExportNotFound { .. })
        ));
    }

    #[test]
    fn test_first_registration_wins() {
        let registry = MummyRegistry::new();
        let first = server_record("1.2.0");
        let second = MummyRecord::new("Server", "other-pkg", "9.9.9", "src/other.rs");

        registry.register(server(), first.clone());
        registry.register(server(), second.clone());

        assert_eq!(registry.find_record(&server()).unwrap(), first);
        // Both URNs still resolve to the component.
        assert!(registry.reanimate(&first.urn()).is_ok());
        assert!(registry.reanimate(&second.urn()).is_ok());
    }

    #[test]
    fn test_builtins_reanimate() {
        let registry = MummyRegistry::new();
        register_builtins(&registry);
        let urn = registry.find_urn(&Group::shared()).unwrap();
        let back = registry.reanimate(&urn).unwrap();

        let mut arena = arbor_dom::DomArena::new();
        let el = Element::builder(back).build(&mut arena).unwrap();
        assert_eq!(arena.element(el).unwrap().type_name(), "Group");
    }
}

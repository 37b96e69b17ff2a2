//! Arbor Reanimate - durable identity and tree persistence
//!
//! Makes a built tree, and every handle inside it, durable and
//! process-independent. Components register under mummy records (package,
//! version, module path, name); serialization tags every element block with
//! its component's URN; reanimation resolves those URNs back to component
//! definitions in a later process, loading package modules on demand.
//!
//! ## Key Components
//!
//! - [`MummyRecord`]: the identity descriptor and its URN form
//! - [`MummyRegistry`]: content-addressed object/record maps plus installed
//!   package manifests
//! - [`serialize_dom`] / [`reanimate_dom`]: the durable tree boundary

#![deny(unsafe_code)]

pub mod error;
pub mod mummy;
pub mod reanimate;
pub mod registry;
pub mod serialize;

// Re-export main types
pub use error::{ReanimationError, Result};
pub use mummy::{MummyRecord, URN_DOMAIN};
pub use reanimate::{reanimate_dom, ReanimatedDom};
pub use registry::{
    builtin_manifest, global, register_builtins, ModuleCx, MummyRegistry, PackageManifest,
};
pub use serialize::{serialize_dom, SerializeOptions};

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_dom::{Component, ComponentKind, ComponentRef, DomArena, Element, Group};
    use semver::Version;
    use serde_json::json;
    use std::sync::{Arc, LazyLock};

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

    fn widgets_manifest() -> PackageManifest {
        PackageManifest::new("cloud-widgets", Version::new(1, 2, 0))
            .module("src/server.rs", |m| m.register("Server", server()))
    }

    /// Registry of the process that built the tree.
    fn live_registry() -> MummyRegistry {
        let registry = MummyRegistry::new();
        register_builtins(&registry);
        registry.register(
            server(),
            MummyRecord::new("Server", "cloud-widgets", "1.2.0", "src/server.rs"),
        );
        registry
    }

    /// Registry of a brand-new process: manifests installed, nothing loaded.
    fn fresh_registry() -> MummyRegistry {
        let registry = MummyRegistry::new();
        register_builtins(&registry);
        registry.install_package(widgets_manifest());
        registry
    }

    fn reanimateable() -> SerializeOptions {
        SerializeOptions {
            reanimateable: true,
        }
    }

    #[test]
    fn test_round_trip_simple_dom() {
        let mut arena = DomArena::new();
        let a = Element::builder(server())
            .key("a")
            .prop("id", 1)
            .build(&mut arena)
            .unwrap();
        let b = Element::builder(server())
            .key("b")
            .prop("id", 2)
            .build(&mut arena)
            .unwrap();
        let root = Element::builder(Group::shared())
            .key("g")
            .children([a, b])
            .build(&mut arena)
            .unwrap();

        let live = live_registry();
        let xml = serialize_dom(&live, &arena, root, reanimateable()).unwrap();

        let fresh = fresh_registry();
        let revived = reanimate_dom(&fresh, &xml).unwrap();
        let root = revived.root.unwrap();
        let el = revived.arena.element(root).unwrap();
        assert_eq!(el.type_name(), "Group");
        assert_eq!(el.key(), Some("g"));
        assert_eq!(el.children().len(), 2);
        assert_eq!(
            revived
                .arena
                .element(el.children()[0])
                .unwrap()
                .props()
                .data("id"),
            Some(&json!(1))
        );

        // A second serialization from the revived process is identical.
        let again = serialize_dom(&fresh, &revived.arena, root, reanimateable()).unwrap();
        assert_eq!(xml, again);
    }

    #[test]
    fn test_round_trip_complex_props() {
        let mut arena = DomArena::new();
        let root = Element::builder(server())
            .key("a")
            .prop("obj", json!({ "x": 3, "y": { "z": [4, 5] } }))
            .prop("list", json!([1, "two", null]))
            .prop("numeric_string", "42")
            .prop("count", 42)
            .prop("image", "nginx:1.25")
            .build(&mut arena)
            .unwrap();

        let live = live_registry();
        let xml = serialize_dom(&live, &arena, root, reanimateable()).unwrap();

        let fresh = fresh_registry();
        let revived = reanimate_dom(&fresh, &xml).unwrap();
        let el = revived.arena.element(revived.root.unwrap()).unwrap();
        assert_eq!(el.props().data("obj"), Some(&json!({ "x": 3, "y": { "z": [4, 5] } })));
        assert_eq!(el.props().data("list"), Some(&json!([1, "two", null])));
        // The string keeps being a string and the number a number.
        assert_eq!(el.props().data("numeric_string"), Some(&json!("42")));
        assert_eq!(el.props().data("count"), Some(&json!(42)));
        assert_eq!(el.props().data("image"), Some(&json!("nginx:1.25")));

        let again =
            serialize_dom(&fresh, &revived.arena, revived.root.unwrap(), reanimateable()).unwrap();
        assert_eq!(xml, again);
    }

    #[test]
    fn test_round_trip_handle_target_key_paths() {
        let mut arena = DomArena::new();
        let db_handle = arena.new_handle(Some("db".to_string()));
        let db = Element::builder(server())
            .key("db")
            .handle(db_handle)
            .build(&mut arena)
            .unwrap();
        let api = Element::builder(server())
            .key("api")
            .prop("backend", db_handle)
            .build(&mut arena)
            .unwrap();
        let gone = arena.reanimated_handle(Some("gone".to_string()), None);
        let orphan = Element::builder(server())
            .key("orphan")
            .prop("peer", gone)
            .build(&mut arena)
            .unwrap();
        let root = Element::builder(Group::shared())
            .key("root")
            .children([db, api, orphan])
            .build(&mut arena)
            .unwrap();

        let live = live_registry();
        let xml = serialize_dom(&live, &arena, root, reanimateable()).unwrap();

        let fresh = fresh_registry();
        let revived = reanimate_dom(&fresh, &xml).unwrap();
        let root_el = revived.arena.element(revived.root.unwrap()).unwrap();
        let api_el = revived.arena.element(root_el.children()[1]).unwrap();
        let backend = api_el.props().handle("backend").unwrap();
        assert_eq!(
            revived.arena.handle_name(backend).unwrap(),
            Some("db")
        );
        assert_eq!(
            revived.arena.unresolved_target(backend).unwrap(),
            Some(&vec!["root".to_string(), "db".to_string()])
        );

        let orphan_el = revived.arena.element(root_el.children()[2]).unwrap();
        let peer = orphan_el.props().handle("peer").unwrap();
        assert_eq!(revived.arena.target(peer).unwrap(), None);

        let again =
            serialize_dom(&fresh, &revived.arena, revived.root.unwrap(), reanimateable()).unwrap();
        assert_eq!(xml, again);
    }

    #[test]
    fn test_reanimate_requires_identity_urn() {
        let mut arena = DomArena::new();
        let root = Element::builder(server())
            .key("a")
            .build(&mut arena)
            .unwrap();

        let live = live_registry();
        let debug_only =
            serialize_dom(&live, &arena, root, SerializeOptions::default()).unwrap();
        assert!(reanimate_dom(&live, &debug_only).is_err());
    }

    #[test]
    fn test_reanimate_fails_for_unknown_package() {
        let mut arena = DomArena::new();
        let root = Element::builder(server())
            .key("a")
            .build(&mut arena)
            .unwrap();

        let live = live_registry();
        let xml = serialize_dom(&live, &arena, root, reanimateable()).unwrap();

        // The new process has no cloud-widgets package at all.
        let bare = MummyRegistry::new();
        register_builtins(&bare);
        assert!(matches!(
            reanimate_dom(&bare, &xml),
            Err(ReanimationError::PackageNotFound { .. })
        ));
    }
}

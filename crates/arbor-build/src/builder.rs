//! The build loop
//!
//! Drives repeated expansion of a template tree into a primitive-only tree.
//! A build is a strictly sequential series of passes: each pass walks the
//! template depth-first, instantiating pass-local copies, applying style
//! rules, expanding composites, and scheduling asynchronous operations; the
//! scheduled set is then joined and committed, and another pass begins from
//! the root if any committed value changed. The pass cap surfaces runaway
//! rewrite cycles as a fatal failure instead of looping forever.

use crate::bridge::{join_ops, PendingOp};
use crate::context::BuildContext;
use crate::error::{BuildLoopError, Result};
use crate::state::BuildStateStore;
use arbor_dom::{DomArena, ElementId, Props, StatePath, UniqueNames};
use arbor_style::{StyleOutcome, StyleSheet};
use tracing::{debug, instrument};

/// Caps for one deployment build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Upper bound on sequential passes before the build fails.
    pub max_passes: usize,
    /// Upper bound on style/expansion rewrites of one tree position within
    /// a single pass.
    pub max_rewrites: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_passes: 100,
            max_rewrites: 100,
        }
    }
}

/// Observable state of a deployment build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    /// A pass is walking the tree.
    Expanding,
    /// Awaiting (or owing a rebuild for) scheduled asynchronous results.
    Suspended,
    /// The tree is fully primitive and no rebuild is owed.
    StableOutput,
    /// The pass cap was exceeded or an expansion raised a fatal error.
    Failed,
}

/// Result of one pass.
#[derive(Debug)]
pub struct PassOutput {
    /// Root of the pass's output tree; `None` when the whole tree built to
    /// nothing.
    pub root: Option<ElementId>,
    /// Whether a committed state change owes another pass.
    pub rebuild_owed: bool,
}

/// Result of a complete build.
#[derive(Debug)]
pub struct BuildOutput {
    /// Root of the final, primitive-only tree.
    pub root: Option<ElementId>,
    /// Number of passes the build took.
    pub passes: usize,
}

/// Reconciles one deployment's template tree into primitive elements.
pub struct Builder {
    sheet: StyleSheet,
    state: BuildStateStore,
    options: BuildOptions,
    phase: BuildPhase,
}

/// Bookkeeping scoped to a single pass.
struct PassCx {
    pending: Vec<PendingOp>,
    /// Per-depth structural path allocators; assignment order is the DFS
    /// order, which keeps paths stable across rebuilds of the same shape.
    path_names: Vec<UniqueNames>,
}

impl PassCx {
    fn new() -> Self {
        Self {
            pending: Vec::new(),
            path_names: Vec::new(),
        }
    }

    fn segment(&mut self, depth: usize, type_name: &str) -> String {
        while self.path_names.len() <= depth {
            self.path_names.push(UniqueNames::new());
        }
        self.path_names[depth].assign(type_name)
    }
}

impl Builder {
    pub fn new(sheet: StyleSheet) -> Self {
        Self::with_state(sheet, BuildStateStore::new())
    }

    /// Builder carrying restored state from a previous process lifetime.
    pub fn with_state(sheet: StyleSheet, state: BuildStateStore) -> Self {
        Self {
            sheet,
            state,
            options: BuildOptions::default(),
            phase: BuildPhase::Expanding,
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    pub fn state(&self) -> &BuildStateStore {
        &self.state
    }

    pub fn into_state(self) -> BuildStateStore {
        self.state
    }

    /// Build to a stable, primitive-only tree.
    #[instrument(skip(self, arena), fields(root = %root))]
    pub async fn build(&mut self, arena: &mut DomArena, root: ElementId) -> Result<BuildOutput> {
        let mut passes = 0;
        loop {
            if passes >= self.options.max_passes {
                self.phase = BuildPhase::Failed;
                return Err(BuildLoopError::PassLimitExceeded {
                    limit: self.options.max_passes,
                });
            }
            let pass = self.build_once(arena, root).await?;
            passes += 1;
            debug!(pass = passes, rebuild_owed = pass.rebuild_owed, "pass complete");
            if !pass.rebuild_owed {
                return Ok(BuildOutput {
                    root: pass.root,
                    passes,
                });
            }
        }
    }

    /// Run exactly one pass: walk, join the scheduled operations, commit.
    pub async fn build_once(&mut self, arena: &mut DomArena, root: ElementId) -> Result<PassOutput> {
        self.phase = BuildPhase::Expanding;
        self.state.clear_dirty();
        arena.begin_pass();

        let mut pass = PassCx::new();
        let mut root_keys = UniqueNames::new();
        let built = match self.build_node(
            arena,
            &mut pass,
            root,
            &StatePath::empty(),
            0,
            &mut root_keys,
        ) {
            Ok(built) => built,
            Err(err) => {
                self.phase = BuildPhase::Failed;
                return Err(err);
            }
        };

        if !pass.pending.is_empty() {
            self.phase = BuildPhase::Suspended;
        }
        if let Err(err) = join_ops(arena, &mut self.state, pass.pending).await {
            self.phase = BuildPhase::Failed;
            return Err(err);
        }

        let rebuild_owed = self.state.take_dirty();
        self.phase = if rebuild_owed {
            BuildPhase::Suspended
        } else {
            BuildPhase::StableOutput
        };
        Ok(PassOutput {
            root: built,
            rebuild_owed,
        })
    }

    /// Depth-first build of one template node into primitive output.
    fn build_node(
        &mut self,
        arena: &mut DomArena,
        pass: &mut PassCx,
        template: ElementId,
        parent_path: &StatePath,
        depth: usize,
        keys: &mut UniqueNames,
    ) -> Result<Option<ElementId>> {
        if arena.mount_of(template).is_some() {
            return Err(BuildLoopError::Remount {
                path: parent_path.to_string(),
            });
        }
        let instance = arena.clone_element(template, Props::new(), None)?;
        arena.record_mount(template, instance);

        let (type_name, user_key) = {
            let el = arena.element(instance)?;
            (el.type_name().to_string(), el.key().map(str::to_string))
        };
        let key = user_key.unwrap_or_else(|| keys.assign(&type_name));
        arena.set_key(instance, key)?;

        let mut current = instance;
        let mut path = parent_path.child(&pass.segment(depth, &type_name));
        let mut rewrites = 0;

        loop {
            rewrites += 1;
            if rewrites > self.options.max_rewrites {
                return Err(BuildLoopError::RewriteLimitExceeded {
                    limit: self.options.max_rewrites,
                    path: path.to_string(),
                });
            }

            // Style first: an override may remove the need to build the
            // original component at all.
            match self.sheet.apply(arena, current)? {
                StyleOutcome::Replaced { element, .. } => {
                    let handle = arena.element(current)?.handle();
                    arena.replace_target(handle, element)?;
                    let Some(next) = element else {
                        return Ok(None);
                    };
                    current = self.adopt(arena, current, next, parent_path, false)?;
                    continue;
                }
                StyleOutcome::Unmatched => {}
            }

            if arena.element(current)?.is_primitive() {
                break;
            }

            // Composite expansion, with state addressed by this position's
            // structural path.
            let component = arena.element(current)?.component().clone();
            let built = {
                let mut cx = BuildContext::new(
                    arena,
                    &mut self.state,
                    &mut pass.pending,
                    current,
                    path.clone(),
                )?;
                component.build(&mut cx)
            }
            .map_err(|source| BuildLoopError::Expand {
                path: path.to_string(),
                source,
            })?;

            let handle = arena.element(current)?.handle();
            arena.replace_target(handle, built)?;
            let Some(successor) = built else {
                return Ok(None);
            };

            let working = self.adopt(arena, current, successor, parent_path, true)?;
            if working != current {
                let successor_type = arena.element(working)?.type_name().to_string();
                path = parent_path.child(&pass.segment(depth, &successor_type));
            }
            current = working;
        }

        // Primitive: keep it, recurse into children with a fresh sibling
        // key scope.
        let children = arena.element(current)?.children().to_vec();
        let mut child_keys = UniqueNames::new();
        let mut built_children = Vec::with_capacity(children.len());
        for child in children {
            if let Some(built) =
                self.build_node(arena, pass, child, &path, depth + 1, &mut child_keys)?
            {
                built_children.push(built);
            }
        }
        arena.set_children(current, built_children)?;
        Ok(Some(current))
    }

    /// Take a substitution output into the pass: work on a pass-local copy
    /// (so template nodes are never written across passes), carry matching
    /// state over, and assign the output's key — the predecessor's key for a
    /// style substitute, the concatenated chain for an expansion successor.
    fn adopt(
        &mut self,
        arena: &mut DomArena,
        current: ElementId,
        output: ElementId,
        parent_path: &StatePath,
        expansion: bool,
    ) -> Result<ElementId> {
        if output == current {
            return Ok(current);
        }
        if arena.mount_of(output).is_some() {
            return Err(BuildLoopError::Remount {
                path: parent_path.to_string(),
            });
        }
        let working = arena.clone_element(output, Props::new(), None)?;
        arena.record_mount(output, working);
        arena.propagate_marks(current, working)?;

        let current_key = arena
            .element(current)?
            .key()
            .unwrap_or_default()
            .to_string();
        if expansion {
            let own = {
                let el = arena.element(working)?;
                el.key()
                    .map(str::to_string)
                    .unwrap_or_else(|| el.type_name().to_string())
            };
            arena.set_key(working, format!("{current_key}-{own}"))?;
        } else if arena.element(working)?.key().is_none() {
            arena.set_key(working, current_key)?;
        }
        Ok(working)
    }
}

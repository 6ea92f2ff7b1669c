//! Navigation tree: arena storage, traversal queries, and rewrites.
//!
//! The tree is a hierarchy of screens, stacks, tabs, and panes stored in a
//! slotmap arena. Nodes reference each other by key, never by pointer, so
//! the structure is a tree by construction and cloning the arena preserves
//! every key. All rewrites are copy-on-write: operations take `&self` and
//! return a new [`NavTree`], leaving the input untouched. Collaborators
//! holding per-node state can diff the key sets of two published trees to
//! learn which nodes disappeared.

use std::collections::HashSet;

use slotmap::{Key as _, SlotMap};
use veer_ipc::{PaneSlotSnapshot, TreeNode};

pub mod back;
mod mutate;
pub mod node;
pub mod scope;

pub use node::{
    Destination, NodeBlueprint, NodeData, NodeKey, PaneData, PaneSlot, PaneSlotBlueprint,
    ScreenData, StackData, TabData,
};

/// Failure of a navigation operation.
///
/// Navigation failures are routine (racing intents, stale keys) and must be
/// recoverable, so they are values, never panics. A failed operation leaves
/// the current tree unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavError {
    /// The operation referenced a key, index, or role absent from the tree.
    #[error("{what} not found in the tree")]
    NotFound {
        /// What was looked up.
        what: String,
    },

    /// The operation would leave the tree violating a structural invariant
    /// and was rejected.
    #[error("rejected: {reason}")]
    InvariantViolation {
        /// Which invariant the operation would have broken.
        reason: String,
    },

    /// The active path contains no stack. Indicates a construction bug in
    /// the host's initial tree or factory blueprints.
    #[error("no active stack in the tree")]
    NoActiveStack,
}

impl NavError {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        NavError::NotFound { what: what.into() }
    }

    pub(crate) fn invariant(reason: impl Into<String>) -> Self {
        NavError::InvariantViolation {
            reason: reason.into(),
        }
    }
}

/// The navigation tree.
///
/// The root is always a stack. Cloning is cheap enough to treat every
/// mutation as copy-on-write, and keys are stable across clones.
#[derive(Debug, Clone)]
pub struct NavTree<D: Destination> {
    nodes: SlotMap<NodeKey, NodeData<D>>,
    root: NodeKey,
}

impl<D: Destination> NavTree<D> {
    /// Build a tree from a blueprint.
    ///
    /// A non-stack blueprint root is wrapped in a stack so the root is
    /// always a stack. Fails if any stack or tab in the blueprint is empty
    /// or a pane blueprint is inconsistent.
    pub fn new(blueprint: NodeBlueprint<D>) -> Result<Self, NavError> {
        let blueprint = match blueprint {
            root @ NodeBlueprint::Stack { .. } => root,
            other => NodeBlueprint::stack(vec![other]),
        };

        let mut tree = Self {
            nodes: SlotMap::with_key(),
            root: NodeKey::null(),
        };
        let root = tree.graft(blueprint, None)?;
        tree.root = root;

        #[cfg(debug_assertions)]
        tree.verify_invariants();

        Ok(tree)
    }

    // ========================================================================
    // Read-only queries
    // ========================================================================

    /// The root node's key. The root is always a stack.
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Node data by key.
    pub fn get(&self, key: NodeKey) -> Option<&NodeData<D>> {
        self.nodes.get(key)
    }

    /// Whether a key is present in the tree.
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All keys currently in the tree, in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes.keys()
    }

    /// Parent of a node, `None` for the root or an absent key.
    pub fn parent_of(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key)?.parent()
    }

    /// The currently selected child of a container.
    ///
    /// Stack: the top child. Tab: the active tab's stack. Pane: the active
    /// slot's content. Screens have no children.
    pub fn active_child(&self, key: NodeKey) -> Option<NodeKey> {
        match self.nodes.get(key)? {
            NodeData::Screen(_) => None,
            NodeData::Stack(stack) => stack.top(),
            NodeData::Tab(tab) => tab.active_stack(),
            NodeData::Pane(pane) => pane.active_slot().and_then(|slot| slot.content),
        }
    }

    /// The root-to-leaf path obtained by following each container's
    /// currently selected child.
    pub fn active_path(&self) -> Vec<NodeKey> {
        let mut path = vec![self.root];
        let mut current = self.root;
        while let Some(next) = self.active_child(current) {
            path.push(next);
            current = next;
        }
        path
    }

    /// The screen at the end of the active path, if the path ends in one.
    pub fn active_leaf(&self) -> Option<NodeKey> {
        let last = *self.active_path().last()?;
        matches!(self.nodes.get(last), Some(NodeData::Screen(_))).then_some(last)
    }

    /// The stack that owns the active leaf: the nearest stack ancestor at
    /// the end of the active path.
    pub fn active_stack(&self) -> Result<NodeKey, NavError> {
        self.active_path()
            .iter()
            .rev()
            .copied()
            .find(|&key| matches!(self.nodes.get(key), Some(NodeData::Stack(_))))
            .ok_or(NavError::NoActiveStack)
    }

    /// Destination of the active leaf.
    pub fn active_destination(&self) -> Option<&D> {
        match self.nodes.get(self.active_leaf()?)? {
            NodeData::Screen(screen) => Some(screen.destination()),
            _ => None,
        }
    }

    /// The nearest ancestor (including `key` itself) matching a predicate.
    pub fn find_ancestor(
        &self,
        key: NodeKey,
        mut pred: impl FnMut(&NodeData<D>) -> bool,
    ) -> Option<NodeKey> {
        let mut current = Some(key);
        while let Some(cursor) = current {
            let node = self.nodes.get(cursor)?;
            if pred(node) {
                return Some(cursor);
            }
            current = node.parent();
        }
        None
    }

    // ========================================================================
    // Typed lookups
    // ========================================================================

    pub(crate) fn stack(&self, key: NodeKey) -> Result<&StackData, NavError> {
        match self.nodes.get(key) {
            Some(NodeData::Stack(stack)) => Ok(stack),
            _ => Err(NavError::not_found("stack")),
        }
    }

    pub(crate) fn stack_mut(&mut self, key: NodeKey) -> Result<&mut StackData, NavError> {
        match self.nodes.get_mut(key) {
            Some(NodeData::Stack(stack)) => Ok(stack),
            _ => Err(NavError::not_found("stack")),
        }
    }

    pub(crate) fn tab(&self, key: NodeKey) -> Result<&TabData, NavError> {
        match self.nodes.get(key) {
            Some(NodeData::Tab(tab)) => Ok(tab),
            _ => Err(NavError::not_found("tab container")),
        }
    }

    pub(crate) fn tab_mut(&mut self, key: NodeKey) -> Result<&mut TabData, NavError> {
        match self.nodes.get_mut(key) {
            Some(NodeData::Tab(tab)) => Ok(tab),
            _ => Err(NavError::not_found("tab container")),
        }
    }

    pub(crate) fn pane(&self, key: NodeKey) -> Result<&PaneData, NavError> {
        match self.nodes.get(key) {
            Some(NodeData::Pane(pane)) => Ok(pane),
            _ => Err(NavError::not_found("pane container")),
        }
    }

    pub(crate) fn pane_mut(&mut self, key: NodeKey) -> Result<&mut PaneData, NavError> {
        match self.nodes.get_mut(key) {
            Some(NodeData::Pane(pane)) => Ok(pane),
            _ => Err(NavError::not_found("pane container")),
        }
    }

    // ========================================================================
    // Arena plumbing
    // ========================================================================

    /// Clone the tree, apply an in-place rewrite, and return the result.
    /// The rewritten tree is invariant-checked in debug builds.
    pub(crate) fn rewrite(
        &self,
        f: impl FnOnce(&mut Self) -> Result<(), NavError>,
    ) -> Result<Self, NavError> {
        let mut next = self.clone();
        f(&mut next)?;

        #[cfg(debug_assertions)]
        next.verify_invariants();

        Ok(next)
    }

    /// Remove a node and, recursively, everything below it.
    pub(crate) fn remove_subtree(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.remove(key) else {
            return;
        };

        match node {
            NodeData::Screen(_) => {}
            NodeData::Stack(stack) => {
                for &child in stack.children() {
                    self.remove_subtree(child);
                }
            }
            NodeData::Tab(tab) => {
                for &stack in tab.stacks() {
                    self.remove_subtree(stack);
                }
            }
            NodeData::Pane(pane) => {
                for slot in pane.slots() {
                    if let Some(content) = slot.content {
                        self.remove_subtree(content);
                    }
                }
            }
        }
    }

    /// Allocate a blueprint into the arena, wiring parent links. Returns
    /// the key of the subtree root. The new subtree is not attached to any
    /// parent's child list; the caller does that.
    pub(crate) fn graft(
        &mut self,
        blueprint: NodeBlueprint<D>,
        parent: Option<NodeKey>,
    ) -> Result<NodeKey, NavError> {
        match blueprint {
            NodeBlueprint::Screen(destination) => Ok(self
                .nodes
                .insert(NodeData::Screen(ScreenData::new(destination, parent)))),

            NodeBlueprint::Stack { children, scope } => {
                if children.is_empty() {
                    return Err(NavError::invariant("a stack cannot be empty"));
                }

                let key = self
                    .nodes
                    .insert(NodeData::Stack(StackData::new(scope, parent)));
                for child in children {
                    let child_key = self.graft(child, Some(key))?;
                    self.stack_mut(key)?.push_child(child_key);
                }
                Ok(key)
            }

            NodeBlueprint::Tab {
                tabs,
                initial_index,
                scope,
            } => {
                if tabs.is_empty() {
                    return Err(NavError::invariant("a tab container cannot be empty"));
                }
                if initial_index >= tabs.len() {
                    return Err(NavError::invariant(format!(
                        "initial tab index {initial_index} out of bounds for {} tabs",
                        tabs.len()
                    )));
                }

                let key = self.nodes.insert(NodeData::Tab(TabData::new(
                    initial_index,
                    initial_index,
                    scope,
                    parent,
                )));
                for tab in tabs {
                    let tab = Self::ensure_stack(tab);
                    let stack_key = self.graft(tab, Some(key))?;
                    self.tab_mut(key)?.push_stack(stack_key);
                }
                Ok(key)
            }

            NodeBlueprint::Pane {
                slots,
                active_role,
                back_behavior,
                scope,
            } => {
                if slots.is_empty() {
                    return Err(NavError::invariant("a pane container cannot be empty"));
                }

                let mut slots = slots;
                slots.sort_by_key(|slot| slot.role);
                let unique = slots
                    .windows(2)
                    .all(|pair| pair[0].role != pair[1].role);
                if !unique {
                    return Err(NavError::invariant("duplicate pane role"));
                }
                let active_ok = slots
                    .iter()
                    .any(|slot| slot.role == active_role && slot.content.is_some());
                if !active_ok {
                    return Err(NavError::invariant(
                        "the active pane role must have content",
                    ));
                }

                let key = self.nodes.insert(NodeData::Pane(PaneData::new(
                    active_role,
                    back_behavior,
                    scope,
                    parent,
                )));
                for slot in slots {
                    let content = match slot.content {
                        Some(blueprint) => {
                            Some(self.graft(Self::ensure_stack(blueprint), Some(key))?)
                        }
                        None => None,
                    };
                    self.pane_mut(key)?.push_slot(PaneSlot {
                        role: slot.role,
                        content,
                        adapt: slot.adapt,
                    });
                }
                Ok(key)
            }
        }
    }

    /// Wrap a blueprint in a stack unless it already is one. Tab entries
    /// and pane contents always host a stack so the back algorithm has a
    /// uniform subject.
    fn ensure_stack(blueprint: NodeBlueprint<D>) -> NodeBlueprint<D> {
        match blueprint {
            stack @ NodeBlueprint::Stack { .. } => stack,
            other => NodeBlueprint::stack(vec![other]),
        }
    }

    // ========================================================================
    // Invariant verification
    // ========================================================================

    /// Panic if the tree violates a structural invariant.
    ///
    /// Run after every rewrite in debug builds. A violation here means a
    /// bug in the engine, not in the host.
    pub fn verify_invariants(&self) {
        let root = self
            .nodes
            .get(self.root)
            .expect("root key must be present in the arena");
        assert!(
            matches!(root, NodeData::Stack(_)),
            "the root must be a stack"
        );
        assert_eq!(root.parent(), None, "the root must not have a parent");

        let mut visited = HashSet::new();
        self.verify_node(self.root, None, &mut visited);

        assert_eq!(
            visited.len(),
            self.nodes.len(),
            "every node must be reachable from the root"
        );
    }

    fn verify_node(
        &self,
        key: NodeKey,
        expected_parent: Option<NodeKey>,
        visited: &mut HashSet<NodeKey>,
    ) {
        assert!(visited.insert(key), "the tree must not contain cycles");

        let node = self.nodes.get(key).expect("child key must be present");
        assert_eq!(
            node.parent(),
            expected_parent,
            "parent link must match the actual parent"
        );

        match node {
            NodeData::Screen(_) => {}
            NodeData::Stack(stack) => {
                assert!(stack.child_count() > 0, "a stack must not be empty");
                for &child in stack.children() {
                    self.verify_node(child, Some(key), visited);
                }
            }
            NodeData::Tab(tab) => {
                assert!(!tab.is_empty(), "a tab container must not be empty");
                assert!(
                    tab.active_index() < tab.len(),
                    "the active tab index must be in bounds"
                );
                assert!(
                    tab.initial_index() < tab.len(),
                    "the initial tab index must be in bounds"
                );
                for &stack in tab.stacks() {
                    assert!(
                        matches!(self.nodes.get(stack), Some(NodeData::Stack(_))),
                        "every tab entry must be a stack"
                    );
                    self.verify_node(stack, Some(key), visited);
                }
            }
            NodeData::Pane(pane) => {
                assert!(!pane.slots().is_empty(), "a pane container must not be empty");
                let sorted = pane
                    .slots()
                    .windows(2)
                    .all(|pair| pair[0].role < pair[1].role);
                assert!(sorted, "pane slots must be unique and in priority order");
                let active = pane
                    .active_slot()
                    .expect("the active role must have a slot");
                assert!(
                    active.content.is_some(),
                    "the active pane slot must have content"
                );
                for slot in pane.slots() {
                    if let Some(content) = slot.content {
                        assert!(
                            matches!(self.nodes.get(content), Some(NodeData::Stack(_))),
                            "pane slot content must be a stack"
                        );
                        self.verify_node(content, Some(key), visited);
                    }
                }
            }
        }
    }

    // ========================================================================
    // Rendering and snapshots
    // ========================================================================

    /// Deterministic plain-text rendering of the tree, two-space indented,
    /// with `*` marking the active path. Meant for tests and logs.
    pub fn format_compact(&self) -> String {
        let active: HashSet<NodeKey> = self.active_path().into_iter().collect();
        let mut out = String::new();
        self.format_node(self.root, 0, &active, &mut out);
        // Drop the final newline so the dump embeds cleanly in assertions.
        let _ = out.pop();
        out
    }

    fn format_node(&self, key: NodeKey, depth: usize, active: &HashSet<NodeKey>, out: &mut String) {
        use std::fmt::Write as _;

        let Some(node) = self.nodes.get(key) else {
            return;
        };

        let indent = "  ".repeat(depth);
        let marker = if active.contains(&key) { " *" } else { "" };
        let scope = match node.scope() {
            Some(scope) => format!(" scope={scope}"),
            None => String::new(),
        };

        match node {
            NodeData::Screen(screen) => {
                let _ = writeln!(
                    out,
                    "{indent}screen \"{}\"{marker}",
                    screen.destination().label()
                );
            }
            NodeData::Stack(stack) => {
                let _ = writeln!(out, "{indent}stack{scope}{marker}");
                for &child in stack.children() {
                    self.format_node(child, depth + 1, active, out);
                }
            }
            NodeData::Tab(tab) => {
                let _ = writeln!(
                    out,
                    "{indent}tab active={} initial={}{scope}{marker}",
                    tab.active_index(),
                    tab.initial_index()
                );
                for &stack in tab.stacks() {
                    self.format_node(stack, depth + 1, active, out);
                }
            }
            NodeData::Pane(pane) => {
                let _ = writeln!(
                    out,
                    "{indent}pane active={} behavior={}{scope}{marker}",
                    pane.active_role(),
                    pane.back_behavior()
                );
                for slot in pane.slots() {
                    let slot_indent = "  ".repeat(depth + 1);
                    match slot.content {
                        Some(content) => {
                            let _ = writeln!(
                                out,
                                "{slot_indent}slot {} adapt={}",
                                slot.role, slot.adapt
                            );
                            self.format_node(content, depth + 2, active, out);
                        }
                        None => {
                            let _ = writeln!(
                                out,
                                "{slot_indent}slot {} adapt={} (empty)",
                                slot.role, slot.adapt
                            );
                        }
                    }
                }
            }
        }
    }

    /// Serializable snapshot of the whole tree.
    pub fn snapshot(&self) -> TreeNode {
        let active_leaf = self.active_leaf();
        self.snapshot_node(self.root, active_leaf)
    }

    fn snapshot_node(&self, key: NodeKey, active_leaf: Option<NodeKey>) -> TreeNode {
        let raw = key.data().as_ffi();
        match self.nodes.get(key) {
            Some(NodeData::Screen(screen)) => TreeNode::Screen {
                key: raw,
                label: screen.destination().label(),
                active: active_leaf == Some(key),
            },
            Some(NodeData::Stack(stack)) => TreeNode::Stack {
                key: raw,
                scope: stack.scope().map(str::to_owned),
                children: stack
                    .children()
                    .iter()
                    .map(|&child| self.snapshot_node(child, active_leaf))
                    .collect(),
            },
            Some(NodeData::Tab(tab)) => TreeNode::Tab {
                key: raw,
                scope: tab.scope().map(str::to_owned),
                active_index: tab.active_index(),
                initial_index: tab.initial_index(),
                tabs: tab
                    .stacks()
                    .iter()
                    .map(|&stack| self.snapshot_node(stack, active_leaf))
                    .collect(),
            },
            Some(NodeData::Pane(pane)) => TreeNode::Pane {
                key: raw,
                scope: pane.scope().map(str::to_owned),
                active_role: pane.active_role(),
                back_behavior: pane.back_behavior(),
                slots: pane
                    .slots()
                    .iter()
                    .map(|slot| PaneSlotSnapshot {
                        role: slot.role,
                        adapt: slot.adapt,
                        content: slot
                            .content
                            .map(|content| self.snapshot_node(content, active_leaf)),
                    })
                    .collect(),
            },
            None => TreeNode::Screen {
                key: raw,
                label: "<missing>".into(),
                active: false,
            },
        }
    }
}

#[cfg(test)]
mod tests;

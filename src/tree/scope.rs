//! Scope-aware push-target resolution.
//!
//! Containers can declare a scope: the subset of destinations they own.
//! A push targets the active stack unless a scoped boundary between that
//! stack and the root rejects the destination, in which case the push
//! escapes to the nearest stack above the boundary. Escapes only ever move
//! outward; a destination is never pushed into a scope it does not belong
//! to.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use super::node::{NodeData, NodeKey};
use super::{Destination, NavError, NavTree};

/// Scope membership, supplied by the host.
///
/// Typically generated from declarative metadata; the engine only ever
/// asks yes/no questions.
pub trait ScopeOracle<D: Destination> {
    /// Whether `destination` belongs to `scope`.
    fn is_in_scope(&self, scope: &str, destination: &D) -> bool;
}

impl<D: Destination, F> ScopeOracle<D> for F
where
    F: Fn(&str, &D) -> bool,
{
    fn is_in_scope(&self, scope: &str, destination: &D) -> bool {
        self(scope, destination)
    }
}

/// Map-backed [`ScopeOracle`] for hosts with static scope membership.
///
/// Destinations are tracked by id. A scope that was never inserted owns
/// nothing, so every destination escapes it.
#[derive(Debug, Clone)]
pub struct ScopeTable<D: Destination> {
    scopes: HashMap<String, HashSet<D::Id>>,
}

impl<D: Destination> ScopeTable<D> {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            scopes: HashMap::new(),
        }
    }

    /// Add a destination id to a scope.
    pub fn insert(&mut self, scope: impl Into<String>, id: D::Id) {
        self.scopes.entry(scope.into()).or_default().insert(id);
    }

    /// Builder-style [`ScopeTable::insert`].
    pub fn with(mut self, scope: impl Into<String>, id: D::Id) -> Self {
        self.insert(scope, id);
        self
    }
}

impl<D: Destination> Default for ScopeTable<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Destination> ScopeOracle<D> for ScopeTable<D> {
    fn is_in_scope(&self, scope: &str, destination: &D) -> bool {
        self.scopes
            .get(scope)
            .is_some_and(|members| members.contains(destination.id()))
    }
}

/// Find the stack a push of `destination` should land in.
///
/// Walks outward from the active stack. Each scoped boundary (tab, pane,
/// or scoped stack) between the candidate and the root either accepts the
/// destination, in which case the current candidate wins, or rejects it,
/// moving the candidate to the nearest stack above the boundary. An
/// unscoped tab or pane boundary accepts everything. If a rejecting
/// boundary has no stack above it, the walk clamps there: escape never
/// goes past the root.
pub fn resolve_push_target<D: Destination>(
    tree: &NavTree<D>,
    oracle: &dyn ScopeOracle<D>,
    destination: &D,
) -> Result<NodeKey, NavError> {
    let mut candidate = tree.active_stack()?;
    let mut cursor = candidate;

    loop {
        let Some((boundary, scope)) = next_boundary(tree, cursor) else {
            return Ok(candidate);
        };

        if oracle.is_in_scope(scope, destination) {
            return Ok(candidate);
        }

        let Some(escape) = enclosing_stack(tree, boundary) else {
            trace!(scope, "scope rejected the destination at the root, clamping");
            return Ok(candidate);
        };

        trace!(scope, "push escapes a scoped boundary");
        candidate = escape;
        cursor = escape;
    }
}

/// The nearest boundary at or above `from`: a tab or pane container, or a
/// stack that declares a scope. Returns `None` when the walk reaches the
/// root without one, or when the first tab or pane on the way up is
/// unscoped; an unscoped boundary accepts everything, so the caller's
/// candidate stands either way.
fn next_boundary<'a, D: Destination>(
    tree: &'a NavTree<D>,
    from: NodeKey,
) -> Option<(NodeKey, &'a str)> {
    let mut current = Some(from);
    while let Some(key) = current {
        let node = tree.get(key)?;
        match node {
            NodeData::Tab(_) | NodeData::Pane(_) => {
                // Tabs and panes are always boundaries; only scoped ones
                // can reject.
                return node.scope().map(|scope| (key, scope));
            }
            NodeData::Stack(stack) => {
                // The candidate itself may be a scoped stack.
                if let Some(scope) = stack.scope() {
                    return Some((key, scope));
                }
            }
            NodeData::Screen(_) => {}
        }
        current = node.parent();
    }
    None
}

/// The nearest stack strictly above a node.
fn enclosing_stack<D: Destination>(tree: &NavTree<D>, from: NodeKey) -> Option<NodeKey> {
    let mut current = tree.parent_of(from);
    while let Some(key) = current {
        match tree.get(key)? {
            NodeData::Stack(_) => return Some(key),
            node => current = node.parent(),
        }
    }
    None
}

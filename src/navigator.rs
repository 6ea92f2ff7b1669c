//! The navigation façade.
//!
//! [`Navigator`] owns the current tree as a single value and is its only
//! writer. Every intent is a `&mut self` method, so intents serialize
//! through ownership: readers never observe a tree mid-rewrite, and two
//! racing intents become two ordered calls. The tree functions themselves
//! are pure and safe to call from anywhere; the navigator is the one piece
//! meant to live on a single logical thread.
//!
//! Collaborators are explicit construction arguments, never process-wide
//! state: a scope oracle for push routing, a container factory for
//! destinations that expand into tab or pane sets, and a LIFO registry of
//! user back handlers consulted before the back resolver runs.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};
use veer_ipc::{BackOutcome, GestureSnapshot, PaneRole, TreeNode};

use crate::gesture::{BackGestureCoordinator, Began, GestureError, GestureOptions, GestureState};
use crate::tree::back::{self, BackResolution};
use crate::tree::scope::{resolve_push_target, ScopeOracle};
use crate::tree::{Destination, NavError, NavTree, NodeBlueprint, NodeData, NodeKey};

/// Engine tunables.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Gesture handling tunables.
    pub gesture: GestureOptions,
}

/// Builds subtrees for destinations that represent whole containers.
///
/// When the host navigates to such a destination, the engine grafts the
/// factory's blueprint instead of pushing a plain screen. Return `None`
/// for ordinary screen destinations.
pub trait ContainerFactory<D: Destination> {
    /// Blueprint for a container destination, `None` for a plain screen.
    fn container_for(&self, destination: &D) -> Option<NodeBlueprint<D>>;
}

/// A [`ContainerFactory`] for hosts whose destinations are all plain
/// screens.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContainers;

impl<D: Destination> ContainerFactory<D> for NoContainers {
    fn container_for(&self, _destination: &D) -> Option<NodeBlueprint<D>> {
        None
    }
}

/// Handle for unregistering a back handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackHandlerId(u64);

/// LIFO registry of user back handlers.
///
/// Handlers run newest first when a back intent arrives, before the back
/// resolver. A handler returning `true` consumes the event and the tree is
/// left untouched.
#[derive(Default)]
pub struct BackHandlerRegistry {
    handlers: Vec<(BackHandlerId, Box<dyn FnMut() -> bool>)>,
    next_id: u64,
}

impl BackHandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Newer handlers run first.
    pub fn register(&mut self, handler: impl FnMut() -> bool + 'static) -> BackHandlerId {
        let id = BackHandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns whether it was registered.
    pub fn unregister(&mut self, id: BackHandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Offer the event to handlers, newest first. Returns whether one
    /// consumed it.
    fn consume(&mut self) -> bool {
        self.handlers
            .iter_mut()
            .rev()
            .any(|(_, handler)| handler())
    }
}

impl fmt::Debug for BackHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackHandlerRegistry")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// The navigation engine façade.
pub struct Navigator<D: Destination> {
    tree: NavTree<D>,
    gesture: BackGestureCoordinator<D>,
    scopes: Rc<dyn ScopeOracle<D>>,
    factory: Rc<dyn ContainerFactory<D>>,
    back_handlers: BackHandlerRegistry,
    epoch: u64,
}

impl<D: Destination> Navigator<D> {
    /// A navigator without scopes or container destinations.
    pub fn new(initial: NodeBlueprint<D>) -> Result<Self, NavError> {
        Self::with_collaborators(
            initial,
            Rc::new(crate::tree::scope::ScopeTable::<D>::new()),
            Rc::new(NoContainers),
            Options::default(),
        )
    }

    /// A navigator with explicit collaborators.
    pub fn with_collaborators(
        initial: NodeBlueprint<D>,
        scopes: Rc<dyn ScopeOracle<D>>,
        factory: Rc<dyn ContainerFactory<D>>,
        options: Options,
    ) -> Result<Self, NavError> {
        let tree = NavTree::new(initial)?;
        Ok(Self {
            tree,
            gesture: BackGestureCoordinator::new(options.gesture),
            scopes,
            factory,
            back_handlers: BackHandlerRegistry::new(),
            epoch: 0,
        })
    }

    // ========================================================================
    // Observables
    // ========================================================================

    /// The current tree. Read-only; a new value is published per intent.
    pub fn tree(&self) -> &NavTree<D> {
        &self.tree
    }

    /// The current gesture state.
    pub fn gesture_state(&self) -> &GestureState {
        self.gesture.state()
    }

    /// Monotonic publish counter. A changed epoch means the tree changed;
    /// readers holding per-node state re-diff the key set.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Serializable snapshot of the current tree.
    pub fn snapshot(&self) -> TreeNode {
        self.tree.snapshot()
    }

    /// Serializable snapshot of the gesture state.
    pub fn gesture_snapshot(&self) -> GestureSnapshot {
        self.gesture.state().snapshot()
    }

    // ========================================================================
    // Navigation intents
    // ========================================================================

    /// Navigate to a destination.
    ///
    /// The scope oracle picks the target stack; the container factory
    /// decides whether the destination is a plain screen or expands into a
    /// whole container.
    pub fn navigate(&mut self, destination: D) -> Result<(), NavError> {
        self.interrupt_gesture();
        let target = resolve_push_target(&self.tree, &*self.scopes, &destination)?;
        let next = match self.factory.container_for(&destination) {
            Some(blueprint) => self.tree.push_subtree(target, blueprint)?,
            None => self.tree.push(target, destination)?,
        };
        debug!(?target, "navigate");
        self.publish(next);
        Ok(())
    }

    /// Handle a back intent.
    ///
    /// User back handlers run first, newest first; if none consume the
    /// event, the back resolver rewrites the tree or delegates to the
    /// host.
    pub fn navigate_back(&mut self) -> BackOutcome {
        self.interrupt_gesture();

        if self.back_handlers.consume() {
            debug!("back consumed by a user handler");
            return BackOutcome::ConsumedByHandler;
        }

        match back::resolve(&self.tree) {
            BackResolution::Handled(next) => {
                self.publish(next);
                BackOutcome::Handled
            }
            BackResolution::DelegateToHost => BackOutcome::DelegatedToHost,
            BackResolution::Rejected => {
                warn!("back resolution rejected a malformed tree");
                BackOutcome::DelegatedToHost
            }
        }
    }

    /// Replace the current screen with a destination.
    pub fn navigate_and_replace(&mut self, destination: D) -> Result<(), NavError> {
        self.interrupt_gesture();
        let next = self.tree.replace_current(destination)?;
        self.publish(next);
        Ok(())
    }

    /// Clear the target stack down to its first entry, then navigate.
    pub fn navigate_and_clear_to(&mut self, destination: D) -> Result<(), NavError> {
        self.interrupt_gesture();
        let target = resolve_push_target(&self.tree, &*self.scopes, &destination)?;
        let next = self.tree.clear_and_push(target, destination)?;
        self.publish(next);
        Ok(())
    }

    /// Switch the nearest tab container on the active path to a tab.
    pub fn switch_tab(&mut self, index: usize) -> Result<(), NavError> {
        self.interrupt_gesture();
        let tab = self.nearest_tab()?;
        let next = self.tree.switch_tab(tab, index)?;
        self.publish(next);
        Ok(())
    }

    /// Make another pane role active in the nearest pane container.
    pub fn set_active_pane(&mut self, role: PaneRole) -> Result<(), NavError> {
        self.interrupt_gesture();
        let pane = self.nearest_pane()?;
        let next = self.tree.set_active_pane(pane, role)?;
        self.publish(next);
        Ok(())
    }

    /// Push a destination into a specific pane of the nearest pane
    /// container. An empty slot gets a fresh stack.
    pub fn navigate_in_pane(&mut self, role: PaneRole, destination: D) -> Result<(), NavError> {
        self.interrupt_gesture();
        let pane = self.nearest_pane()?;

        let slot_content = match self.tree.get(pane) {
            Some(NodeData::Pane(data)) => data
                .slot(role)
                .ok_or_else(|| NavError::not_found(format!("pane role {role}")))?
                .content,
            _ => return Err(NavError::not_found("pane container")),
        };

        let next = match slot_content {
            Some(stack) => self.tree.push(stack, destination)?,
            None => self
                .tree
                .replace_pane_content(pane, role, NodeBlueprint::Screen(destination))?,
        };
        self.publish(next);
        Ok(())
    }

    /// Pop within a specific pane of the nearest pane container.
    pub fn back_in_pane(&mut self, role: PaneRole) -> Result<(), NavError> {
        self.interrupt_gesture();
        let pane = self.nearest_pane()?;
        let next = self.tree.pane_back(pane, role)?;
        self.publish(next);
        Ok(())
    }

    // ========================================================================
    // Back gestures
    // ========================================================================

    /// Begin a back gesture, planning its resolution once.
    pub fn start_back_gesture(&mut self) -> Result<Began, GestureError> {
        self.gesture.begin(&self.tree)
    }

    /// Update gesture progress. Never re-plans.
    pub fn update_back_gesture(&mut self, progress: f64) -> Result<f64, GestureError> {
        self.gesture.update(progress)
    }

    /// Whether gesture progress is at or beyond the commit threshold.
    pub fn gesture_past_commit_threshold(&self) -> bool {
        self.gesture.past_commit_threshold()
    }

    /// Commit the gesture, publishing the tree planned at start verbatim.
    pub fn commit_back_gesture(&mut self) -> Result<BackOutcome, GestureError> {
        let plan = self.gesture.commit()?;
        self.publish(plan.tree);
        Ok(BackOutcome::Handled)
    }

    /// Cancel the gesture. The published tree is untouched. Returns
    /// whether a gesture was in progress.
    pub fn cancel_back_gesture(&mut self) -> bool {
        self.gesture.cancel()
    }

    // ========================================================================
    // Back handlers
    // ========================================================================

    /// Register a user back handler. Newer handlers run first.
    pub fn register_back_handler(
        &mut self,
        handler: impl FnMut() -> bool + 'static,
    ) -> BackHandlerId {
        self.back_handlers.register(handler)
    }

    /// Remove a user back handler.
    pub fn unregister_back_handler(&mut self, id: BackHandlerId) -> bool {
        self.back_handlers.unregister(id)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn publish(&mut self, tree: NavTree<D>) {
        self.tree = tree;
        self.epoch += 1;
        trace!(epoch = self.epoch, nodes = self.tree.node_count(), "published tree");
    }

    /// A navigation intent arriving mid-gesture invalidates the gesture's
    /// plan, so the gesture is cancelled first.
    fn interrupt_gesture(&mut self) {
        if self.gesture.cancel() {
            warn!("navigation intent during a back gesture; gesture cancelled");
        }
    }

    fn nearest_tab(&self) -> Result<NodeKey, NavError> {
        let stack = self.tree.active_stack()?;
        self.tree
            .find_ancestor(stack, |node| matches!(node, NodeData::Tab(_)))
            .ok_or_else(|| NavError::not_found("tab container on the active path"))
    }

    fn nearest_pane(&self) -> Result<NodeKey, NavError> {
        let stack = self.tree.active_stack()?;
        self.tree
            .find_ancestor(stack, |node| matches!(node, NodeData::Pane(_)))
            .ok_or_else(|| NavError::not_found("pane container on the active path"))
    }
}

impl<D: Destination> fmt::Debug for Navigator<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("epoch", &self.epoch)
            .field("nodes", &self.tree.node_count())
            .field("gesture", self.gesture.state())
            .field("back_handlers", &self.back_handlers)
            .finish()
    }
}

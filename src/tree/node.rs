//! Node vocabulary for the navigation tree.
//!
//! Four node kinds form the tree: `Screen` leaves and three container
//! kinds (`Stack`, `Tab`, `Pane`). Nodes reference each other by
//! [`NodeKey`] only; the arena in [`super::NavTree`] owns the data.

use std::fmt;
use std::hash::Hash;

use arrayvec::ArrayVec;
use slotmap::new_key_type;
use veer_ipc::{AdaptStrategy, PaneBackBehavior, PaneRole};

new_key_type! {
    /// Key to reference a node in the navigation tree arena.
    pub struct NodeKey;
}

/// A destination a screen can show.
///
/// Destinations are opaque to the engine: it stores them, compares them by
/// [`Destination::Id`], and hands them back to the host. The engine never
/// looks inside.
pub trait Destination: Clone + fmt::Debug + 'static {
    /// Stable identity, used for scope membership and marker lookups.
    type Id: Clone + Eq + Hash + fmt::Debug;

    /// This destination's identity.
    fn id(&self) -> &Self::Id;

    /// Short label used in tree dumps and snapshots.
    fn label(&self) -> String {
        format!("{self:?}")
    }
}

/// Node type in the navigation tree.
#[derive(Debug, Clone)]
pub enum NodeData<D: Destination> {
    /// Leaf node showing a destination.
    Screen(ScreenData<D>),
    /// Ordered stack of child nodes; the last child is on top.
    Stack(StackData),
    /// Tabbed container holding one stack per tab.
    Tab(TabData),
    /// Multi-pane container holding one stack per occupied role.
    Pane(PaneData),
}

impl<D: Destination> NodeData<D> {
    /// Parent of this node, `None` only for the root.
    pub fn parent(&self) -> Option<NodeKey> {
        match self {
            NodeData::Screen(data) => data.parent,
            NodeData::Stack(data) => data.parent,
            NodeData::Tab(data) => data.parent,
            NodeData::Pane(data) => data.parent,
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeKey>) {
        match self {
            NodeData::Screen(data) => data.parent = parent,
            NodeData::Stack(data) => data.parent = parent,
            NodeData::Tab(data) => data.parent = parent,
            NodeData::Pane(data) => data.parent = parent,
        }
    }

    /// Scope this node declares as a boundary, if any.
    pub fn scope(&self) -> Option<&str> {
        match self {
            NodeData::Screen(_) => None,
            NodeData::Stack(data) => data.scope.as_deref(),
            NodeData::Tab(data) => data.scope.as_deref(),
            NodeData::Pane(data) => data.scope.as_deref(),
        }
    }

    /// Name of the node kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            NodeData::Screen(_) => "screen",
            NodeData::Stack(_) => "stack",
            NodeData::Tab(_) => "tab",
            NodeData::Pane(_) => "pane",
        }
    }

    pub(crate) fn as_stack(&self) -> Option<&StackData> {
        match self {
            NodeData::Stack(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn as_stack_mut(&mut self) -> Option<&mut StackData> {
        match self {
            NodeData::Stack(data) => Some(data),
            _ => None,
        }
    }
}

/// Payload of a `Screen` leaf.
#[derive(Debug, Clone)]
pub struct ScreenData<D> {
    destination: D,
    parent: Option<NodeKey>,
}

impl<D: Destination> ScreenData<D> {
    pub(crate) fn new(destination: D, parent: Option<NodeKey>) -> Self {
        Self {
            destination,
            parent,
        }
    }

    /// The destination this screen shows.
    pub fn destination(&self) -> &D {
        &self.destination
    }
}

/// Payload of a `Stack` container.
#[derive(Debug, Clone)]
pub struct StackData {
    children: Vec<NodeKey>,
    scope: Option<String>,
    parent: Option<NodeKey>,
}

impl StackData {
    pub(crate) fn new(scope: Option<String>, parent: Option<NodeKey>) -> Self {
        Self {
            children: Vec::new(),
            scope,
            parent,
        }
    }

    /// Children, bottom to top.
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Number of children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Whether a plain pop is legal here.
    pub fn can_pop(&self) -> bool {
        self.children.len() > 1
    }

    /// The top (active) child.
    pub fn top(&self) -> Option<NodeKey> {
        self.children.last().copied()
    }

    /// The bottom child.
    pub fn bottom(&self) -> Option<NodeKey> {
        self.children.first().copied()
    }

    /// Index of a child, if present.
    pub fn position_of(&self, key: NodeKey) -> Option<usize> {
        self.children.iter().position(|&child| child == key)
    }

    /// Scope this stack owns, if any.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub(crate) fn push_child(&mut self, key: NodeKey) {
        self.children.push(key);
    }

    pub(crate) fn pop_child(&mut self) -> Option<NodeKey> {
        self.children.pop()
    }

    pub(crate) fn remove_child(&mut self, key: NodeKey) -> Option<usize> {
        let idx = self.position_of(key)?;
        self.children.remove(idx);
        Some(idx)
    }

    pub(crate) fn set_child(&mut self, idx: usize, key: NodeKey) {
        self.children[idx] = key;
    }

    pub(crate) fn truncate_to_bottom(&mut self) -> Vec<NodeKey> {
        self.children.split_off(1)
    }
}

/// Payload of a `Tab` container.
#[derive(Debug, Clone)]
pub struct TabData {
    stacks: Vec<NodeKey>,
    active_index: usize,
    initial_index: usize,
    scope: Option<String>,
    parent: Option<NodeKey>,
}

impl TabData {
    pub(crate) fn new(
        active_index: usize,
        initial_index: usize,
        scope: Option<String>,
        parent: Option<NodeKey>,
    ) -> Self {
        Self {
            stacks: Vec::new(),
            active_index,
            initial_index,
            scope,
            parent,
        }
    }

    /// One stack per tab, in tab order.
    pub fn stacks(&self) -> &[NodeKey] {
        &self.stacks
    }

    /// Number of tabs.
    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    /// Whether the container has no tabs. Never true once built.
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Index of the currently shown tab.
    pub fn active_index(&self) -> usize {
        self.active_index
    }

    /// Index a back action returns to before the container is removed.
    pub fn initial_index(&self) -> usize {
        self.initial_index
    }

    /// Whether the active tab is the initial tab.
    pub fn is_at_initial(&self) -> bool {
        self.active_index == self.initial_index
    }

    /// Key of the currently shown tab's stack.
    pub fn active_stack(&self) -> Option<NodeKey> {
        self.stacks.get(self.active_index).copied()
    }

    /// Scope this container owns, if any.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub(crate) fn push_stack(&mut self, key: NodeKey) {
        self.stacks.push(key);
    }

    pub(crate) fn set_active_index(&mut self, index: usize) -> bool {
        if index < self.stacks.len() {
            self.active_index = index;
            true
        } else {
            false
        }
    }

    pub(crate) fn set_stack(&mut self, idx: usize, key: NodeKey) {
        self.stacks[idx] = key;
    }

    /// Remove the stack at `idx`, keeping the active and initial indices
    /// pointing at the same tabs where possible.
    pub(crate) fn remove_stack(&mut self, idx: usize) {
        self.stacks.remove(idx);
        let last = self.stacks.len().saturating_sub(1);
        if self.active_index > idx {
            self.active_index -= 1;
        }
        self.active_index = self.active_index.min(last);
        if self.initial_index > idx {
            self.initial_index -= 1;
        }
        self.initial_index = self.initial_index.min(last);
    }
}

/// One slot of a `Pane` container.
#[derive(Debug, Clone)]
pub struct PaneSlot {
    /// The slot's role.
    pub role: PaneRole,
    /// The slot's content stack, `None` while the slot is empty.
    pub content: Option<NodeKey>,
    /// How the slot behaves when the window cannot show it.
    pub adapt: AdaptStrategy,
}

/// Payload of a `Pane` container.
#[derive(Debug, Clone)]
pub struct PaneData {
    slots: ArrayVec<PaneSlot, 3>,
    active_role: PaneRole,
    back_behavior: PaneBackBehavior,
    scope: Option<String>,
    parent: Option<NodeKey>,
}

impl PaneData {
    pub(crate) fn new(
        active_role: PaneRole,
        back_behavior: PaneBackBehavior,
        scope: Option<String>,
        parent: Option<NodeKey>,
    ) -> Self {
        Self {
            slots: ArrayVec::new(),
            active_role,
            back_behavior,
            scope,
            parent,
        }
    }

    /// Slots in role-priority order.
    pub fn slots(&self) -> &[PaneSlot] {
        &self.slots
    }

    /// The currently active role.
    pub fn active_role(&self) -> PaneRole {
        self.active_role
    }

    /// The configured back behavior.
    pub fn back_behavior(&self) -> PaneBackBehavior {
        self.back_behavior
    }

    /// The slot for a role, if the container has one.
    pub fn slot(&self, role: PaneRole) -> Option<&PaneSlot> {
        self.slots.iter().find(|slot| slot.role == role)
    }

    pub(crate) fn slot_mut(&mut self, role: PaneRole) -> Option<&mut PaneSlot> {
        self.slots.iter_mut().find(|slot| slot.role == role)
    }

    /// The active slot. Always has content by invariant.
    pub fn active_slot(&self) -> Option<&PaneSlot> {
        self.slot(self.active_role)
    }

    /// Roles whose slots currently have content, in priority order.
    ///
    /// This is the container's scaffold value: the set of panes a renderer
    /// would show.
    pub fn visible_roles(&self) -> ArrayVec<PaneRole, 3> {
        self.slots
            .iter()
            .filter(|slot| slot.content.is_some())
            .map(|slot| slot.role)
            .collect()
    }

    /// First role with content, in priority order.
    pub fn first_role_with_content(&self) -> Option<PaneRole> {
        self.visible_roles().first().copied()
    }

    /// Scope this container owns, if any.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub(crate) fn push_slot(&mut self, slot: PaneSlot) {
        self.slots.push(slot);
    }

    pub(crate) fn set_active_role(&mut self, role: PaneRole) {
        self.active_role = role;
    }
}

/// A detached, key-less description of a subtree.
///
/// Blueprints are how subtrees enter a tree: the initial tree is built from
/// one, and container factories return one when a destination expands into
/// a whole tab or pane set. Grafting a blueprint allocates arena keys and
/// wires parent links in one pass.
#[derive(Debug, Clone)]
pub enum NodeBlueprint<D: Destination> {
    /// A single screen.
    Screen(D),
    /// A stack of children, bottom to top. Must not be empty.
    Stack {
        /// Children, bottom to top.
        children: Vec<NodeBlueprint<D>>,
        /// Scope this stack owns, if any.
        scope: Option<String>,
    },
    /// A tabbed container. Entries that are not stacks are wrapped in one.
    Tab {
        /// One entry per tab. Must not be empty.
        tabs: Vec<NodeBlueprint<D>>,
        /// Tab a back action returns to first.
        initial_index: usize,
        /// Scope this container owns, if any.
        scope: Option<String>,
    },
    /// A multi-pane container.
    Pane {
        /// Slots, at most one per role. Contents that are not stacks are
        /// wrapped in one.
        slots: Vec<PaneSlotBlueprint<D>>,
        /// Role active when the container first appears.
        active_role: PaneRole,
        /// Back behavior for the container.
        back_behavior: PaneBackBehavior,
        /// Scope this container owns, if any.
        scope: Option<String>,
    },
}

/// One slot of a [`NodeBlueprint::Pane`].
#[derive(Debug, Clone)]
pub struct PaneSlotBlueprint<D: Destination> {
    /// The slot's role.
    pub role: PaneRole,
    /// The slot's initial content, `None` for an empty slot.
    pub content: Option<NodeBlueprint<D>>,
    /// The slot's adapt strategy.
    pub adapt: AdaptStrategy,
}

impl<D: Destination> NodeBlueprint<D> {
    /// A stack holding the given entries, bottom to top.
    pub fn stack(children: Vec<NodeBlueprint<D>>) -> Self {
        NodeBlueprint::Stack {
            children,
            scope: None,
        }
    }

    /// A stack holding a single screen.
    pub fn stack_of(destination: D) -> Self {
        Self::stack(vec![NodeBlueprint::Screen(destination)])
    }

    /// A scoped stack holding the given entries.
    pub fn scoped_stack(scope: impl Into<String>, children: Vec<NodeBlueprint<D>>) -> Self {
        NodeBlueprint::Stack {
            children,
            scope: Some(scope.into()),
        }
    }

    /// A tabbed container with the given tabs, starting at tab 0.
    pub fn tabs(tabs: Vec<NodeBlueprint<D>>) -> Self {
        NodeBlueprint::Tab {
            tabs,
            initial_index: 0,
            scope: None,
        }
    }

    /// A pane slot with content.
    pub fn slot(role: PaneRole, content: NodeBlueprint<D>) -> PaneSlotBlueprint<D> {
        PaneSlotBlueprint {
            role,
            content: Some(content),
            adapt: AdaptStrategy::default(),
        }
    }

    /// An empty pane slot.
    pub fn empty_slot(role: PaneRole) -> PaneSlotBlueprint<D> {
        PaneSlotBlueprint {
            role,
            content: None,
            adapt: AdaptStrategy::default(),
        }
    }
}

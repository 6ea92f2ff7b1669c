//! Types for interfacing with the veer navigation engine.
//!
//! The engine itself lives in the `veer` crate; this crate defines the
//! vocabulary shared between the engine and its hosts: pane roles and
//! back-behavior selectors used when constructing trees, and serializable
//! snapshots of the current tree and gesture state that can cross a process
//! boundary (debugging tools, state inspectors, remote shells).
//!
//! Snapshots are plain data. They carry the node keys of the live tree as
//! opaque `u64`s so a host can correlate successive snapshots (a key that
//! disappears between two snapshots means that node was popped or cascaded
//! away), but they cannot be turned back into a live tree.

#![warn(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of a pane within a multi-pane layout.
///
/// Variant order is priority order: when the active pane loses its content,
/// the engine activates the first remaining role in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaneRole {
    /// The main content pane.
    Primary,
    /// A secondary pane, typically detail or list-adjacent content.
    Supporting,
    /// An auxiliary pane, shown only when space allows.
    Extra,
}

impl PaneRole {
    /// All roles in priority order.
    pub const ALL: [PaneRole; 3] = [PaneRole::Primary, PaneRole::Supporting, PaneRole::Extra];

    /// The snake_case name used in serialized forms and tree dumps.
    pub fn as_str(self) -> &'static str {
        match self {
            PaneRole::Primary => "primary",
            PaneRole::Supporting => "supporting",
            PaneRole::Extra => "extra",
        }
    }
}

impl fmt::Display for PaneRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a back action behaves when it reaches a multi-pane container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaneBackBehavior {
    /// Pop a single entry from the active pane.
    #[default]
    PopLatest,
    /// Keep popping until the set of panes with content changes.
    PopUntilScaffoldValueChange,
    /// Keep popping until a different pane becomes active.
    PopUntilActiveChange,
    /// Pop a single entry from the first pane that has one, preferring the
    /// active pane.
    PopUntilContentChange,
}

impl PaneBackBehavior {
    /// The snake_case name used in serialized forms and tree dumps.
    pub fn as_str(self) -> &'static str {
        match self {
            PaneBackBehavior::PopLatest => "pop_latest",
            PaneBackBehavior::PopUntilScaffoldValueChange => "pop_until_scaffold_value_change",
            PaneBackBehavior::PopUntilActiveChange => "pop_until_active_change",
            PaneBackBehavior::PopUntilContentChange => "pop_until_content_change",
        }
    }
}

impl fmt::Display for PaneBackBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a pane behaves when the window cannot show it.
///
/// The engine records the strategy per pane slot and reports it in
/// snapshots; applying it (hiding, floating, reflowing into another pane)
/// is the renderer's job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptStrategy {
    /// Hide the pane entirely.
    #[default]
    Hide,
    /// Float the pane above the remaining panes.
    Levitate,
    /// Reflow the pane's content into the primary pane.
    Reflow,
}

impl AdaptStrategy {
    /// The snake_case name used in serialized forms and tree dumps.
    pub fn as_str(self) -> &'static str {
        match self {
            AdaptStrategy::Hide => "hide",
            AdaptStrategy::Levitate => "levitate",
            AdaptStrategy::Reflow => "reflow",
        }
    }
}

impl fmt::Display for AdaptStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a back request, as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackOutcome {
    /// A registered back handler consumed the event; the tree is unchanged.
    ConsumedByHandler,
    /// The engine rewrote the tree.
    Handled,
    /// Nothing left to pop; the host should act (close the window, run the
    /// platform back action).
    DelegatedToHost,
}

/// Serializable snapshot of one node of a navigation tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    /// A leaf showing a destination.
    Screen {
        /// Key of the live node.
        key: u64,
        /// Host-provided label for the destination.
        label: String,
        /// Whether this is the active leaf of the tree.
        active: bool,
    },
    /// An ordered stack of nodes; the last child is on top.
    Stack {
        /// Key of the live node.
        key: u64,
        /// Scope this stack owns, if any.
        scope: Option<String>,
        /// Children, bottom to top.
        children: Vec<TreeNode>,
    },
    /// A tabbed container with one stack per tab.
    Tab {
        /// Key of the live node.
        key: u64,
        /// Scope this container owns, if any.
        scope: Option<String>,
        /// Index of the currently shown tab.
        active_index: usize,
        /// Index of the tab a back action returns to first.
        initial_index: usize,
        /// One stack per tab.
        tabs: Vec<TreeNode>,
    },
    /// A multi-pane container.
    Pane {
        /// Key of the live node.
        key: u64,
        /// Scope this container owns, if any.
        scope: Option<String>,
        /// The currently active role.
        active_role: PaneRole,
        /// The configured back behavior.
        back_behavior: PaneBackBehavior,
        /// Slots in role-priority order.
        slots: Vec<PaneSlotSnapshot>,
    },
}

impl TreeNode {
    /// Key of the live node this snapshot was taken from.
    pub fn key(&self) -> u64 {
        match *self {
            TreeNode::Screen { key, .. }
            | TreeNode::Stack { key, .. }
            | TreeNode::Tab { key, .. }
            | TreeNode::Pane { key, .. } => key,
        }
    }

    /// All keys in this snapshot, depth first.
    pub fn keys(&self) -> Vec<u64> {
        let mut out = Vec::new();
        self.collect_keys(&mut out);
        out
    }

    fn collect_keys(&self, out: &mut Vec<u64>) {
        out.push(self.key());
        match self {
            TreeNode::Screen { .. } => {}
            TreeNode::Stack { children, .. } => {
                for child in children {
                    child.collect_keys(out);
                }
            }
            TreeNode::Tab { tabs, .. } => {
                for tab in tabs {
                    tab.collect_keys(out);
                }
            }
            TreeNode::Pane { slots, .. } => {
                for slot in slots {
                    if let Some(content) = &slot.content {
                        content.collect_keys(out);
                    }
                }
            }
        }
    }
}

/// One pane slot in a [`TreeNode::Pane`] snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaneSlotSnapshot {
    /// The slot's role.
    pub role: PaneRole,
    /// The slot's adapt strategy.
    pub adapt: AdaptStrategy,
    /// The slot's content, if the slot currently has any.
    pub content: Option<TreeNode>,
}

/// Serializable snapshot of the back-gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GestureSnapshot {
    /// No gesture is in progress.
    Idle,
    /// A gesture is in progress and previewing a back result.
    Proposed {
        /// Key of the node that will visually leave on commit.
        exit: u64,
        /// Key of the node revealed on commit.
        target: u64,
        /// Gesture progress in `0.0..=1.0`.
        progress: f64,
    },
}

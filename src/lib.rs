//! veer is a navigation-state engine for applications with nested,
//! heterogeneous navigation topologies: linear stacks, tabbed sections
//! with independent per-tab stacks, and adaptive multi-pane layouts.
//!
//! The engine maintains a single navigation tree and resolves two
//! operations against it: "go to destination X" and "go back". Going back
//! cascades: a stack down to its last entry removes itself from its
//! parent, a tab container returns to its initial tab before cascading out
//! whole, and pane containers drain under a configurable behavior. Back
//! can also run as a cancellable gesture, previewing exactly the tree that
//! a commit will publish.
//!
//! Rendering, animation, and dependency injection are the host's concern.
//! The engine publishes a tree value and a gesture state; hosts diff the
//! key sets of successive trees to find out which nodes disappeared.
//!
//! ```
//! use veer::{BackOutcome, Navigator, NodeBlueprint};
//!
//! #[derive(Debug, Clone, PartialEq, Eq)]
//! struct Dest(&'static str);
//!
//! impl veer::Destination for Dest {
//!     type Id = &'static str;
//!
//!     fn id(&self) -> &Self::Id {
//!         &self.0
//!     }
//! }
//!
//! let mut nav = Navigator::new(NodeBlueprint::stack_of(Dest("home"))).unwrap();
//! nav.navigate(Dest("details")).unwrap();
//! assert_eq!(nav.navigate_back(), BackOutcome::Handled);
//!
//! // The last screen is the host's to close.
//! assert_eq!(nav.navigate_back(), BackOutcome::DelegatedToHost);
//! ```

pub mod gesture;
pub mod navigator;
pub mod tree;

pub use gesture::{BackGestureCoordinator, Began, GestureError, GestureOptions, GestureState};
pub use navigator::{
    BackHandlerId, BackHandlerRegistry, ContainerFactory, Navigator, NoContainers, Options,
};
pub use tree::back::{BackKind, BackPlan, BackPlanOutcome, BackResolution};
pub use tree::scope::{ScopeOracle, ScopeTable};
pub use tree::{Destination, NavError, NavTree, NodeBlueprint, NodeKey};
pub use veer_ipc::{AdaptStrategy, BackOutcome, GestureSnapshot, PaneBackBehavior, PaneRole};

#[cfg(test)]
mod tests;

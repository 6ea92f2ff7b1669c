//! Cascading back resolution.
//!
//! One recursive decision procedure covers every tree shape: a plain pop,
//! a one-entry stack cascading into its grandparent, a tab container at its
//! initial tab cascading out whole, and pane containers draining under
//! their configured back behavior. The resolver never mutates the current
//! tree; it produces a plan holding the rewritten tree, which the caller
//! publishes (or, for gestures, holds until commit).

use tracing::trace;
use veer_ipc::PaneBackBehavior;

use super::node::{NodeData, NodeKey};
use super::{Destination, NavError, NavTree};

/// What a back action does to the tree.
#[derive(Debug)]
pub enum BackResolution<D: Destination> {
    /// The tree was rewritten.
    Handled(NavTree<D>),
    /// Nothing left to pop; the host should act.
    DelegateToHost,
    /// The tree was malformed and no resolution was possible. Does not
    /// occur while the structural invariants hold.
    Rejected,
}

/// Which rewrite a back plan performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackKind {
    /// Pop the top entry of a stack.
    Pop,
    /// Remove a whole container that had nothing left to pop.
    RemoveContainer,
    /// Switch a tab container back to its initial tab.
    SwitchTab,
    /// Drain a pane container under its back behavior.
    Pane,
}

/// A precomputed back resolution.
///
/// `exit` is the node that visually leaves, resolved against the pre-back
/// tree: a screen for a plain pop, or a whole stack/tab/pane container
/// when the resolution cascades. `target` is the active leaf of the
/// resulting tree; its key is also present in the pre-back tree, which is
/// what lets a gesture preview the reveal before committing.
#[derive(Debug, Clone)]
pub struct BackPlan<D: Destination> {
    /// The node that visually leaves.
    pub exit: NodeKey,
    /// The node revealed once the plan is applied.
    pub target: NodeKey,
    /// Which rewrite the plan performs.
    pub kind: BackKind,
    /// The resulting tree, applied verbatim on commit.
    pub tree: NavTree<D>,
}

/// Outcome of planning a back action.
#[derive(Debug)]
pub enum BackPlanOutcome<D: Destination> {
    /// A back action is possible; here is what it does.
    Plan(BackPlan<D>),
    /// Nothing left to pop; the host should act.
    DelegateToHost,
    /// The tree was malformed. Does not occur while invariants hold.
    Rejected,
}

/// Resolve a back action against a tree.
pub fn resolve<D: Destination>(tree: &NavTree<D>) -> BackResolution<D> {
    match plan(tree) {
        BackPlanOutcome::Plan(plan) => BackResolution::Handled(plan.tree),
        BackPlanOutcome::DelegateToHost => BackResolution::DelegateToHost,
        BackPlanOutcome::Rejected => BackResolution::Rejected,
    }
}

/// Plan a back action without touching the input tree.
pub fn plan<D: Destination>(tree: &NavTree<D>) -> BackPlanOutcome<D> {
    let Ok(active_stack) = tree.active_stack() else {
        return BackPlanOutcome::Rejected;
    };

    // The container directly above the active stack gets first say: a tab
    // container away from its initial tab switches back regardless of how
    // deep the current tab's stack is, and a pane container always applies
    // its configured behavior.
    if let Some(parent) = tree.parent_of(active_stack) {
        match tree.get(parent) {
            Some(NodeData::Tab(tab)) if !tab.is_at_initial() => {
                return switch_tab_plan(tree, parent);
            }
            Some(NodeData::Pane(_)) => return pane_plan(tree, parent),
            _ => {}
        }
    }

    match tree.stack(active_stack) {
        Ok(stack) if stack.can_pop() => pop_plan(tree, active_stack),
        Ok(_) => resolve_removal(tree, active_stack),
        Err(_) => BackPlanOutcome::Rejected,
    }
}

fn pop_plan<D: Destination>(tree: &NavTree<D>, stack: NodeKey) -> BackPlanOutcome<D> {
    let mut next = tree.clone();
    let Ok(exit) = next.pop_stack_in_place(stack) else {
        return BackPlanOutcome::Rejected;
    };
    let Some(target) = next.active_leaf() else {
        return BackPlanOutcome::Rejected;
    };

    BackPlanOutcome::Plan(BackPlan {
        exit,
        target,
        kind: BackKind::Pop,
        tree: next,
    })
}

fn switch_tab_plan<D: Destination>(tree: &NavTree<D>, tab: NodeKey) -> BackPlanOutcome<D> {
    let Ok(data) = tree.tab(tab) else {
        return BackPlanOutcome::Rejected;
    };
    let Some(exit) = data.active_stack() else {
        return BackPlanOutcome::Rejected;
    };
    let initial = data.initial_index();

    let mut next = tree.clone();
    let Ok(tab_mut) = next.tab_mut(tab) else {
        return BackPlanOutcome::Rejected;
    };
    tab_mut.set_active_index(initial);

    let Some(target) = next.active_leaf() else {
        return BackPlanOutcome::Rejected;
    };

    BackPlanOutcome::Plan(BackPlan {
        exit,
        target,
        kind: BackKind::SwitchTab,
        tree: next,
    })
}

/// The cascade: the subject has nothing left to pop, so it wants to leave
/// the tree. Walk upward until an ancestor can absorb the removal, a tab
/// container intercepts with a switch to its initial tab, a pane container
/// applies its behavior, or the root is reached and the action belongs to
/// the host.
fn resolve_removal<D: Destination>(tree: &NavTree<D>, start: NodeKey) -> BackPlanOutcome<D> {
    let mut subject = start;
    loop {
        let Some(parent) = tree.parent_of(subject) else {
            // The subject is the root; emptying it is the host's call.
            return BackPlanOutcome::DelegateToHost;
        };

        match tree.get(parent) {
            Some(NodeData::Stack(stack)) => {
                if stack.child_count() > 1 {
                    let mut next = tree.clone();
                    if next.remove_stack_child_in_place(parent, subject).is_err() {
                        return BackPlanOutcome::Rejected;
                    }
                    let Some(target) = next.active_leaf() else {
                        return BackPlanOutcome::Rejected;
                    };
                    trace!(kind = "remove", "back cascades a container out of its stack");
                    return BackPlanOutcome::Plan(BackPlan {
                        exit: subject,
                        target,
                        kind: BackKind::RemoveContainer,
                        tree: next,
                    });
                }
                // The subject is its parent's only entry; the parent wants
                // to leave too.
                subject = parent;
            }
            Some(NodeData::Tab(tab)) => {
                if !tab.is_at_initial() {
                    return switch_tab_plan(tree, parent);
                }
                // Already at the initial tab: the whole container cascades.
                subject = parent;
            }
            Some(NodeData::Pane(_)) => return pane_plan(tree, parent),
            _ => return BackPlanOutcome::Rejected,
        }
    }
}

/// Drain a pane container under its configured behavior.
///
/// Every behavior iterates the same micro-step (pop the chosen slot's
/// stack, or clear the slot once its stack is down to one entry) under its
/// own termination condition, so cascade correctness is shared. A
/// container where no step is possible at all cascades out whole.
fn pane_plan<D: Destination>(tree: &NavTree<D>, pane: NodeKey) -> BackPlanOutcome<D> {
    let Ok(data) = tree.pane(pane) else {
        return BackPlanOutcome::Rejected;
    };
    let behavior = data.back_behavior();
    let initial_active = data.active_role();
    let initial_visible = data.visible_roles();

    let mut next = tree.clone();
    let mut first_exit = None;
    let mut steps = 0usize;

    loop {
        match pane_step(&mut next, pane, behavior) {
            Ok(removed) => {
                first_exit.get_or_insert(removed);
                steps += 1;
            }
            Err(_) => {
                if steps == 0 {
                    // Nothing inside the container can pop or clear; the
                    // container itself is spent.
                    trace!("pane container is spent, cascading it out");
                    return resolve_removal(tree, pane);
                }
                break;
            }
        }

        let Ok(now) = next.pane(pane) else {
            return BackPlanOutcome::Rejected;
        };
        let done = match behavior {
            PaneBackBehavior::PopLatest | PaneBackBehavior::PopUntilContentChange => true,
            PaneBackBehavior::PopUntilActiveChange => now.active_role() != initial_active,
            PaneBackBehavior::PopUntilScaffoldValueChange => {
                now.visible_roles() != initial_visible
            }
        };
        if done {
            break;
        }
    }

    trace!(steps, behavior = %behavior, "pane back behavior applied");

    let Some(exit) = first_exit else {
        return BackPlanOutcome::Rejected;
    };
    let Some(target) = next.active_leaf() else {
        return BackPlanOutcome::Rejected;
    };

    BackPlanOutcome::Plan(BackPlan {
        exit,
        target,
        kind: BackKind::Pane,
        tree: next,
    })
}

/// One pane back step. Returns the key removed from the tree.
fn pane_step<D: Destination>(
    tree: &mut NavTree<D>,
    pane: NodeKey,
    behavior: PaneBackBehavior,
) -> Result<NodeKey, NavError> {
    let data = tree.pane(pane)?;
    let mut role = data.active_role();

    // PopUntilContentChange may reach past an exhausted active slot to the
    // first slot, in priority order, that can still pop.
    if behavior == PaneBackBehavior::PopUntilContentChange {
        let can_pop = |key: Option<NodeKey>| {
            key.is_some_and(|content| {
                tree.stack(content)
                    .map(|stack| stack.can_pop())
                    .unwrap_or(false)
            })
        };
        let active_poppable = can_pop(data.active_slot().and_then(|slot| slot.content));
        if !active_poppable {
            let other = data
                .visible_roles()
                .into_iter()
                .find(|&r| can_pop(data.slot(r).and_then(|slot| slot.content)));
            if let Some(other) = other {
                role = other;
            }
        }
    }

    let content = tree
        .pane(pane)?
        .slot(role)
        .and_then(|slot| slot.content)
        .ok_or_else(|| NavError::not_found(format!("content for pane role {role}")))?;

    if tree.stack(content)?.can_pop() {
        tree.pop_stack_in_place(content)
    } else {
        tree.clear_pane_slot_in_place(pane, role)
    }
}

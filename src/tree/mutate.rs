//! Tree rewrites.
//!
//! Every operation here is pure: it takes `&self`, clones the arena,
//! applies the change to the clone, and returns the new tree or an
//! explicit failure. Compound operations (`clear_and_push`,
//! `replace_current`) are single atomic rewrites, so no caller can observe
//! an intermediate state.

use veer_ipc::PaneRole;

use super::node::{NodeBlueprint, NodeData, NodeKey, ScreenData};
use super::{Destination, NavError, NavTree};

impl<D: Destination> NavTree<D> {
    /// Push a new screen onto a stack.
    pub fn push(&self, target: NodeKey, destination: D) -> Result<Self, NavError> {
        self.rewrite(|tree| {
            tree.stack(target)?;
            let screen = tree
                .nodes
                .insert(NodeData::Screen(ScreenData::new(destination, Some(target))));
            tree.stack_mut(target)?.push_child(screen);
            Ok(())
        })
    }

    /// Graft a blueprint subtree onto a stack as its new top entry.
    ///
    /// This is how container destinations enter the tree: the factory's
    /// blueprint for a tab or pane set lands on the target stack as one
    /// entry.
    pub fn push_subtree(
        &self,
        target: NodeKey,
        blueprint: NodeBlueprint<D>,
    ) -> Result<Self, NavError> {
        self.rewrite(|tree| {
            tree.stack(target)?;
            let subtree = tree.graft(blueprint, Some(target))?;
            tree.stack_mut(target)?.push_child(subtree);
            Ok(())
        })
    }

    /// Pop the top entry of the active stack.
    ///
    /// Only legal while the stack has more than one child; removing the
    /// last entry is a cascade decision, not a bare pop.
    pub fn pop(&self) -> Result<Self, NavError> {
        let stack = self.active_stack()?;
        self.pop_stack(stack)
    }

    /// Pop the top entry of a specific stack.
    pub fn pop_stack(&self, stack: NodeKey) -> Result<Self, NavError> {
        self.rewrite(|tree| {
            tree.pop_stack_in_place(stack).map(|_| ())
        })
    }

    /// Switch a tab container to another tab.
    pub fn switch_tab(&self, tab: NodeKey, index: usize) -> Result<Self, NavError> {
        self.rewrite(|tree| {
            let data = tree.tab_mut(tab)?;
            if !data.set_active_index(index) {
                return Err(NavError::not_found(format!(
                    "tab index {index} (container has {} tabs)",
                    data.len()
                )));
            }
            Ok(())
        })
    }

    /// Make another pane role active. The role must have content.
    pub fn set_active_pane(&self, pane: NodeKey, role: PaneRole) -> Result<Self, NavError> {
        self.rewrite(|tree| {
            let data = tree.pane_mut(pane)?;
            match data.slot(role) {
                Some(slot) if slot.content.is_some() => {
                    data.set_active_role(role);
                    Ok(())
                }
                _ => Err(NavError::not_found(format!("pane role {role} with content"))),
            }
        })
    }

    /// Replace a pane slot's content with a grafted blueprint.
    pub fn replace_pane_content(
        &self,
        pane: NodeKey,
        role: PaneRole,
        blueprint: NodeBlueprint<D>,
    ) -> Result<Self, NavError> {
        self.rewrite(|tree| {
            if tree.pane(pane)?.slot(role).is_none() {
                return Err(NavError::not_found(format!("pane role {role}")));
            }

            let content = tree.graft(Self::ensure_stack(blueprint), Some(pane))?;
            let slot = tree
                .pane_mut(pane)?
                .slot_mut(role)
                .expect("slot presence checked above");
            let old = slot.content.replace(content);
            if let Some(old) = old {
                tree.remove_subtree(old);
            }
            Ok(())
        })
    }

    /// Pane-scoped back: pop the given role's stack, or clear the slot when
    /// its stack is down to one entry and another slot still has content.
    pub fn pane_back(&self, pane: NodeKey, role: PaneRole) -> Result<Self, NavError> {
        self.rewrite(|tree| {
            let data = tree.pane(pane)?;
            let slot = data
                .slot(role)
                .ok_or_else(|| NavError::not_found(format!("pane role {role}")))?;
            let content = slot
                .content
                .ok_or_else(|| NavError::not_found(format!("content for pane role {role}")))?;

            if tree.stack(content)?.can_pop() {
                tree.pop_stack_in_place(content)?;
            } else {
                tree.clear_pane_slot_in_place(pane, role)?;
            }
            Ok(())
        })
    }

    /// Replace a node with a grafted blueprint, keeping its position in the
    /// parent.
    pub fn replace_node(&self, key: NodeKey, blueprint: NodeBlueprint<D>) -> Result<Self, NavError> {
        self.rewrite(|tree| {
            if !tree.contains(key) {
                return Err(NavError::not_found("node to replace"));
            }

            if key == tree.root {
                let blueprint = Self::ensure_stack(blueprint);
                let new_root = tree.graft(blueprint, None)?;
                tree.remove_subtree(key);
                tree.root = new_root;
                return Ok(());
            }

            let parent = tree
                .parent_of(key)
                .expect("non-root node must have a parent");
            match tree.nodes.get(parent) {
                Some(NodeData::Stack(stack)) => {
                    let idx = stack
                        .position_of(key)
                        .ok_or_else(|| NavError::not_found("node in its parent stack"))?;
                    let replacement = tree.graft(blueprint, Some(parent))?;
                    tree.stack_mut(parent)?.set_child(idx, replacement);
                }
                Some(NodeData::Tab(tab)) => {
                    let idx = tab
                        .stacks()
                        .iter()
                        .position(|&stack| stack == key)
                        .ok_or_else(|| NavError::not_found("stack in its tab container"))?;
                    let replacement = tree.graft(Self::ensure_stack(blueprint), Some(parent))?;
                    tree.tab_mut(parent)?.set_stack(idx, replacement);
                }
                Some(NodeData::Pane(pane)) => {
                    let role = pane
                        .slots()
                        .iter()
                        .find(|slot| slot.content == Some(key))
                        .map(|slot| slot.role)
                        .ok_or_else(|| NavError::not_found("content in its pane container"))?;
                    let replacement = tree.graft(Self::ensure_stack(blueprint), Some(parent))?;
                    tree.pane_mut(parent)?
                        .slot_mut(role)
                        .expect("slot found above")
                        .content = Some(replacement);
                }
                _ => return Err(NavError::not_found("parent of node to replace")),
            }

            tree.remove_subtree(key);
            Ok(())
        })
    }

    /// Remove a node (and its subtree) from the tree.
    ///
    /// Rejected when it would empty a stack, a tab container, or a pane
    /// container; cascading a container out whole is the back resolver's
    /// job, not this primitive's.
    pub fn remove_node(&self, key: NodeKey) -> Result<Self, NavError> {
        self.rewrite(|tree| {
            if key == tree.root {
                return Err(NavError::invariant("cannot remove the root"));
            }
            if !tree.contains(key) {
                return Err(NavError::not_found("node to remove"));
            }

            let parent = tree
                .parent_of(key)
                .expect("non-root node must have a parent");
            match tree.nodes.get(parent) {
                Some(NodeData::Stack(stack)) => {
                    if stack.child_count() == 1 {
                        let reason = if parent == tree.root {
                            "removing the last entry would empty the root"
                        } else {
                            "removing the last entry would empty its stack"
                        };
                        return Err(NavError::invariant(reason));
                    }
                    if tree.stack_mut(parent)?.remove_child(key).is_none() {
                        return Err(NavError::not_found("child in its parent stack"));
                    }
                    tree.remove_subtree(key);
                }
                Some(NodeData::Tab(tab)) => {
                    if tab.len() == 1 {
                        return Err(NavError::invariant(
                            "removing the last tab would empty its container",
                        ));
                    }
                    let idx = tab
                        .stacks()
                        .iter()
                        .position(|&stack| stack == key)
                        .ok_or_else(|| NavError::not_found("stack in its tab container"))?;
                    tree.tab_mut(parent)?.remove_stack(idx);
                    tree.remove_subtree(key);
                }
                Some(NodeData::Pane(pane)) => {
                    let role = pane
                        .slots()
                        .iter()
                        .find(|slot| slot.content == Some(key))
                        .map(|slot| slot.role)
                        .ok_or_else(|| NavError::not_found("content in its pane container"))?;
                    tree.clear_pane_slot_in_place(parent, role)?;
                }
                _ => return Err(NavError::not_found("parent of node to remove")),
            }
            Ok(())
        })
    }

    /// Clear a stack down to its bottom entry, then push a new screen.
    /// A single atomic rewrite.
    pub fn clear_and_push(&self, target: NodeKey, destination: D) -> Result<Self, NavError> {
        self.rewrite(|tree| {
            let removed = tree.stack_mut(target)?.truncate_to_bottom();
            for key in removed {
                tree.remove_subtree(key);
            }
            let screen = tree
                .nodes
                .insert(NodeData::Screen(ScreenData::new(destination, Some(target))));
            tree.stack_mut(target)?.push_child(screen);
            Ok(())
        })
    }

    /// Replace the top entry of the active stack with a new screen.
    /// A single atomic rewrite.
    pub fn replace_current(&self, destination: D) -> Result<Self, NavError> {
        let stack = self.active_stack()?;
        self.rewrite(|tree| {
            let old = tree
                .stack_mut(stack)?
                .pop_child()
                .expect("a stack is never empty");
            tree.remove_subtree(old);
            let screen = tree
                .nodes
                .insert(NodeData::Screen(ScreenData::new(destination, Some(stack))));
            tree.stack_mut(stack)?.push_child(screen);
            Ok(())
        })
    }

    // ========================================================================
    // In-place steps shared with the back resolver
    // ========================================================================

    /// Pop the top entry of a stack in place. Returns the removed key.
    pub(crate) fn pop_stack_in_place(&mut self, stack: NodeKey) -> Result<NodeKey, NavError> {
        let data = self.stack_mut(stack)?;
        if !data.can_pop() {
            return Err(NavError::invariant(
                "popping the last entry of a stack is a cascade decision",
            ));
        }
        let removed = data.pop_child().expect("can_pop implies a child");
        self.remove_subtree(removed);
        Ok(removed)
    }

    /// Remove a child from a parent stack in place, subtree included.
    /// The parent must keep at least one child.
    pub(crate) fn remove_stack_child_in_place(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
    ) -> Result<(), NavError> {
        let data = self.stack_mut(parent)?;
        if data.child_count() <= 1 {
            return Err(NavError::invariant(
                "removing the last entry would empty its stack",
            ));
        }
        data.remove_child(child)
            .ok_or_else(|| NavError::not_found("child in its parent stack"))?;
        self.remove_subtree(child);
        Ok(())
    }

    /// Clear a pane slot's content in place, retargeting the active role if
    /// the cleared slot was active. Rejected when no other slot has
    /// content; an empty pane container must cascade away instead.
    pub(crate) fn clear_pane_slot_in_place(
        &mut self,
        pane: NodeKey,
        role: PaneRole,
    ) -> Result<NodeKey, NavError> {
        let data = self.pane(pane)?;
        let others = data
            .visible_roles()
            .into_iter()
            .any(|visible| visible != role);
        if !others {
            return Err(NavError::invariant(
                "clearing the last pane content would empty its container",
            ));
        }

        let data = self.pane_mut(pane)?;
        let slot = data
            .slot_mut(role)
            .ok_or_else(|| NavError::not_found(format!("pane role {role}")))?;
        let content = slot
            .content
            .take()
            .ok_or_else(|| NavError::not_found(format!("content for pane role {role}")))?;

        if data.active_role() == role {
            let next = data
                .first_role_with_content()
                .expect("another slot has content");
            data.set_active_role(next);
        }

        self.remove_subtree(content);
        Ok(content)
    }
}

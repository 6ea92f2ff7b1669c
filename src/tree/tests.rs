use std::collections::HashSet;

use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use proptest::collection::vec;
use proptest::prelude::*;
use proptest_derive::Arbitrary;
use veer_ipc::{AdaptStrategy, PaneBackBehavior, PaneRole};

use super::back::{self, BackKind, BackPlanOutcome, BackResolution};
use super::scope::{resolve_push_target, ScopeTable};
use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
struct TestDest(&'static str);

impl Destination for TestDest {
    type Id = &'static str;

    fn id(&self) -> &Self::Id {
        &self.0
    }

    fn label(&self) -> String {
        self.0.to_owned()
    }
}

fn screen(name: &'static str) -> NodeBlueprint<TestDest> {
    NodeBlueprint::Screen(TestDest(name))
}

fn stack(children: Vec<NodeBlueprint<TestDest>>) -> NodeBlueprint<TestDest> {
    NodeBlueprint::stack(children)
}

fn slot(
    role: PaneRole,
    content: NodeBlueprint<TestDest>,
) -> PaneSlotBlueprint<TestDest> {
    NodeBlueprint::slot(role, content)
}

fn pane(
    behavior: PaneBackBehavior,
    slots: Vec<PaneSlotBlueprint<TestDest>>,
) -> NodeBlueprint<TestDest> {
    NodeBlueprint::Pane {
        slots,
        active_role: PaneRole::Primary,
        back_behavior: behavior,
        scope: None,
    }
}

fn build(blueprint: NodeBlueprint<TestDest>) -> NavTree<TestDest> {
    let tree = NavTree::new(blueprint).unwrap();
    tree.verify_invariants();
    tree
}

fn active_label(tree: &NavTree<TestDest>) -> &'static str {
    let leaf = tree.active_leaf().expect("active path must end in a screen");
    match tree.get(leaf) {
        Some(NodeData::Screen(data)) => data.destination().0,
        _ => unreachable!(),
    }
}

fn only_tab(tree: &NavTree<TestDest>) -> NodeKey {
    tree.keys()
        .find(|&key| matches!(tree.get(key), Some(NodeData::Tab(_))))
        .expect("tree has a tab container")
}

fn only_pane(tree: &NavTree<TestDest>) -> NodeKey {
    tree.keys()
        .find(|&key| matches!(tree.get(key), Some(NodeData::Pane(_))))
        .expect("tree has a pane container")
}

fn resolve_handled(tree: &NavTree<TestDest>) -> NavTree<TestDest> {
    match back::resolve(tree) {
        BackResolution::Handled(next) => {
            next.verify_invariants();
            next
        }
        other => panic!("expected back to be handled, got {other:?}"),
    }
}

fn key_set(tree: &NavTree<TestDest>) -> HashSet<NodeKey> {
    tree.keys().collect()
}

// ============================================================================
// Construction and queries
// ============================================================================

#[test]
fn root_is_always_a_stack() {
    let tree = build(screen("home"));
    assert!(matches!(tree.get(tree.root()), Some(NodeData::Stack(_))));
    assert_eq!(active_label(&tree), "home");
}

#[test]
fn empty_stack_blueprint_is_rejected() {
    let err = NavTree::<TestDest>::new(NodeBlueprint::stack(vec![])).unwrap_err();
    assert!(matches!(err, NavError::InvariantViolation { .. }));
}

#[test]
fn tab_blueprint_with_bad_initial_index_is_rejected() {
    let err = NavTree::new(NodeBlueprint::Tab {
        tabs: vec![screen("a")],
        initial_index: 3,
        scope: None,
    })
    .unwrap_err();
    assert!(matches!(err, NavError::InvariantViolation { .. }));
}

#[test]
fn pane_blueprint_needs_content_for_the_active_role() {
    let err = NavTree::new(NodeBlueprint::Pane {
        slots: vec![NodeBlueprint::<TestDest>::empty_slot(PaneRole::Primary)],
        active_role: PaneRole::Primary,
        back_behavior: PaneBackBehavior::PopLatest,
        scope: None,
    })
    .unwrap_err();
    assert!(matches!(err, NavError::InvariantViolation { .. }));
}

#[test]
fn pane_blueprint_rejects_duplicate_roles() {
    let err = NavTree::new(NodeBlueprint::Pane {
        slots: vec![
            slot(PaneRole::Primary, screen("a")),
            slot(PaneRole::Primary, screen("b")),
        ],
        active_role: PaneRole::Primary,
        back_behavior: PaneBackBehavior::PopLatest,
        scope: None,
    })
    .unwrap_err();
    assert!(matches!(err, NavError::InvariantViolation { .. }));
}

#[test]
fn active_path_descends_through_containers() {
    let tree = build(stack(vec![
        screen("home"),
        NodeBlueprint::Tab {
            tabs: vec![
                stack(vec![screen("feed")]),
                stack(vec![screen("search"), screen("result")]),
            ],
            initial_index: 0,
            scope: None,
        },
    ]));

    // The tab starts at its initial index.
    assert_eq!(active_label(&tree), "feed");

    let tab = only_tab(&tree);
    let switched = tree.switch_tab(tab, 1).unwrap();
    assert_eq!(active_label(&switched), "result");

    let path = switched.active_path();
    assert_eq!(path.first().copied(), Some(switched.root()));
    assert_eq!(path.last().copied(), switched.active_leaf());
}

#[test]
fn find_by_key_returns_none_for_removed_nodes() {
    let tree = build(stack(vec![screen("a"), screen("b")]));
    let leaf = tree.active_leaf().unwrap();

    let popped = tree.pop().unwrap();
    assert!(tree.contains(leaf));
    assert!(!popped.contains(leaf));
    assert!(popped.get(leaf).is_none());
}

// ============================================================================
// Mutator
// ============================================================================

#[test]
fn push_appends_to_the_target_stack() {
    let tree = build(stack(vec![screen("home")]));
    let target = tree.active_stack().unwrap();

    let pushed = tree.push(target, TestDest("details")).unwrap();
    pushed.verify_invariants();

    assert_eq!(active_label(&pushed), "details");
    assert_eq!(active_label(&tree), "home");
    // Unchanged nodes keep their keys across the rewrite.
    assert!(key_set(&tree).is_subset(&key_set(&pushed)));
}

#[test]
fn pop_undoes_push() {
    let tree = build(stack(vec![screen("home"), screen("feed")]));
    let target = tree.active_stack().unwrap();

    let pushed = tree.push(target, TestDest("details")).unwrap();
    let popped = pushed.pop().unwrap();

    assert_eq!(key_set(&popped), key_set(&tree));
    assert_eq!(popped.format_compact(), tree.format_compact());
}

#[test]
fn pop_rejects_the_last_entry() {
    let tree = build(stack(vec![screen("home")]));
    let err = tree.pop().unwrap_err();
    assert!(matches!(err, NavError::InvariantViolation { .. }));
}

#[test]
fn push_to_a_missing_stack_is_not_found() {
    let tree = build(stack(vec![screen("a"), screen("b")]));
    let leaf = tree.active_leaf().unwrap();

    // A screen is not a stack.
    let err = tree.push(leaf, TestDest("c")).unwrap_err();
    assert!(matches!(err, NavError::NotFound { .. }));

    // A popped key no longer resolves at all.
    let popped = tree.pop().unwrap();
    let err = popped.push(leaf, TestDest("c")).unwrap_err();
    assert!(matches!(err, NavError::NotFound { .. }));
}

#[test]
fn switch_tab_rejects_an_out_of_range_index() {
    let tree = build(stack(vec![NodeBlueprint::tabs(vec![
        stack(vec![screen("a")]),
        stack(vec![screen("b")]),
    ])]));
    let tab = only_tab(&tree);

    let err = tree.switch_tab(tab, 2).unwrap_err();
    assert!(matches!(err, NavError::NotFound { .. }));
}

#[test]
fn clear_and_push_keeps_the_bottom_entry() {
    let tree = build(stack(vec![screen("a"), screen("b"), screen("c")]));
    let target = tree.active_stack().unwrap();

    let cleared = tree.clear_and_push(target, TestDest("d")).unwrap();
    cleared.verify_invariants();

    assert_snapshot!(cleared.format_compact(), @r#"
    stack *
      screen "a"
      screen "d" *
    "#);
}

#[test]
fn replace_current_swaps_the_top_entry() {
    let tree = build(stack(vec![screen("a"), screen("b")]));
    let replaced = tree.replace_current(TestDest("c")).unwrap();

    assert_eq!(active_label(&replaced), "c");
    assert_eq!(replaced.stack(replaced.root()).unwrap().child_count(), 2);
}

#[test]
fn remove_node_rejects_emptying_the_root() {
    let tree = build(stack(vec![screen("only")]));
    let leaf = tree.active_leaf().unwrap();

    let err = tree.remove_node(leaf).unwrap_err();
    assert!(matches!(err, NavError::InvariantViolation { .. }));
    assert!(matches!(
        tree.remove_node(tree.root()).unwrap_err(),
        NavError::InvariantViolation { .. }
    ));
}

#[test]
fn replace_node_splices_a_container_in_place() {
    let tree = build(stack(vec![screen("home"), screen("old")]));
    let leaf = tree.active_leaf().unwrap();

    let replaced = tree
        .replace_node(
            leaf,
            NodeBlueprint::tabs(vec![stack(vec![screen("a")]), stack(vec![screen("b")])]),
        )
        .unwrap();
    replaced.verify_invariants();

    assert!(!replaced.contains(leaf));
    assert_eq!(active_label(&replaced), "a");
    assert_eq!(
        replaced.stack(replaced.root()).unwrap().child_count(),
        2
    );
}

#[test]
fn set_active_pane_requires_content() {
    let tree = build(stack(vec![NodeBlueprint::Pane {
        slots: vec![
            slot(PaneRole::Primary, screen("main")),
            NodeBlueprint::empty_slot(PaneRole::Extra),
        ],
        active_role: PaneRole::Primary,
        back_behavior: PaneBackBehavior::PopLatest,
        scope: None,
    }]));
    let pane_key = only_pane(&tree);

    let err = tree.set_active_pane(pane_key, PaneRole::Extra).unwrap_err();
    assert!(matches!(err, NavError::NotFound { .. }));

    let err = tree
        .set_active_pane(pane_key, PaneRole::Supporting)
        .unwrap_err();
    assert!(matches!(err, NavError::NotFound { .. }));
}

#[test]
fn replace_pane_content_swaps_a_slot() {
    let tree = build(stack(vec![pane(
        PaneBackBehavior::PopLatest,
        vec![
            slot(PaneRole::Primary, screen("inbox")),
            slot(PaneRole::Supporting, screen("filters")),
        ],
    )]));
    let pane_key = only_pane(&tree);

    let replaced = tree
        .replace_pane_content(pane_key, PaneRole::Supporting, screen("search"))
        .unwrap();
    replaced.verify_invariants();

    let switched = replaced
        .set_active_pane(pane_key, PaneRole::Supporting)
        .unwrap();
    assert_eq!(active_label(&switched), "search");
}

// ============================================================================
// Back resolution: stacks
// ============================================================================

#[test]
fn back_pops_the_active_stack() {
    let tree = build(stack(vec![screen("home"), screen("details")]));
    let next = resolve_handled(&tree);
    assert_eq!(active_label(&next), "home");
}

#[test]
fn back_on_the_last_root_entry_delegates_to_host() {
    let tree = build(stack(vec![screen("home")]));
    assert!(matches!(back::resolve(&tree), BackResolution::DelegateToHost));
}

#[test]
fn back_cascades_a_one_entry_nested_stack() {
    let tree = build(stack(vec![screen("a"), stack(vec![screen("b")])]));
    assert_snapshot!(tree.format_compact(), @r#"
    stack *
      screen "a"
      stack *
        screen "b" *
    "#);

    let next = resolve_handled(&tree);
    assert_snapshot!(next.format_compact(), @r#"
    stack *
      screen "a" *
    "#);
}

#[test]
fn back_cascades_through_nested_one_entry_stacks() {
    // Two levels of one-entry stacks between the screen and the root.
    let tree = build(stack(vec![
        screen("a"),
        stack(vec![stack(vec![screen("b")])]),
    ]));

    let next = resolve_handled(&tree);
    assert_eq!(active_label(&next), "a");
    assert_eq!(next.node_count(), 2);
}

#[test]
fn back_plan_reports_exit_and_target() {
    let tree = build(stack(vec![screen("a"), stack(vec![screen("b")])]));
    let nested = tree
        .keys()
        .find(|&key| key != tree.root() && matches!(tree.get(key), Some(NodeData::Stack(_))))
        .unwrap();

    let BackPlanOutcome::Plan(plan) = back::plan(&tree) else {
        panic!("expected a plan");
    };

    // The whole nested stack leaves; the sibling screen is revealed.
    assert_eq!(plan.kind, BackKind::RemoveContainer);
    assert_eq!(plan.exit, nested);
    assert_eq!(plan.target, plan.tree.active_leaf().unwrap());
    assert_eq!(active_label(&plan.tree), "a");
    // Planning never touches the input tree.
    assert_eq!(active_label(&tree), "b");
}

// ============================================================================
// Back resolution: tabs
// ============================================================================

fn tab_tree() -> NavTree<TestDest> {
    build(stack(vec![
        screen("home"),
        NodeBlueprint::Tab {
            tabs: vec![
                stack(vec![screen("feed")]),
                stack(vec![screen("search"), screen("result")]),
            ],
            initial_index: 0,
            scope: None,
        },
    ]))
}

#[test]
fn back_returns_to_the_initial_tab_before_popping() {
    let tree = tab_tree();
    let tab = only_tab(&tree);
    let switched = tree.switch_tab(tab, 1).unwrap();
    assert_eq!(active_label(&switched), "result");
    let nodes_before = switched.node_count();

    // Even though the current tab's stack has two screens, back switches
    // tabs and removes nothing.
    let next = resolve_handled(&switched);
    assert_eq!(active_label(&next), "feed");
    assert_eq!(next.node_count(), nodes_before);
    assert_eq!(next.tab(tab).unwrap().active_index(), 0);
}

#[test]
fn back_switch_plan_is_a_switch_tab_kind() {
    let tree = tab_tree();
    let tab = only_tab(&tree);
    let switched = tree.switch_tab(tab, 1).unwrap();

    let BackPlanOutcome::Plan(plan) = back::plan(&switched) else {
        panic!("expected a plan");
    };
    assert_eq!(plan.kind, BackKind::SwitchTab);
    assert_eq!(plan.exit, switched.tab(tab).unwrap().stacks()[1]);
    assert_eq!(plan.target, plan.tree.active_leaf().unwrap());
}

#[test]
fn back_at_the_initial_tab_pops_within_the_tab() {
    let tree = tab_tree();
    let tab = only_tab(&tree);
    let switched = tree.switch_tab(tab, 1).unwrap();
    let back_once = resolve_handled(&switched); // back to initial tab

    let feed_stack = back_once.tab(tab).unwrap().stacks()[0];
    let deeper = back_once.push(feed_stack, TestDest("story")).unwrap();
    assert_eq!(active_label(&deeper), "story");

    let next = resolve_handled(&deeper);
    assert_eq!(active_label(&next), "feed");
    assert_eq!(next.tab(tab).unwrap().active_index(), 0);
}

#[test]
fn back_cascades_a_spent_tab_container_out_whole() {
    // The tab container sits alone in a stack that has a sibling screen.
    let tree = build(stack(vec![
        screen("a"),
        stack(vec![NodeBlueprint::tabs(vec![
            stack(vec![screen("b")]),
            stack(vec![screen("c")]),
        ])]),
    ]));
    let tab = only_tab(&tree);
    assert_eq!(active_label(&tree), "b");

    // At the initial tab with nothing to pop: the whole container (and its
    // enclosing one-entry stack) cascades away, revealing the sibling.
    let next = resolve_handled(&tree);
    assert_eq!(active_label(&next), "a");
    assert!(!next.contains(tab));
    assert_eq!(next.node_count(), 2);
}

// ============================================================================
// Back resolution: panes
// ============================================================================

fn mail_tree(behavior: PaneBackBehavior) -> NavTree<TestDest> {
    build(stack(vec![
        screen("home"),
        pane(
            behavior,
            vec![
                slot(
                    PaneRole::Primary,
                    stack(vec![screen("inbox"), screen("message")]),
                ),
                slot(PaneRole::Supporting, screen("filters")),
            ],
        ),
    ]))
}

fn visible_roles(tree: &NavTree<TestDest>) -> Vec<PaneRole> {
    let pane_key = only_pane(tree);
    tree.pane(pane_key).unwrap().visible_roles().to_vec()
}

#[test]
fn pop_latest_pops_one_entry_from_the_active_pane() {
    let tree = mail_tree(PaneBackBehavior::PopLatest);
    assert_eq!(active_label(&tree), "message");

    let next = resolve_handled(&tree);
    assert_eq!(active_label(&next), "inbox");
    assert_eq!(
        visible_roles(&next),
        vec![PaneRole::Primary, PaneRole::Supporting]
    );
}

#[test]
fn pop_latest_clears_a_spent_active_pane() {
    let tree = mail_tree(PaneBackBehavior::PopLatest);
    let once = resolve_handled(&tree); // message popped
    let twice = resolve_handled(&once); // primary slot cleared

    assert_eq!(active_label(&twice), "filters");
    assert_eq!(visible_roles(&twice), vec![PaneRole::Supporting]);
    assert_eq!(
        twice.pane(only_pane(&twice)).unwrap().active_role(),
        PaneRole::Supporting
    );
}

#[test]
fn pop_until_active_change_drains_the_active_pane_in_one_back() {
    let tree = mail_tree(PaneBackBehavior::PopUntilActiveChange);

    let next = resolve_handled(&tree);
    assert_eq!(active_label(&next), "filters");
    assert_eq!(visible_roles(&next), vec![PaneRole::Supporting]);
}

#[test]
fn pop_until_scaffold_change_stops_when_a_pane_disappears() {
    let tree = mail_tree(PaneBackBehavior::PopUntilScaffoldValueChange);

    let next = resolve_handled(&tree);
    assert_eq!(visible_roles(&next), vec![PaneRole::Supporting]);
    assert_eq!(active_label(&next), "filters");
}

#[test]
fn pop_until_content_change_reaches_past_an_exhausted_active_pane() {
    // Primary cannot pop; supporting can.
    let tree = build(stack(vec![pane(
        PaneBackBehavior::PopUntilContentChange,
        vec![
            slot(PaneRole::Primary, screen("inbox")),
            slot(
                PaneRole::Supporting,
                stack(vec![screen("filters"), screen("filter-edit")]),
            ),
        ],
    )]));
    let pane_key = only_pane(&tree);

    let next = resolve_handled(&tree);
    // The supporting pane popped; the active pane did not change.
    assert_eq!(next.pane(pane_key).unwrap().active_role(), PaneRole::Primary);
    assert_eq!(active_label(&next), "inbox");
    assert_eq!(
        visible_roles(&next),
        vec![PaneRole::Primary, PaneRole::Supporting]
    );
}

#[test]
fn back_cascades_a_spent_pane_container_out_whole() {
    let tree = build(stack(vec![
        screen("home"),
        pane(
            PaneBackBehavior::PopLatest,
            vec![slot(PaneRole::Primary, screen("solo"))],
        ),
    ]));
    let pane_key = only_pane(&tree);

    let next = resolve_handled(&tree);
    assert_eq!(active_label(&next), "home");
    assert!(!next.contains(pane_key));
}

#[test]
fn pane_back_pops_a_specific_pane() {
    let tree = mail_tree(PaneBackBehavior::PopLatest);
    let pane_key = only_pane(&tree);

    let next = tree.pane_back(pane_key, PaneRole::Primary).unwrap();
    assert_eq!(active_label(&next), "inbox");

    // The supporting pane is down to one entry, so a pane-scoped back
    // clears the slot.
    let next = next.pane_back(pane_key, PaneRole::Supporting).unwrap();
    assert_eq!(visible_roles(&next), vec![PaneRole::Primary]);
}

// ============================================================================
// Scope resolution
// ============================================================================

fn library_oracle() -> ScopeTable<TestDest> {
    ScopeTable::new()
        .with("library", "shelves")
        .with("library", "book")
}

#[test]
fn push_lands_in_the_active_stack_when_in_scope() {
    let tree = build(stack(vec![
        screen("home"),
        NodeBlueprint::Tab {
            tabs: vec![stack(vec![screen("shelves")])],
            initial_index: 0,
            scope: Some("library".into()),
        },
    ]));
    let oracle = library_oracle();

    let target = resolve_push_target(&tree, &oracle, &TestDest("book")).unwrap();
    assert_eq!(target, tree.active_stack().unwrap());
}

#[test]
fn push_escapes_a_scope_that_rejects_the_destination() {
    let tree = build(stack(vec![
        screen("home"),
        NodeBlueprint::Tab {
            tabs: vec![stack(vec![screen("shelves")])],
            initial_index: 0,
            scope: Some("library".into()),
        },
    ]));
    let oracle = library_oracle();

    let target = resolve_push_target(&tree, &oracle, &TestDest("settings")).unwrap();
    assert_eq!(target, tree.root());

    let pushed = tree.push(target, TestDest("settings")).unwrap();
    assert_eq!(active_label(&pushed), "settings");
    assert_eq!(pushed.stack(pushed.root()).unwrap().child_count(), 3);
}

#[test]
fn a_scoped_stack_is_a_boundary_of_its_own() {
    let tree = build(stack(vec![
        screen("home"),
        NodeBlueprint::scoped_stack("wizard", vec![screen("step1")]),
    ]));
    let oracle = ScopeTable::new()
        .with("wizard", "step1")
        .with("wizard", "step2");

    let inside = resolve_push_target(&tree, &oracle, &TestDest("step2")).unwrap();
    assert_ne!(inside, tree.root());

    let outside = resolve_push_target(&tree, &oracle, &TestDest("other")).unwrap();
    assert_eq!(outside, tree.root());
}

#[test]
fn an_unscoped_tab_accepts_everything() {
    let tree = tab_tree();
    let oracle = ScopeTable::new();

    let target = resolve_push_target(&tree, &oracle, &TestDest("anything")).unwrap();
    assert_eq!(target, tree.active_stack().unwrap());
}

#[test]
fn escape_clamps_at_the_root() {
    let tree = build(NodeBlueprint::scoped_stack("app", vec![screen("home")]));
    let oracle = ScopeTable::new();

    // The root scope rejects the destination, but there is nothing above
    // it to escape to.
    let target = resolve_push_target(&tree, &oracle, &TestDest("anywhere")).unwrap();
    assert_eq!(target, tree.root());
}

// ============================================================================
// Property tests
// ============================================================================

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Op {
    Push(#[proptest(strategy = "0..6usize")] usize),
    Back,
    Replace(#[proptest(strategy = "0..6usize")] usize),
    ClearTo(#[proptest(strategy = "0..6usize")] usize),
    SwitchTab(#[proptest(strategy = "0..3usize")] usize),
}

const CATALOG: [&str; 6] = ["home", "feed", "search", "detail", "tabs", "split"];

fn op_blueprint(name: &'static str) -> Option<NodeBlueprint<TestDest>> {
    match name {
        "tabs" => Some(NodeBlueprint::tabs(vec![
            stack(vec![screen("feed")]),
            stack(vec![screen("search")]),
        ])),
        "split" => Some(pane(
            PaneBackBehavior::PopUntilActiveChange,
            vec![
                slot(PaneRole::Primary, screen("inbox")),
                slot(PaneRole::Supporting, screen("filters")),
            ],
        )),
        _ => None,
    }
}

fn apply_op(tree: &NavTree<TestDest>, op: Op) -> NavTree<TestDest> {
    let next = match op {
        Op::Push(idx) => {
            let name = CATALOG[idx];
            let target = match tree.active_stack() {
                Ok(target) => target,
                Err(_) => return tree.clone(),
            };
            match op_blueprint(name) {
                Some(blueprint) => tree.push_subtree(target, blueprint),
                None => tree.push(target, TestDest(name)),
            }
        }
        Op::Back => {
            return match back::resolve(tree) {
                BackResolution::Handled(next) => next,
                _ => tree.clone(),
            };
        }
        Op::Replace(idx) => tree.replace_current(TestDest(CATALOG[idx])),
        Op::ClearTo(idx) => match tree.active_stack() {
            Ok(target) => tree.clear_and_push(target, TestDest(CATALOG[idx])),
            Err(err) => Err(err),
        },
        Op::SwitchTab(index) => {
            let tab = tree
                .active_path()
                .into_iter()
                .rev()
                .find(|&key| matches!(tree.get(key), Some(NodeData::Tab(_))));
            match tab {
                Some(tab) => tree.switch_tab(tab, index),
                None => return tree.clone(),
            }
        }
    };
    next.unwrap_or_else(|_| tree.clone())
}

proptest! {
    #[test]
    fn random_operations_preserve_invariants(ops in vec(any::<Op>(), 0..40)) {
        let mut tree = build(stack(vec![screen("home")]));
        for op in ops {
            tree = apply_op(&tree, op);
            tree.verify_invariants();
            // The root never empties.
            prop_assert!(tree.stack(tree.root()).unwrap().child_count() > 0);
            // The active path always ends in a screen.
            prop_assert!(tree.active_leaf().is_some());
        }
    }

    #[test]
    fn back_never_produces_an_empty_root(ops in vec(any::<Op>(), 0..25)) {
        let mut tree = build(stack(vec![screen("home")]));
        for op in ops {
            tree = apply_op(&tree, op);
        }
        // Drain the tree with back until it delegates; the root must stay
        // populated the whole way down.
        for _ in 0..200 {
            match back::resolve(&tree) {
                BackResolution::Handled(next) => {
                    next.verify_invariants();
                    prop_assert!(next.stack(next.root()).unwrap().child_count() > 0);
                    tree = next;
                }
                BackResolution::DelegateToHost => break,
                BackResolution::Rejected => prop_assert!(false, "back rejected a valid tree"),
            }
        }
    }

    #[test]
    fn plan_matches_resolve(ops in vec(any::<Op>(), 0..25)) {
        let mut tree = build(stack(vec![screen("home")]));
        for op in ops {
            tree = apply_op(&tree, op);
        }

        match (back::plan(&tree), back::resolve(&tree)) {
            (BackPlanOutcome::Plan(plan), BackResolution::Handled(resolved)) => {
                prop_assert_eq!(plan.tree.format_compact(), resolved.format_compact());
                prop_assert!(tree.contains(plan.exit));
                prop_assert!(tree.contains(plan.target));
                prop_assert!(!plan.tree.contains(plan.exit) || plan.kind == BackKind::SwitchTab);
            }
            (BackPlanOutcome::DelegateToHost, BackResolution::DelegateToHost) => {}
            (plan, resolved) => {
                prop_assert!(false, "plan {:?} disagrees with resolve {:?}", plan, resolved);
            }
        }
    }
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn format_compact_shows_the_active_path() {
    let tree = tab_tree();
    let tab = only_tab(&tree);
    let switched = tree.switch_tab(tab, 1).unwrap();

    assert_snapshot!(switched.format_compact(), @r#"
    stack *
      screen "home"
      tab active=1 initial=0 *
        stack
          screen "feed"
        stack *
          screen "search"
          screen "result" *
    "#);
}

#[test]
fn format_compact_shows_pane_slots() {
    let tree = mail_tree(PaneBackBehavior::PopLatest);

    assert_snapshot!(tree.format_compact(), @r#"
    stack *
      screen "home"
      pane active=primary behavior=pop_latest *
        slot primary adapt=hide
          stack *
            screen "inbox"
            screen "message" *
        slot supporting adapt=hide
          stack
            screen "filters"
    "#);
}

#[test]
fn snapshot_export_mirrors_the_tree() {
    let tree = tab_tree();
    let exported = tree.snapshot();

    // Same node population, same keys.
    let mut live: Vec<u64> = tree
        .keys()
        .map(|key| {
            use slotmap::Key as _;
            key.data().as_ffi()
        })
        .collect();
    let mut snap = exported.keys();
    live.sort_unstable();
    snap.sort_unstable();
    assert_eq!(live, snap);

    let veer_ipc::TreeNode::Stack { children, .. } = &exported else {
        panic!("the root snapshot must be a stack");
    };
    assert_eq!(children.len(), 2);
}

#[test]
fn adapt_strategy_is_reported_in_dumps() {
    let tree = build(stack(vec![NodeBlueprint::Pane {
        slots: vec![
            slot(PaneRole::Primary, screen("main")),
            PaneSlotBlueprint {
                role: PaneRole::Supporting,
                content: Some(screen("side")),
                adapt: AdaptStrategy::Levitate,
            },
        ],
        active_role: PaneRole::Primary,
        back_behavior: PaneBackBehavior::PopLatest,
        scope: None,
    }]));

    let dump = tree.format_compact();
    assert!(dump.contains("adapt=levitate"));
}

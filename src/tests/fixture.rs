//! Shared fixture for navigator-level scenario tests: a small app shell
//! with a home screen, a scoped tabbed "library" section, and a two-pane
//! "mail" section, all reachable through container destinations.

use std::rc::Rc;

use veer_ipc::{PaneBackBehavior, PaneRole};

use crate::navigator::{ContainerFactory, Navigator, Options};
use crate::tree::scope::ScopeTable;
use crate::tree::{Destination, NavTree, NodeBlueprint, NodeData};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDest(pub &'static str);

impl Destination for TestDest {
    type Id = &'static str;

    fn id(&self) -> &Self::Id {
        &self.0
    }

    fn label(&self) -> String {
        self.0.to_owned()
    }
}

/// Expands `library` into a scoped tab section and `mail` into a two-pane
/// layout; everything else is a plain screen.
pub struct AppFactory;

impl ContainerFactory<TestDest> for AppFactory {
    fn container_for(&self, destination: &TestDest) -> Option<NodeBlueprint<TestDest>> {
        match destination.0 {
            "library" => Some(NodeBlueprint::Tab {
                tabs: vec![
                    NodeBlueprint::stack_of(TestDest("shelves")),
                    NodeBlueprint::stack_of(TestDest("authors")),
                ],
                initial_index: 0,
                scope: Some("library".into()),
            }),
            "mail" => Some(NodeBlueprint::Pane {
                slots: vec![
                    NodeBlueprint::slot(
                        PaneRole::Primary,
                        NodeBlueprint::stack_of(TestDest("inbox")),
                    ),
                    NodeBlueprint::slot(
                        PaneRole::Supporting,
                        NodeBlueprint::stack_of(TestDest("filters")),
                    ),
                ],
                active_role: PaneRole::Primary,
                back_behavior: PaneBackBehavior::PopLatest,
                scope: None,
            }),
            _ => None,
        }
    }
}

pub struct Fixture {
    pub nav: Navigator<TestDest>,
}

impl Fixture {
    pub fn new() -> Self {
        let scopes: ScopeTable<TestDest> = ScopeTable::new()
            .with("library", "shelves")
            .with("library", "authors")
            .with("library", "book");

        let nav = Navigator::with_collaborators(
            NodeBlueprint::stack_of(TestDest("home")),
            Rc::new(scopes),
            Rc::new(AppFactory),
            Options::default(),
        )
        .unwrap();

        Self { nav }
    }

    pub fn go(&mut self, name: &'static str) {
        self.nav.navigate(TestDest(name)).unwrap();
        self.tree().verify_invariants();
    }

    pub fn tree(&self) -> &NavTree<TestDest> {
        self.nav.tree()
    }

    pub fn active(&self) -> &'static str {
        let tree = self.tree();
        let leaf = tree.active_leaf().expect("active path must end in a screen");
        match tree.get(leaf) {
            Some(NodeData::Screen(data)) => data.destination().0,
            _ => unreachable!(),
        }
    }

    pub fn dump(&self) -> String {
        self.tree().format_compact()
    }
}

//! Cancellable, progress-driven back gestures.
//!
//! Tracks an in-progress back gesture as a small explicit state machine:
//! `Idle` until a gesture begins, `Proposed` while the user is dragging,
//! then back to `Idle` on commit or cancel. The back resolution is planned
//! exactly once, at gesture start; progress updates never re-plan, and the
//! commit applies the stored plan verbatim, so what was previewed is what
//! is applied. Cancelling just discards the plan; the tree was never
//! touched.

use tracing::{debug, trace};
use veer_ipc::GestureSnapshot;

use crate::tree::back::{self, BackPlan, BackPlanOutcome};
use crate::tree::{Destination, NavTree, NodeKey};

/// Errors from driving the gesture state machine out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GestureError {
    /// A gesture is already in progress; it must commit or cancel first.
    #[error("a back gesture is already in progress")]
    GestureActive,
    /// No gesture is in progress.
    #[error("no back gesture is in progress")]
    NoGesture,
}

/// Tunables for gesture handling.
#[derive(Debug, Clone, Copy)]
pub struct GestureOptions {
    /// Progress at or beyond which a released gesture should commit.
    pub commit_threshold: f64,
}

impl Default for GestureOptions {
    fn default() -> Self {
        Self {
            commit_threshold: 0.5,
        }
    }
}

/// Observable state of the gesture machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    /// No gesture is in progress.
    Idle,
    /// A gesture is in progress, previewing a back resolution.
    Proposed {
        /// The node that will visually leave on commit. Resolved against
        /// the tree the gesture began on.
        exit: NodeKey,
        /// The node revealed on commit.
        target: NodeKey,
        /// Gesture progress in `0.0..=1.0`.
        progress: f64,
    },
}

impl GestureState {
    /// Serializable form of the state.
    pub fn snapshot(&self) -> GestureSnapshot {
        use slotmap::Key as _;

        match *self {
            GestureState::Idle => GestureSnapshot::Idle,
            GestureState::Proposed {
                exit,
                target,
                progress,
            } => GestureSnapshot::Proposed {
                exit: exit.data().as_ffi(),
                target: target.data().as_ffi(),
                progress,
            },
        }
    }
}

/// Result of starting a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Began {
    /// The gesture is on; the preview pair is available.
    Proposed {
        /// The node that will visually leave on commit.
        exit: NodeKey,
        /// The node revealed on commit.
        target: NodeKey,
    },
    /// Back would delegate to the host here, so there is nothing to
    /// preview and no gesture was started.
    NothingToPop,
}

/// The gesture state machine.
///
/// Progress events must arrive in call order; there is no internal
/// queueing. A new gesture cannot begin while one is proposed.
#[derive(Debug)]
pub struct BackGestureCoordinator<D: Destination> {
    state: GestureState,
    plan: Option<BackPlan<D>>,
    options: GestureOptions,
}

impl<D: Destination> BackGestureCoordinator<D> {
    /// A coordinator in the `Idle` state.
    pub fn new(options: GestureOptions) -> Self {
        Self {
            state: GestureState::Idle,
            plan: None,
            options,
        }
    }

    /// Current state.
    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// Whether a gesture is currently proposed.
    pub fn is_active(&self) -> bool {
        matches!(self.state, GestureState::Proposed { .. })
    }

    /// Begin a gesture against the given tree.
    ///
    /// Plans the back resolution once. If back would delegate to the host,
    /// no gesture starts and `NothingToPop` is returned.
    pub fn begin(&mut self, tree: &NavTree<D>) -> Result<Began, GestureError> {
        if self.is_active() {
            return Err(GestureError::GestureActive);
        }

        match back::plan(tree) {
            BackPlanOutcome::Plan(plan) => {
                let exit = plan.exit;
                let target = plan.target;
                self.state = GestureState::Proposed {
                    exit,
                    target,
                    progress: 0.0,
                };
                self.plan = Some(plan);
                debug!(?exit, ?target, "back gesture proposed");
                Ok(Began::Proposed { exit, target })
            }
            BackPlanOutcome::DelegateToHost | BackPlanOutcome::Rejected => {
                Ok(Began::NothingToPop)
            }
        }
    }

    /// Update gesture progress. Clamped to `0.0..=1.0`; never re-plans.
    /// Returns the clamped value.
    pub fn update(&mut self, progress: f64) -> Result<f64, GestureError> {
        match &mut self.state {
            GestureState::Proposed {
                progress: current, ..
            } => {
                let clamped = progress.clamp(0.0, 1.0);
                *current = clamped;
                trace!(progress = clamped, "back gesture progress");
                Ok(clamped)
            }
            GestureState::Idle => Err(GestureError::NoGesture),
        }
    }

    /// Whether current progress is at or beyond the commit threshold.
    pub fn past_commit_threshold(&self) -> bool {
        match self.state {
            GestureState::Proposed { progress, .. } => {
                progress >= self.options.commit_threshold
            }
            GestureState::Idle => false,
        }
    }

    /// Commit the gesture, returning the plan computed at `begin`.
    ///
    /// The caller publishes `plan.tree` verbatim; nothing is recomputed.
    pub fn commit(&mut self) -> Result<BackPlan<D>, GestureError> {
        let plan = self.plan.take().ok_or(GestureError::NoGesture)?;
        self.state = GestureState::Idle;
        debug!("back gesture committed");
        Ok(plan)
    }

    /// Cancel the gesture. Returns whether one was in progress. The tree
    /// the gesture began on was never modified.
    pub fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        self.state = GestureState::Idle;
        self.plan = None;
        if was_active {
            debug!("back gesture cancelled");
        }
        was_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeBlueprint;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Dest(&'static str);

    impl Destination for Dest {
        type Id = &'static str;

        fn id(&self) -> &Self::Id {
            &self.0
        }

        fn label(&self) -> String {
            self.0.to_owned()
        }
    }

    fn two_screen_tree() -> NavTree<Dest> {
        NavTree::new(NodeBlueprint::stack(vec![
            NodeBlueprint::Screen(Dest("home")),
            NodeBlueprint::Screen(Dest("details")),
        ]))
        .unwrap()
    }

    #[test]
    fn begins_idle_and_proposes_on_begin() {
        let tree = two_screen_tree();
        let mut coordinator = BackGestureCoordinator::new(GestureOptions::default());
        assert_eq!(*coordinator.state(), GestureState::Idle);

        let began = coordinator.begin(&tree).unwrap();
        let Began::Proposed { exit, target } = began else {
            panic!("expected a proposed gesture");
        };
        assert!(tree.contains(exit));
        assert!(tree.contains(target));
        assert!(coordinator.is_active());
    }

    #[test]
    fn rejects_overlapping_gestures() {
        let tree = two_screen_tree();
        let mut coordinator = BackGestureCoordinator::new(GestureOptions::default());
        coordinator.begin(&tree).unwrap();

        assert_eq!(coordinator.begin(&tree), Err(GestureError::GestureActive));
    }

    #[test]
    fn update_clamps_progress() {
        let tree = two_screen_tree();
        let mut coordinator = BackGestureCoordinator::new(GestureOptions::default());
        coordinator.begin(&tree).unwrap();

        assert_eq!(coordinator.update(1.7).unwrap(), 1.0);
        assert_eq!(coordinator.update(-0.3).unwrap(), 0.0);
        assert_eq!(coordinator.update(0.25).unwrap(), 0.25);
    }

    #[test]
    fn update_without_gesture_is_an_error() {
        let mut coordinator = BackGestureCoordinator::<Dest>::new(GestureOptions::default());
        assert_eq!(coordinator.update(0.5), Err(GestureError::NoGesture));
    }

    #[test]
    fn threshold_uses_options() {
        let tree = two_screen_tree();
        let mut coordinator = BackGestureCoordinator::new(GestureOptions {
            commit_threshold: 0.8,
        });
        coordinator.begin(&tree).unwrap();

        coordinator.update(0.5).unwrap();
        assert!(!coordinator.past_commit_threshold());
        coordinator.update(0.85).unwrap();
        assert!(coordinator.past_commit_threshold());
    }

    #[test]
    fn cancel_discards_the_plan() {
        let tree = two_screen_tree();
        let mut coordinator = BackGestureCoordinator::new(GestureOptions::default());
        coordinator.begin(&tree).unwrap();
        coordinator.update(0.9).unwrap();

        assert!(coordinator.cancel());
        assert_eq!(*coordinator.state(), GestureState::Idle);
        assert_eq!(coordinator.commit().unwrap_err(), GestureError::NoGesture);
        assert!(!coordinator.cancel());
    }

    #[test]
    fn commit_returns_the_plan_computed_at_begin() {
        let tree = two_screen_tree();
        let mut coordinator = BackGestureCoordinator::new(GestureOptions::default());
        let Began::Proposed { exit, target } = coordinator.begin(&tree).unwrap() else {
            panic!("expected a proposed gesture");
        };
        coordinator.update(1.0).unwrap();

        let plan = coordinator.commit().unwrap();
        assert_eq!(plan.exit, exit);
        assert_eq!(plan.target, target);
        assert!(!plan.tree.contains(exit));
        assert_eq!(*coordinator.state(), GestureState::Idle);
    }

    #[test]
    fn nothing_to_pop_on_a_root_with_one_screen() {
        let tree = NavTree::new(NodeBlueprint::stack_of(Dest("home"))).unwrap();
        let mut coordinator = BackGestureCoordinator::new(GestureOptions::default());

        assert_eq!(coordinator.begin(&tree).unwrap(), Began::NothingToPop);
        assert!(!coordinator.is_active());
    }
}

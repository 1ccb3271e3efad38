//! Staged/committed hand-off of scale changes.
//!
//! Every change to the scale (reset, file load, randomize, state restore, step
//! toggles, learning) is written to a staged copy and the coordinator moves to
//! [`CoordinatorState::ChangeRequested`]. The live scale and the tables the
//! quantizer reads are only replaced in [`TuningCoordinator::commit`], which the
//! engine calls at the control-rate checkpoint.

use crate::tuning_engine::constants::{
    DEFAULT_TUNING_NAME, ERROR_BLINK_CYCLES, ERROR_BLINK_PHASE_TICKS,
};
use crate::tuning_engine::learner::ScaleLearner;
use crate::tuning_engine::scale::ScaleModel;
use crate::tuning_engine::table::TuningTables;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// The live scale is current.
    Idle,

    /// A staged scale is waiting for the next commit.
    ChangeRequested,
}

/// What the step indicators are showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Normal,

    /// Blinking after a failed tuning-file load.
    Error {
        /// Light ticks spent in the error display so far.
        ticks: u32,
    },
}

pub struct TuningCoordinator {
    state: CoordinatorState,
    live: ScaleModel,
    staged: ScaleModel,
    tables: TuningTables,
    tuning_name: String,
    staged_name: Option<String>,
    display: DisplayState,
    error_blink_cycles: u32,
}

impl Default for TuningCoordinator {
    fn default() -> Self {
        Self::new(ERROR_BLINK_CYCLES)
    }
}

impl TuningCoordinator {
    /// Creates a coordinator with the default tuning already committed.
    pub fn new(error_blink_cycles: u32) -> Self {
        let live = ScaleModel::default();
        let tables = TuningTables::build(&live);

        Self {
            state: CoordinatorState::Idle,
            staged: live.clone(),
            live,
            tables,
            tuning_name: DEFAULT_TUNING_NAME.to_string(),
            staged_name: None,
            display: DisplayState::Normal,
            error_blink_cycles,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// The committed scale.
    pub fn live(&self) -> &ScaleModel {
        &self.live
    }

    /// Tables built from the committed scale.
    pub fn tables(&self) -> &TuningTables {
        &self.tables
    }

    pub fn tuning_name(&self) -> &str {
        &self.tuning_name
    }

    /// The scale that will be committed next, or the live one when idle.
    pub fn pending(&self) -> &ScaleModel {
        match self.state {
            CoordinatorState::Idle => &self.live,
            CoordinatorState::ChangeRequested => &self.staged,
        }
    }

    /// Replaces the staged scale wholesale.
    ///
    /// A tuning name staged with an earlier scale is dropped with it, so the
    /// next commit keeps the current name.
    pub fn stage(&mut self, scale: &ScaleModel) {
        self.staged.copy_from(scale);
        self.staged_name = None;
        self.state = CoordinatorState::ChangeRequested;
    }

    /// Replaces the staged scale and the tuning name that goes with it.
    pub fn stage_named(&mut self, scale: &ScaleModel, name: String) {
        self.stage(scale);
        self.staged_name = Some(name);
    }

    /// Sets the tuning name without touching the scale.
    pub fn set_tuning_name(&mut self, name: String) {
        self.tuning_name = name;
    }

    /// Mutable access to the staged scale for incremental edits.
    ///
    /// When idle the staged copy starts from the live scale, so edits made
    /// before the next commit accumulate.
    pub fn staged_mut(&mut self) -> &mut ScaleModel {
        if self.state == CoordinatorState::Idle {
            self.staged.copy_from(&self.live);
            self.state = CoordinatorState::ChangeRequested;
        }
        &mut self.staged
    }

    /// Drops any staged change after a failed tuning-file load and starts the
    /// error display. The live scale and tuning name are left alone.
    pub fn reject_load(&mut self) {
        self.state = CoordinatorState::Idle;
        self.staged_name = None;
        self.display = DisplayState::Error { ticks: 0 };
    }

    /// Commits a staged change, if any, and rebuilds the tables.
    ///
    /// Returns true when a commit happened. The learner's scan memory is cleared
    /// so it re-evaluates against the new tuning.
    pub fn commit(&mut self, learner: &mut ScaleLearner) -> bool {
        if self.state != CoordinatorState::ChangeRequested {
            return false;
        }

        self.live.copy_from(&self.staged);
        if let Some(name) = self.staged_name.take() {
            self.tuning_name = name;
        }
        self.tables.rebuild(&self.live);
        learner.forget();
        self.state = CoordinatorState::Idle;
        true
    }

    pub fn display(&self) -> DisplayState {
        self.display
    }

    /// Whether the error blink is currently in its lit phase.
    pub fn error_lit(&self) -> bool {
        match self.display {
            DisplayState::Normal => false,
            DisplayState::Error { ticks } => (ticks / ERROR_BLINK_PHASE_TICKS) % 2 == 0,
        }
    }

    /// Advances the error display by one light tick.
    pub fn tick_display(&mut self) {
        if let DisplayState::Error { ticks } = self.display {
            let ticks = ticks + 1;
            if ticks >= self.error_blink_cycles * 2 * ERROR_BLINK_PHASE_TICKS {
                self.display = DisplayState::Normal;
            } else {
                self.display = DisplayState::Error { ticks };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle_with_default_tuning() {
        let coordinator = TuningCoordinator::default();

        assert_eq!(coordinator.state(), CoordinatorState::Idle);
        assert_eq!(coordinator.live(), &ScaleModel::default());
        assert_eq!(coordinator.tables().full().len(), 121);
        assert_eq!(coordinator.tuning_name(), DEFAULT_TUNING_NAME);
    }

    #[test]
    fn test_stage_does_not_touch_live_until_commit() {
        let mut coordinator = TuningCoordinator::default();
        let mut learner = ScaleLearner::new();
        let pentatonic = ScaleModel::from_cents(&[240.0, 480.0, 720.0, 960.0, 1200.0]).unwrap();

        coordinator.stage_named(&pentatonic, "5-EDO".to_string());

        assert_eq!(coordinator.state(), CoordinatorState::ChangeRequested);
        assert_eq!(coordinator.live(), &ScaleModel::default());
        assert_eq!(coordinator.tables().full().len(), 121);
        assert_eq!(coordinator.tuning_name(), DEFAULT_TUNING_NAME);
        assert_eq!(coordinator.pending(), &pentatonic);

        assert!(coordinator.commit(&mut learner));

        assert_eq!(coordinator.state(), CoordinatorState::Idle);
        assert_eq!(coordinator.live(), &pentatonic);
        assert_eq!(coordinator.tables().step_count(), 5);
        assert_eq!(coordinator.tuning_name(), "5-EDO");
    }

    #[test]
    fn test_unnamed_stage_drops_staged_name() {
        let mut coordinator = TuningCoordinator::default();
        let mut learner = ScaleLearner::new();
        let fifths = ScaleModel::from_cents(&[700.0, 1200.0]).unwrap();

        coordinator.stage_named(&fifths, "fifths".to_string());
        coordinator.stage(&ScaleModel::default());
        coordinator.commit(&mut learner);

        assert_eq!(coordinator.live(), &ScaleModel::default());
        assert_eq!(coordinator.tuning_name(), DEFAULT_TUNING_NAME);
    }

    #[test]
    fn test_commit_when_idle_is_noop() {
        let mut coordinator = TuningCoordinator::default();
        let mut learner = ScaleLearner::new();
        let generation = coordinator.tables().generation();

        assert!(!coordinator.commit(&mut learner));
        assert_eq!(coordinator.tables().generation(), generation);
    }

    #[test]
    fn test_staged_edits_accumulate() {
        let mut coordinator = TuningCoordinator::default();
        let mut learner = ScaleLearner::new();

        coordinator.staged_mut().set_all_enabled(false);
        coordinator.staged_mut().toggle(4);
        coordinator.staged_mut().toggle(7);

        assert_eq!(coordinator.live().enabled_count(), 12);
        coordinator.commit(&mut learner);

        assert_eq!(coordinator.live().enabled_count(), 2);
        assert!(coordinator.live().is_enabled(4));
        assert!(coordinator.live().is_enabled(7));
        assert_eq!(coordinator.tables().enabled_step_count(), 2);
    }

    #[test]
    fn test_reject_load_keeps_live_and_name() {
        let mut coordinator = TuningCoordinator::default();
        let mut learner = ScaleLearner::new();
        let scale = ScaleModel::from_cents(&[700.0, 1200.0]).unwrap();
        coordinator.stage_named(&scale, "fifths".to_string());
        coordinator.commit(&mut learner);

        coordinator.staged_mut().toggle(0);
        coordinator.reject_load();

        assert_eq!(coordinator.state(), CoordinatorState::Idle);
        assert!(!coordinator.commit(&mut learner));
        assert_eq!(coordinator.live(), &scale);
        assert_eq!(coordinator.tuning_name(), "fifths");
        assert!(matches!(coordinator.display(), DisplayState::Error { .. }));
    }

    #[test]
    fn test_error_display_blinks_then_returns_to_normal() {
        let mut coordinator = TuningCoordinator::new(2);
        coordinator.reject_load();

        let mut lit_phases = Vec::new();
        let mut ticks = 0;
        while coordinator.display() != DisplayState::Normal {
            if ticks % ERROR_BLINK_PHASE_TICKS == 0 {
                lit_phases.push(coordinator.error_lit());
            }
            coordinator.tick_display();
            ticks += 1;
        }

        assert_eq!(ticks, 2 * 2 * ERROR_BLINK_PHASE_TICKS);
        assert_eq!(lit_phases, vec![true, false, true, false]);
        assert!(!coordinator.error_lit());
    }

    #[test]
    fn test_commit_clears_learner_memory() {
        let mut coordinator = TuningCoordinator::default();
        let mut learner = ScaleLearner::new();
        let live = coordinator.live().clone();
        let cv = [0.0];

        assert!(
            learner
                .observe(Some(&cv[..]), &live, coordinator.tables(), Default::default())
                .is_some()
        );
        assert!(
            learner
                .observe(Some(&cv[..]), &live, coordinator.tables(), Default::default())
                .is_none()
        );

        coordinator.stage(&live);
        coordinator.commit(&mut learner);

        assert!(
            learner
                .observe(Some(&cv[..]), &live, coordinator.tables(), Default::default())
                .is_some()
        );
    }
}

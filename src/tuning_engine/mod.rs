//! Tuning Engine Module
//!
//! This module quantizes pitch voltages to a user-defined tuning inside the
//! real-time callback. It is organized into sub-modules, each with a specific
//! responsibility:
//!
//! - [`scale`]: Periodic scale definition with per-step enabled flags
//! - [`table`]: Expansion of a scale into ascending voltage tables
//! - [`quantizer`]: The three mapping algorithms
//! - [`learner`]: Learning the enabled steps from the CV input
//! - [`coordinator`]: Staged/committed hand-off and the error display
//! - [`cadence`]: Light and scan update domains
//! - [`scala`]: Scala tuning file import
//! - [`state`]: Persisted state
//! - [`realtime`]: Ring-buffer hand-off for hosts with a separate audio thread
//!
//! The main [`TuningEngine`] struct owns all of these and is driven once per
//! audio frame through [`TuningEngine::process`].

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::messages::{ControlMessage, EngineEvent};
use crate::tuning_engine::cadence::Cadence;
use crate::tuning_engine::constants::{
    ACTIVE_BRIGHTNESS, DEFAULT_TUNING_NAME, ENABLED_BRIGHTNESS, ERROR_BLINK_CYCLES, LIGHT_RATE_HZ,
    MATRIX_SIZE, MAX_CHANNELS, SCAN_RATE_HZ,
};
use crate::tuning_engine::coordinator::{CoordinatorState, DisplayState, TuningCoordinator};
use crate::tuning_engine::errors::{ParseError, StateError, ValidationError};
use crate::tuning_engine::learner::{LearnerOutput, ScaleLearner};
use crate::tuning_engine::quantizer::MappingMode;
use crate::tuning_engine::scala::{SclParser, TuningFileParser, read_tuning_file, scala_dir_for};
use crate::tuning_engine::scale::ScaleModel;
use crate::tuning_engine::state::{PersistedState, RestorableState};
use crate::tuning_engine::table::TuningTables;

pub mod cadence;
pub mod constants;
pub mod coordinator;
pub mod errors;
pub mod learner;
pub mod quantizer;
pub mod realtime;
pub mod scala;
pub mod scale;
pub mod state;
pub mod table;

/// Runtime settings for a [`TuningEngine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Rate of the light/control domain, where staged changes are committed.
    pub light_rate_hz: f64,

    /// Rate at which the CV input is scanned for scale learning.
    pub scan_rate_hz: f64,

    /// On/off cycles of the error display after a failed load.
    pub error_blink_cycles: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            light_rate_hz: LIGHT_RATE_HZ,
            scan_rate_hz: SCAN_RATE_HZ,
            error_blink_cycles: ERROR_BLINK_CYCLES,
        }
    }
}

/// One quantizer instance: scale, tables, learner and the UI-facing state.
pub struct TuningEngine {
    coordinator: TuningCoordinator,
    learner: ScaleLearner,
    input_mapping: MappingMode,
    cv_mapping: MappingMode,
    scala_dir: String,
    light_cadence: Cadence,
    scan_cadence: Cadence,
    lights: [f32; MATRIX_SIZE],
    active_step: Option<usize>,
    rng: StdRng,
    parser: Box<dyn TuningFileParser + Send>,
}

impl Default for TuningEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TuningEngine {
    /// Creates an engine with the default 12-step equal tuning committed.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut engine = Self {
            coordinator: TuningCoordinator::new(config.error_blink_cycles),
            learner: ScaleLearner::new(),
            input_mapping: MappingMode::default(),
            cv_mapping: MappingMode::default(),
            scala_dir: String::new(),
            light_cadence: Cadence::new(config.light_rate_hz),
            scan_cadence: Cadence::new(config.scan_rate_hz),
            lights: [0.0; MATRIX_SIZE],
            active_step: None,
            rng: StdRng::from_entropy(),
            parser: Box::new(SclParser),
        };
        engine.update_lights();
        engine
    }

    /// Replaces the tuning-file parser.
    pub fn set_parser(&mut self, parser: Box<dyn TuningFileParser + Send>) {
        self.parser = parser;
    }

    /// Processes one audio frame.
    ///
    /// Each pitch channel is quantized into the matching `output` slot. `cv` is
    /// `None` while the learning input is disconnected. Returns the number of
    /// output channels written.
    pub fn process(
        &mut self,
        sample_time_s: f64,
        pitch: &[f64],
        cv: Option<&[f64]>,
        output: &mut [f64],
    ) -> usize {
        let channels = pitch.len().min(output.len()).min(MAX_CHANNELS);
        let tables = self.coordinator.tables();
        let has_enabled = !tables.enabled().is_empty();

        self.active_step = None;
        for (channel, (&v, out)) in pitch.iter().zip(output.iter_mut()).take(channels).enumerate() {
            let step = tables.quantize(v, self.input_mapping, true);
            *out = step.voltage;
            if channel == 0 && has_enabled {
                self.active_step = Some(step.position(tables.step_count()));
            }
        }

        // The learner works against the live tables, so it waits until any
        // staged change has been committed.
        let idle = self.coordinator.state() == CoordinatorState::Idle;
        if self.scan_cadence.tick(sample_time_s) && idle {
            let learned = self.learner.observe(
                cv,
                self.coordinator.pending(),
                self.coordinator.tables(),
                self.cv_mapping,
            );
            if let Some(LearnerOutput::Learned(scale) | LearnerOutput::Restored(scale)) = learned {
                self.coordinator.stage(scale);
            }
        }

        if self.light_cadence.tick(sample_time_s) {
            self.coordinator.commit(&mut self.learner);
            self.coordinator.tick_display();
            self.update_lights();
        }

        channels
    }

    fn update_lights(&mut self) {
        if let DisplayState::Error { .. } = self.coordinator.display() {
            let level = if self.coordinator.error_lit() {
                ACTIVE_BRIGHTNESS
            } else {
                0.0
            };
            self.lights.fill(level);
            return;
        }

        let scale = self.coordinator.live();
        for (index, light) in self.lights.iter_mut().enumerate() {
            *light = if !scale.is_enabled(index) {
                0.0
            } else if self.active_step == Some(index) {
                ACTIVE_BRIGHTNESS
            } else {
                ENABLED_BRIGHTNESS
            };
        }
    }

    /// Stages the default 12-step equal tuning.
    pub fn reset(&mut self) {
        self.coordinator
            .stage_named(&ScaleModel::default(), DEFAULT_TUNING_NAME.to_string());
    }

    /// Parses a tuning file and stages it.
    ///
    /// The scala directory follows the file even when parsing fails. On failure
    /// the committed tuning is kept and the error display starts.
    pub fn load_tuning_file(&mut self, path: impl AsRef<Path>) -> Result<(), ParseError> {
        let path = path.as_ref();
        if let Some(dir) = scala_dir_for(path) {
            self.scala_dir = dir;
        }

        match read_tuning_file(&*self.parser, path) {
            Ok((name, scale)) => {
                log::info!("Loaded tuning '{}' ({} steps)", name, scale.len());
                self.coordinator.stage_named(&scale, name);
                Ok(())
            }
            Err(err) => {
                log::warn!("Failed to load tuning file {}: {}", path.display(), err);
                self.coordinator.reject_load();
                Err(err)
            }
        }
    }

    /// Stages a scale given as cents values, all steps enabled.
    pub fn load_scale(&mut self, name: &str, cents: &[f64]) -> Result<(), ValidationError> {
        let scale = ScaleModel::from_cents(cents)?;
        self.coordinator.stage_named(&scale, name.to_string());
        Ok(())
    }

    /// Enables each step with probability one half.
    pub fn randomize(&mut self) {
        let rng = &mut self.rng;
        let staged = self.coordinator.staged_mut();
        for index in 0..staged.len() {
            staged.set_enabled(index, rng.gen_bool(0.5));
        }
    }

    pub fn set_all_enabled(&mut self, enabled: bool) {
        self.coordinator.staged_mut().set_all_enabled(enabled);
    }

    /// Flips one step. Returns false if `index` is outside the scale.
    pub fn toggle_step(&mut self, index: usize) -> bool {
        if index >= self.coordinator.pending().len() {
            return false;
        }
        self.coordinator.staged_mut().toggle(index)
    }

    /// Enables or disables one step. Returns false if `index` is outside the scale.
    pub fn set_step_enabled(&mut self, index: usize, enabled: bool) -> bool {
        if index >= self.coordinator.pending().len() {
            return false;
        }
        self.coordinator.staged_mut().set_enabled(index, enabled)
    }

    pub fn set_input_mapping(&mut self, mode: MappingMode) {
        self.input_mapping = mode;
    }

    /// Selects the learning algorithm; the next scan is re-evaluated with it.
    pub fn set_cv_mapping(&mut self, mode: MappingMode) {
        if self.cv_mapping != mode {
            self.cv_mapping = mode;
            self.learner.forget();
        }
    }

    pub fn set_scala_dir(&mut self, dir: String) {
        self.scala_dir = dir;
    }

    /// Snapshot of the committed state for the host's patch storage.
    pub fn save_state(&self) -> PersistedState {
        PersistedState {
            tuning_name: self.coordinator.tuning_name().to_string(),
            scala_dir: self.scala_dir.clone(),
            input_mapping_mode: self.input_mapping,
            cv_mapping_mode: self.cv_mapping,
            scale: Some(self.coordinator.live().steps().to_vec()),
        }
    }

    /// Restores persisted state. A stored scale is staged, not applied immediately.
    ///
    /// Nothing is changed when the stored scale is invalid.
    pub fn load_state(&mut self, state: PersistedState) -> Result<(), StateError> {
        let state = state.into_restorable()?;
        log::info!("Restored state for tuning '{}'", state.tuning_name);
        self.apply_state(state);
        Ok(())
    }

    /// Applies already validated state.
    pub fn apply_state(&mut self, state: RestorableState) {
        match state.scale {
            Some(scale) => self.coordinator.stage_named(&scale, state.tuning_name),
            None => self.coordinator.set_tuning_name(state.tuning_name),
        }

        self.input_mapping = state.input_mapping_mode;
        self.set_cv_mapping(state.cv_mapping_mode);
        self.scala_dir = state.scala_dir;
    }

    pub fn save_state_json(&self) -> Result<String, StateError> {
        self.save_state().to_json()
    }

    pub fn load_state_json(&mut self, json: &str) -> Result<(), StateError> {
        let state = PersistedState::from_json(json)?;
        self.load_state(state)
    }

    /// Applies one message from the control side.
    ///
    /// Returns the event to send back, if the message asks for one.
    pub fn handle_message(&mut self, message: ControlMessage) -> Option<EngineEvent> {
        match message {
            ControlMessage::LoadScale { name, scale } => {
                self.coordinator.stage_named(&scale, name);
            }
            ControlMessage::LoadFailed() => {
                self.coordinator.reject_load();
            }
            ControlMessage::SetScalaDir(dir) => {
                self.scala_dir = dir;
            }
            ControlMessage::Randomize() => {
                self.randomize();
            }
            ControlMessage::SetAllEnabled(enabled) => {
                self.set_all_enabled(enabled);
            }
            ControlMessage::ToggleStep { index } => {
                self.toggle_step(index);
            }
            ControlMessage::SetStepEnabled { index, enabled } => {
                self.set_step_enabled(index, enabled);
            }
            ControlMessage::RestoreState(state) => {
                self.apply_state(*state);
            }
            ControlMessage::SetInputMapping(mode) => {
                self.set_input_mapping(mode);
            }
            ControlMessage::SetCvMapping(mode) => {
                self.set_cv_mapping(mode);
            }
            ControlMessage::RequestSnapshot() => {
                return Some(EngineEvent::Snapshot(Box::new(self.save_state())));
            }
        }
        None
    }

    pub fn tuning_name(&self) -> &str {
        self.coordinator.tuning_name()
    }

    pub fn scala_dir(&self) -> &str {
        &self.scala_dir
    }

    /// The committed scale.
    pub fn scale(&self) -> &ScaleModel {
        self.coordinator.live()
    }

    /// The scale that the next commit will install.
    pub fn pending(&self) -> &ScaleModel {
        self.coordinator.pending()
    }

    pub fn tables(&self) -> &TuningTables {
        self.coordinator.tables()
    }

    pub fn state(&self) -> CoordinatorState {
        self.coordinator.state()
    }

    pub fn display(&self) -> DisplayState {
        self.coordinator.display()
    }

    /// Step indicator brightness, refreshed at the light rate.
    pub fn lights(&self) -> &[f32; MATRIX_SIZE] {
        &self.lights
    }

    /// Position in the scale of the step selected for the first channel in the last frame.
    pub fn active_step(&self) -> Option<usize> {
        self.active_step
    }

    pub fn input_mapping(&self) -> MappingMode {
        self.input_mapping
    }

    pub fn cv_mapping(&self) -> MappingMode {
        self.cv_mapping
    }

    pub fn is_learning(&self) -> bool {
        self.learner.is_connected()
    }
}

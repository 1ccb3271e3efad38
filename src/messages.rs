//! Message definitions for communication between the control thread and the real-time thread.
//!
//! This module defines the enums that serve as the wire format for messages passed through the
//! ring buffers between the control (UI) side and the real-time processing callback.

use crate::tuning_engine::quantizer::MappingMode;
use crate::tuning_engine::scale::ScaleModel;
use crate::tuning_engine::state::{PersistedState, RestorableState};

/// Message that is emitted from the control side.
///
/// Every scale mutation is staged on arrival and committed at the next control tick.
#[derive(Debug, Clone)]
pub enum ControlMessage {
    /// Publish a tuning that was parsed off the real-time thread.
    ///
    /// # Parameters
    /// * `name` - Tuning name to show once committed
    /// * `scale` - Validated scale
    LoadScale { name: String, scale: ScaleModel },

    /// A tuning file could not be loaded; start the error display.
    LoadFailed(),

    /// Remember the directory of the last tuning file.
    SetScalaDir(String),

    /// Enable each step with probability one half.
    Randomize(),

    /// Enable or disable every step.
    SetAllEnabled(bool),

    /// Flip one step.
    ToggleStep { index: usize },

    /// Enable or disable one step.
    SetStepEnabled { index: usize, enabled: bool },

    /// Apply a persisted state that was validated on the control side.
    RestoreState(Box<RestorableState>),

    /// Select the mapping algorithm for the pitch input.
    SetInputMapping(MappingMode),

    /// Select the mapping algorithm for scale learning from the CV input.
    SetCvMapping(MappingMode),

    /// Ask for an [`EngineEvent::Snapshot`] of the current state.
    RequestSnapshot(),
}

/// Message that is emitted from the real-time side.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A staged change was committed and the tables rebuilt.
    TuningCommitted {
        generation: u64,
        steps: usize,
        enabled_steps: usize,
    },

    /// The CV input was plugged in and scale learning started.
    CvConnected(),

    /// The CV input was pulled out; the scale from before learning is restored.
    CvDisconnected(),

    /// Response to [`ControlMessage::RequestSnapshot`].
    Snapshot(Box<PersistedState>),
}

//! Real-time hand-off
//!
//! This module splits a [`TuningEngine`] for hosts that run the audio callback
//! on its own thread:
//! - [`TuningProcessor`] lives in the callback and owns the engine
//! - [`TuningEngineHandle`] lives on the control thread, parses tuning files
//!   and sends [`ControlMessage`]s through a lock-free ring buffer
//!
//! Messages are drained at the start of every frame into the staged scale. The
//! commit still happens only at the light tick, so the callback never sees a
//! half-updated scale.
//!
//! The callback does not log. Commits and learning changes come back as
//! [`EngineEvent`]s and are logged when the handle polls them.

use std::path::Path;

use env_logger::{Builder, Env};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::messages::{ControlMessage, EngineEvent};
use crate::tuning_engine::TuningEngine;
use crate::tuning_engine::constants::{DEFAULT_TUNING_NAME, MESSAGE_QUEUE_CAPACITY};
use crate::tuning_engine::errors::HandleError;
use crate::tuning_engine::quantizer::MappingMode;
use crate::tuning_engine::scala::{SclParser, TuningFileParser, read_tuning_file, scala_dir_for};
use crate::tuning_engine::scale::ScaleModel;
use crate::tuning_engine::state::PersistedState;

/// Setup and configure the logger for tuning operations
pub fn setup_logger() {
    // Users can raise the level via `RUST_LOG`, e.g. `RUST_LOG=debug` to see commits.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init()
        .unwrap_or(()); // Ignore initialization errors
}

/// Audio-thread side of a split engine.
pub struct TuningProcessor {
    engine: TuningEngine,
    consumer: Consumer<ControlMessage>,
    producer: Producer<EngineEvent>,
    generation: u64,
    learning: bool,
}

impl TuningProcessor {
    /// Applies pending control messages, then processes one frame.
    ///
    /// Events that do not fit in the event queue are dropped.
    pub fn process(
        &mut self,
        sample_time_s: f64,
        pitch: &[f64],
        cv: Option<&[f64]>,
        output: &mut [f64],
    ) -> usize {
        while let Ok(message) = self.consumer.pop() {
            if let Some(event) = self.engine.handle_message(message) {
                let _ = self.producer.push(event);
            }
        }

        let channels = self.engine.process(sample_time_s, pitch, cv, output);

        let tables = self.engine.tables();
        if tables.generation() != self.generation {
            self.generation = tables.generation();
            let _ = self.producer.push(EngineEvent::TuningCommitted {
                generation: self.generation,
                steps: tables.step_count(),
                enabled_steps: tables.enabled_step_count(),
            });
        }

        if self.engine.is_learning() != self.learning {
            self.learning = self.engine.is_learning();
            let event = if self.learning {
                EngineEvent::CvConnected()
            } else {
                EngineEvent::CvDisconnected()
            };
            let _ = self.producer.push(event);
        }

        channels
    }

    pub fn engine(&self) -> &TuningEngine {
        &self.engine
    }
}

/// Control-thread side of a split engine.
pub struct TuningEngineHandle {
    producer: Producer<ControlMessage>,
    consumer: Consumer<EngineEvent>,
    parser: Box<dyn TuningFileParser + Send>,
}

impl TuningEngineHandle {
    fn send(&mut self, message: ControlMessage) -> Result<(), HandleError> {
        self.producer
            .push(message)
            .map_err(|_| HandleError::QueueFull)
    }

    /// Replaces the tuning-file parser used by [`Self::load_tuning_file`].
    pub fn set_parser(&mut self, parser: Box<dyn TuningFileParser + Send>) {
        self.parser = parser;
    }

    /// Sends the default 12-step equal tuning.
    pub fn reset(&mut self) -> Result<(), HandleError> {
        self.send(ControlMessage::LoadScale {
            name: DEFAULT_TUNING_NAME.to_string(),
            scale: ScaleModel::default(),
        })
    }

    /// Parses a tuning file on the calling thread and sends the result.
    ///
    /// A parse failure is reported to the processor as well, which starts its
    /// error display.
    pub fn load_tuning_file(&mut self, path: impl AsRef<Path>) -> Result<(), HandleError> {
        let path = path.as_ref();
        if let Some(dir) = scala_dir_for(path) {
            self.send(ControlMessage::SetScalaDir(dir))?;
        }

        match read_tuning_file(&*self.parser, path) {
            Ok((name, scale)) => {
                log::info!("Loaded tuning '{}' ({} steps)", name, scale.len());
                self.send(ControlMessage::LoadScale { name, scale })
            }
            Err(err) => {
                log::warn!("Failed to load tuning file {}: {}", path.display(), err);
                self.send(ControlMessage::LoadFailed())?;
                Err(err.into())
            }
        }
    }

    pub fn load_scale(&mut self, name: &str, cents: &[f64]) -> Result<(), HandleError> {
        let scale = ScaleModel::from_cents(cents)?;
        self.send(ControlMessage::LoadScale {
            name: name.to_string(),
            scale,
        })
    }

    pub fn randomize(&mut self) -> Result<(), HandleError> {
        self.send(ControlMessage::Randomize())
    }

    pub fn set_all_enabled(&mut self, enabled: bool) -> Result<(), HandleError> {
        self.send(ControlMessage::SetAllEnabled(enabled))
    }

    pub fn toggle_step(&mut self, index: usize) -> Result<(), HandleError> {
        self.send(ControlMessage::ToggleStep { index })
    }

    pub fn set_step_enabled(&mut self, index: usize, enabled: bool) -> Result<(), HandleError> {
        self.send(ControlMessage::SetStepEnabled { index, enabled })
    }

    pub fn set_input_mapping(&mut self, mode: MappingMode) -> Result<(), HandleError> {
        self.send(ControlMessage::SetInputMapping(mode))
    }

    pub fn set_cv_mapping(&mut self, mode: MappingMode) -> Result<(), HandleError> {
        self.send(ControlMessage::SetCvMapping(mode))
    }

    /// Validates persisted state here so the processor only ever receives a
    /// restorable one.
    pub fn restore_state(&mut self, state: PersistedState) -> Result<(), HandleError> {
        let state = state.into_restorable()?;
        log::info!("Restoring state for tuning '{}'", state.tuning_name);
        self.send(ControlMessage::RestoreState(Box::new(state)))
    }

    pub fn restore_state_json(&mut self, json: &str) -> Result<(), HandleError> {
        let state = PersistedState::from_json(json)?;
        self.restore_state(state)
    }

    /// Asks for an [`EngineEvent::Snapshot`], answered on the next frame.
    pub fn request_snapshot(&mut self) -> Result<(), HandleError> {
        self.send(ControlMessage::RequestSnapshot())
    }

    /// Returns the next event from the processor, if any.
    pub fn poll_event(&mut self) -> Option<EngineEvent> {
        let event = self.consumer.pop().ok()?;
        match &event {
            EngineEvent::TuningCommitted {
                generation,
                steps,
                enabled_steps,
            } => {
                log::debug!(
                    "Committed tuning generation {generation} ({enabled_steps}/{steps} steps enabled)"
                );
            }
            EngineEvent::CvConnected() => log::debug!("CV input connected, learning scale"),
            EngineEvent::CvDisconnected() => {
                log::debug!("CV input disconnected, restoring previous scale");
            }
            EngineEvent::Snapshot(_) => {}
        }
        Some(event)
    }
}

/// Splits `engine` into its audio-thread and control-thread halves.
pub fn create_tuning_processor(engine: TuningEngine) -> (TuningProcessor, TuningEngineHandle) {
    setup_logger();

    log::info!(
        "Starting tuning engine... ('{}', {} steps)",
        engine.tuning_name(),
        engine.scale().len()
    );

    // Control thread -> audio thread
    let (producer_in, consumer_in) = RingBuffer::new(MESSAGE_QUEUE_CAPACITY);

    // Audio thread -> control thread
    let (producer_out, consumer_out) = RingBuffer::new(MESSAGE_QUEUE_CAPACITY);

    let generation = engine.tables().generation();
    let learning = engine.is_learning();
    let processor = TuningProcessor {
        engine,
        consumer: consumer_in,
        producer: producer_out,
        generation,
        learning,
    };
    let handle = TuningEngineHandle {
        producer: producer_in,
        consumer: consumer_out,
        parser: Box::new(SclParser),
    };

    (processor, handle)
}

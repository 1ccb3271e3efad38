//! Python bindings for [`TuningEngine`].
//!
//! Python drives the engine frame by frame from a single thread, so no ring
//! buffer is involved; the engine sits behind a mutex instead.

use std::sync::{Mutex, MutexGuard};

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::tuning_engine::TuningEngine;
use crate::tuning_engine::constants::MAX_CHANNELS;
use crate::tuning_engine::coordinator::DisplayState;
use crate::tuning_engine::quantizer::MappingMode;

fn mapping_mode(mode: u8) -> PyResult<MappingMode> {
    match mode {
        0..=2 => Ok(MappingMode::from(mode)),
        _ => Err(PyValueError::new_err(format!(
            "mapping mode out of range (expected 0..2, got {mode})"
        ))),
    }
}

/// Pitch quantizer with a user-defined tuning.
#[pyclass]
pub struct XenQuantizer {
    engine: Mutex<TuningEngine>,
    sample_time_s: f64,
}

impl XenQuantizer {
    fn engine(&self) -> PyResult<MutexGuard<'_, TuningEngine>> {
        self.engine
            .lock()
            .map_err(|_| PyRuntimeError::new_err("Failed to acquire engine lock"))
    }
}

#[pymethods]
impl XenQuantizer {
    /// Create a quantizer running at `sample_rate` with the default 12-step tuning.
    #[new]
    #[pyo3(signature = (sample_rate = 48000.0))]
    pub fn new(sample_rate: f64) -> PyResult<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(PyValueError::new_err("sample_rate must be positive"));
        }

        Ok(XenQuantizer {
            engine: Mutex::new(TuningEngine::new()),
            sample_time_s: 1.0 / sample_rate,
        })
    }

    /// Quantize one frame. `cv` is `None` while the learning input is unplugged.
    #[pyo3(signature = (pitch, cv = None))]
    pub fn process(&self, pitch: Vec<f64>, cv: Option<Vec<f64>>) -> PyResult<Vec<f64>> {
        let mut output = vec![0.0; MAX_CHANNELS];
        let channels =
            self.engine()?
                .process(self.sample_time_s, &pitch, cv.as_deref(), &mut output);
        output.truncate(channels);
        Ok(output)
    }

    /// Load a Scala tuning file. The new tuning takes effect at the next light tick.
    pub fn load_tuning_file(&self, path: String) -> PyResult<()> {
        self.engine()?
            .load_tuning_file(&path)
            .map_err(|e| PyValueError::new_err(format!("Failed to load tuning file: {e}")))
    }

    /// Load a tuning from cents values, every step enabled.
    pub fn load_scale(&self, name: String, cents: Vec<f64>) -> PyResult<()> {
        self.engine()?
            .load_scale(&name, &cents)
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Restore the default 12-step equal tuning.
    pub fn reset(&self) -> PyResult<()> {
        self.engine()?.reset();
        Ok(())
    }

    pub fn randomize(&self) -> PyResult<()> {
        self.engine()?.randomize();
        Ok(())
    }

    pub fn set_all_enabled(&self, enabled: bool) -> PyResult<()> {
        self.engine()?.set_all_enabled(enabled);
        Ok(())
    }

    pub fn toggle_step(&self, index: usize) -> PyResult<()> {
        if !self.engine()?.toggle_step(index) {
            return Err(PyValueError::new_err(format!("step {index} out of range")));
        }
        Ok(())
    }

    pub fn set_step_enabled(&self, index: usize, enabled: bool) -> PyResult<()> {
        if !self.engine()?.set_step_enabled(index, enabled) {
            return Err(PyValueError::new_err(format!("step {index} out of range")));
        }
        Ok(())
    }

    /// Select the mapping for the pitch input (0 proximity, 1 proportional, 2 12-EDO).
    pub fn set_input_mapping(&self, mode: u8) -> PyResult<()> {
        let mode = mapping_mode(mode)?;
        self.engine()?.set_input_mapping(mode);
        Ok(())
    }

    /// Select the mapping used when learning from the CV input.
    pub fn set_cv_mapping(&self, mode: u8) -> PyResult<()> {
        let mode = mapping_mode(mode)?;
        self.engine()?.set_cv_mapping(mode);
        Ok(())
    }

    /// Step indicator brightness, one value per indicator.
    pub fn lights(&self) -> PyResult<Vec<f32>> {
        Ok(self.engine()?.lights().to_vec())
    }

    pub fn is_error(&self) -> PyResult<bool> {
        Ok(matches!(
            self.engine()?.display(),
            DisplayState::Error { .. }
        ))
    }

    pub fn tuning_name(&self) -> PyResult<String> {
        Ok(self.engine()?.tuning_name().to_string())
    }

    pub fn scala_dir(&self) -> PyResult<String> {
        Ok(self.engine()?.scala_dir().to_string())
    }

    /// Committed scale as `(cents, enabled)` pairs.
    pub fn steps(&self) -> PyResult<Vec<(f64, bool)>> {
        Ok(self
            .engine()?
            .scale()
            .steps()
            .iter()
            .map(|step| (step.cents, step.enabled))
            .collect())
    }

    /// Serialize the committed state to JSON.
    pub fn save_state(&self) -> PyResult<String> {
        self.engine()?
            .save_state_json()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    /// Restore state saved by [`Self::save_state`].
    pub fn load_state(&self, json: String) -> PyResult<()> {
        self.engine()?
            .load_state_json(&json)
            .map_err(|e| PyValueError::new_err(format!("Invalid state: {e}")))
    }
}

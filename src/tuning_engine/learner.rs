//! Scale learning from the auxiliary CV input.
//!
//! While the CV input is connected, every scan quantizes each CV channel against
//! the full table and enables exactly the steps that were hit. The scale in
//! effect when the cable was plugged in is kept aside and restored verbatim when
//! it is pulled out.

use crate::tuning_engine::constants::MAX_CHANNELS;
use crate::tuning_engine::quantizer::MappingMode;
use crate::tuning_engine::scale::ScaleModel;
use crate::tuning_engine::table::TuningTables;

/// Writes into `out` a copy of `scale` with only the steps hit by `voltages` enabled.
pub fn learn_into(
    out: &mut ScaleModel,
    voltages: &[f64],
    scale: &ScaleModel,
    tables: &TuningTables,
    mode: MappingMode,
) {
    out.copy_from(scale);
    out.set_all_enabled(false);
    for &v in voltages {
        let step = tables.quantize(v, mode, false);
        out.set_enabled(step.position(scale.len()), true);
    }
}

/// Returns a copy of `scale` with only the steps hit by `voltages` enabled.
pub fn learn(
    voltages: &[f64],
    scale: &ScaleModel,
    tables: &TuningTables,
    mode: MappingMode,
) -> ScaleModel {
    let mut out = scale.clone();
    learn_into(&mut out, voltages, scale, tables, mode);
    out
}

/// Change the learner wants staged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LearnerOutput<'a> {
    /// The enabled set learned from the CV input.
    Learned(&'a ScaleModel),

    /// The scale from before the CV input was connected.
    Restored(&'a ScaleModel),
}

pub struct ScaleLearner {
    connected: bool,
    backup: ScaleModel,
    last_scan: Vec<f64>,
    has_scan: bool,
    learned: ScaleModel,
}

impl Default for ScaleLearner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScaleLearner {
    pub fn new() -> Self {
        Self {
            connected: false,
            backup: ScaleModel::default(),
            last_scan: Vec::with_capacity(MAX_CHANNELS),
            has_scan: false,
            learned: ScaleModel::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Clears the memory of the previous scan so the next one is always evaluated.
    pub fn forget(&mut self) {
        self.has_scan = false;
        self.last_scan.clear();
    }

    /// Processes one scan of the CV input.
    ///
    /// `cv` is `None` while the input is disconnected. `current` is the scale the
    /// engine will be running once any pending change lands, and `tables` must be
    /// built from it. Returns the scale to stage, if any.
    pub fn observe(
        &mut self,
        cv: Option<&[f64]>,
        current: &ScaleModel,
        tables: &TuningTables,
        mode: MappingMode,
    ) -> Option<LearnerOutput<'_>> {
        let Some(voltages) = cv else {
            if !self.connected {
                return None;
            }

            self.connected = false;
            self.forget();
            return Some(LearnerOutput::Restored(&self.backup));
        };

        if !self.connected {
            self.connected = true;
            self.backup.copy_from(current);
            self.forget();
        }

        let voltages = &voltages[..voltages.len().min(MAX_CHANNELS)];
        if self.has_scan && self.last_scan.as_slice() == voltages {
            return None;
        }
        self.last_scan.clear();
        self.last_scan.extend_from_slice(voltages);
        self.has_scan = true;

        learn_into(&mut self.learned, voltages, current, tables, mode);
        if self.learned.same_enabled_set(current) {
            return None;
        }

        Some(LearnerOutput::Learned(&self.learned))
    }
}

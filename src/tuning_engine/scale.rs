//! Periodic scale definition.
//!
//! A [`ScaleModel`] is an ascending list of [`ScaleStep`]s measured in cents from
//! the period root. The last step is the period itself (1200 cents for an
//! octave-repeating tuning) and is the point where the next period begins.

use serde::{Deserialize, Serialize};

use crate::tuning_engine::constants::DEFAULT_DIVISIONS;
use crate::tuning_engine::errors::ValidationError;

/// One step of a scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleStep {
    /// Offset from the period root in cents.
    pub cents: f64,

    /// Whether the step is a quantization target.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ScaleStep {
    pub fn new(cents: f64, enabled: bool) -> Self {
        Self { cents, enabled }
    }
}

/// Ordered, non-empty scale with per-step enabled flags.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleModel {
    steps: Vec<ScaleStep>,
}

impl Default for ScaleModel {
    fn default() -> Self {
        Self::equal_divisions(DEFAULT_DIVISIONS)
    }
}

impl ScaleModel {
    /// Creates an equal-tempered octave scale with `divisions` steps, all enabled.
    ///
    /// `divisions` of zero is treated as one.
    pub fn equal_divisions(divisions: usize) -> Self {
        let divisions = divisions.max(1);
        let step_cents = 1200.0 / divisions as f64;
        let steps = (1..=divisions)
            .map(|i| ScaleStep::new(i as f64 * step_cents, true))
            .collect();
        Self { steps }
    }

    /// Builds a validated scale from steps, sorting them by cents.
    pub fn from_steps(steps: Vec<ScaleStep>) -> Result<Self, ValidationError> {
        let mut scale = Self::default();
        scale.set_steps(steps)?;
        Ok(scale)
    }

    /// Builds a validated scale from cents values with every step enabled.
    pub fn from_cents(cents: &[f64]) -> Result<Self, ValidationError> {
        Self::from_steps(cents.iter().map(|&c| ScaleStep::new(c, true)).collect())
    }

    /// Replaces the scale content.
    ///
    /// Steps are sorted ascending by cents. On error the current content is kept.
    pub fn set_steps(&mut self, mut steps: Vec<ScaleStep>) -> Result<(), ValidationError> {
        if steps.is_empty() {
            return Err(ValidationError::Empty);
        }

        if let Some((index, step)) = steps
            .iter()
            .enumerate()
            .find(|(_, step)| !step.cents.is_finite() || step.cents < 0.0)
        {
            return Err(ValidationError::InvalidCents {
                index,
                cents: step.cents,
            });
        }

        steps.sort_by(|a, b| a.cents.total_cmp(&b.cents));

        let period = steps[steps.len() - 1].cents;
        if period <= 0.0 {
            return Err(ValidationError::NonPositivePeriod(period));
        }

        self.steps = steps;
        Ok(())
    }

    /// Copies another scale into this one, reusing the existing allocation.
    pub fn copy_from(&mut self, other: &ScaleModel) {
        self.steps.clone_from(&other.steps);
    }

    /// Enables or disables a single step. Out-of-range indices are ignored.
    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> bool {
        match self.steps.get_mut(index) {
            Some(step) => {
                step.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Flips a single step. Out-of-range indices are ignored.
    pub fn toggle(&mut self, index: usize) -> bool {
        match self.steps.get_mut(index) {
            Some(step) => {
                step.enabled = !step.enabled;
                true
            }
            None => false,
        }
    }

    pub fn set_all_enabled(&mut self, enabled: bool) {
        for step in &mut self.steps {
            step.enabled = enabled;
        }
    }

    /// Cents value of the last step.
    pub fn period(&self) -> f64 {
        self.steps.last().map_or(0.0, |step| step.cents)
    }

    pub fn steps(&self) -> &[ScaleStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.steps.get(index).is_some_and(|step| step.enabled)
    }

    pub fn enabled_count(&self) -> usize {
        self.steps.iter().filter(|step| step.enabled).count()
    }

    /// Returns true when both scales enable exactly the same step positions.
    pub fn same_enabled_set(&self, other: &ScaleModel) -> bool {
        self.steps.len() == other.steps.len()
            && self
                .steps
                .iter()
                .zip(&other.steps)
                .all(|(a, b)| a.enabled == b.enabled)
    }
}

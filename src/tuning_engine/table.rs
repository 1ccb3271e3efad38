//! Tuning table construction.
//!
//! A [`ScaleModel`] is expanded period by period into an ascending list of
//! [`TuningStep`]s spanning [`MIN_VOLT`]..=[`MAX_VOLT`]. The walk upward starts at
//! 0 V and emits `offset + cents / 1200` for every step; the walk downward starts
//! from the period step and emits `offset + (cents - period) / 1200`. The period
//! step of each downward pass lands on the period root, so 0 V is produced by
//! the last step of the scale.
//!
//! Entries are labelled cyclically from the period root: the period step is
//! index 0 (it coincides with the root of the next period) and the step at
//! scale position `p` is index `p + 1`. [`TuningStep::position`] maps a label
//! back to the position in the [`ScaleModel`].
//!
//! Two tables are kept per generation: the full table, with every step, and the
//! enabled table, with only the steps currently enabled.

use crate::tuning_engine::constants::{CENTS_PER_VOLT, MAX_TABLE_STEPS, MAX_VOLT, MIN_VOLT};
use crate::tuning_engine::scale::ScaleModel;

/// An allowed output voltage and the scale step that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningStep {
    /// Output voltage.
    pub voltage: f64,

    /// Originating step counted from the period root, where the root is 0.
    pub scale_index: usize,
}

impl TuningStep {
    /// Position of the originating step in the scale's step list.
    pub fn position(&self, step_count: usize) -> usize {
        if step_count == 0 {
            return 0;
        }

        (self.scale_index + step_count - 1) % step_count
    }
}

fn root_label(position: usize, step_count: usize) -> usize {
    (position + 1) % step_count
}

/// Full and enabled-only tuning tables built from one scale generation.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningTables {
    full: Vec<TuningStep>,
    enabled: Vec<TuningStep>,
    negative_full: usize,
    negative_enabled: usize,
    step_count: usize,
    enabled_step_count: usize,
    period_entries: usize,
    enabled_period_entries: usize,
    period_volts: f64,
    generation: u64,
}

impl TuningTables {
    /// Builds tables for a scale.
    pub fn build(scale: &ScaleModel) -> Self {
        let mut tables = Self {
            full: Vec::with_capacity(256),
            enabled: Vec::with_capacity(256),
            negative_full: 0,
            negative_enabled: 0,
            step_count: 0,
            enabled_step_count: 0,
            period_entries: 0,
            enabled_period_entries: 0,
            period_volts: 0.0,
            generation: 0,
        };
        tables.rebuild(scale);
        tables
    }

    /// Rebuilds both tables in place, reusing their allocations where possible.
    pub fn rebuild(&mut self, scale: &ScaleModel) {
        self.full.clear();
        self.enabled.clear();
        self.generation = self.generation.wrapping_add(1);

        let steps = scale.steps();
        let period = scale.period();
        self.step_count = steps.len();
        self.enabled_step_count = scale.enabled_count();
        self.period_volts = period / CENTS_PER_VOLT;

        if steps.is_empty() || !(period > 0.0) {
            self.negative_full = 0;
            self.negative_enabled = 0;
            self.period_entries = 0;
            self.enabled_period_entries = 0;
            return;
        }

        // Downward walk, collected in descending order.
        let mut period_offset = 0.0;
        'downward: loop {
            let before = self.full.len();
            for (distance, step) in steps.iter().rev().enumerate() {
                let voltage = period_offset + (step.cents - period) / CENTS_PER_VOLT;
                if voltage < MIN_VOLT || self.full.len() >= MAX_TABLE_STEPS {
                    break 'downward;
                }
                if self.full.last().is_some_and(|prev| voltage >= prev.voltage) {
                    continue;
                }
                self.full.push(TuningStep {
                    voltage,
                    scale_index: root_label(steps.len() - 1 - distance, steps.len()),
                });
            }
            if self.full.len() == before {
                break;
            }
            period_offset -= self.period_volts;
        }
        self.full.reverse();

        let mut period_offset = 0.0;
        'upward: loop {
            let before = self.full.len();
            for (index, step) in steps.iter().enumerate() {
                let voltage = period_offset + step.cents / CENTS_PER_VOLT;
                if voltage > MAX_VOLT || self.full.len() >= MAX_TABLE_STEPS {
                    break 'upward;
                }
                if self.full.last().is_some_and(|prev| voltage <= prev.voltage) {
                    continue;
                }
                self.full.push(TuningStep {
                    voltage,
                    scale_index: root_label(index, steps.len()),
                });
            }
            if self.full.len() == before {
                break;
            }
            period_offset += self.period_volts;
        }

        for entry in &self.full {
            if steps[entry.position(steps.len())].enabled {
                self.enabled.push(*entry);
            }
        }

        self.negative_full = self.full.partition_point(|entry| entry.voltage < 0.0);
        self.negative_enabled = self.enabled.partition_point(|entry| entry.voltage < 0.0);

        // Steps merged away as duplicates do not count towards the grid.
        if self.period_volts <= MAX_VOLT {
            let period_volts = self.period_volts;
            let in_first_period = |entry: &&TuningStep| entry.voltage < period_volts;
            self.period_entries = self.full[self.negative_full..]
                .iter()
                .filter(in_first_period)
                .count();
            self.enabled_period_entries = self.enabled[self.negative_enabled..]
                .iter()
                .filter(in_first_period)
                .count();
        } else {
            self.period_entries = self.step_count;
            self.enabled_period_entries = self.enabled_step_count;
        }
    }

    pub fn full(&self) -> &[TuningStep] {
        &self.full
    }

    pub fn enabled(&self) -> &[TuningStep] {
        &self.enabled
    }

    /// Number of full-table entries below 0 V.
    pub fn negative_full(&self) -> usize {
        self.negative_full
    }

    /// Number of enabled-table entries below 0 V.
    pub fn negative_enabled(&self) -> usize {
        self.negative_enabled
    }

    /// Number of steps per period in the source scale.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Number of enabled steps per period in the source scale.
    pub fn enabled_step_count(&self) -> usize {
        self.enabled_step_count
    }

    /// Distinct full-table pitches per period.
    pub fn period_entries(&self) -> usize {
        self.period_entries
    }

    /// Distinct enabled-table pitches per period.
    pub fn enabled_period_entries(&self) -> usize {
        self.enabled_period_entries
    }

    pub fn period_volts(&self) -> f64 {
        self.period_volts
    }

    /// Index of the last scale step, used by the empty-table fallback.
    pub fn last_index(&self) -> usize {
        self.step_count.saturating_sub(1)
    }

    /// Incremented on every rebuild.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

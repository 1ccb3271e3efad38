//! Pitch quantization against the tuning tables.
//!
//! Three mapping algorithms are available:
//!
//! - [`MappingMode::Proximity`]: nearest table entry, ties resolved upward.
//! - [`MappingMode::Proportional`]: the input is read as a position on a uniform
//!   grid with one division per distinct pitch in a period, so the whole scale
//!   is reachable with evenly spaced input voltages whatever its actual intervals.
//! - [`MappingMode::TwelveEdoIsomorphic`]: the input is read as a 12-per-volt
//!   grid over the full table, then (for the enabled table) snapped to the
//!   nearest enabled pitch.

use serde::{Deserialize, Serialize};

use crate::tuning_engine::table::{TuningStep, TuningTables};

/// Mapping algorithm used to turn an input voltage into a table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum MappingMode {
    #[default]
    Proximity,
    Proportional,
    TwelveEdoIsomorphic,
}

impl MappingMode {
    pub const ALL: [MappingMode; 3] = [
        Self::Proximity,
        Self::Proportional,
        Self::TwelveEdoIsomorphic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Proximity => "Proximity",
            Self::Proportional => "Proportional",
            Self::TwelveEdoIsomorphic => "12-EDO isomorphic",
        }
    }
}

impl From<u8> for MappingMode {
    /// Unknown values fall back to [`MappingMode::Proximity`].
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Proportional,
            2 => Self::TwelveEdoIsomorphic,
            _ => Self::Proximity,
        }
    }
}

impl From<MappingMode> for u8 {
    fn from(mode: MappingMode) -> Self {
        match mode {
            MappingMode::Proximity => 0,
            MappingMode::Proportional => 1,
            MappingMode::TwelveEdoIsomorphic => 2,
        }
    }
}

/// Binary search for the nearest entry. Ties go to the upper entry.
///
/// Returns `None` for an empty table.
pub fn nearest(table: &[TuningStep], v: f64) -> Option<TuningStep> {
    let ceil = table.partition_point(|entry| entry.voltage < v);
    if ceil == 0 {
        return table.first().copied();
    }
    if ceil == table.len() {
        return table.last().copied();
    }

    let floor = table[ceil - 1];
    let ceil = table[ceil];
    if (ceil.voltage - v) > (v - floor.voltage) {
        Some(floor)
    } else {
        Some(ceil)
    }
}

fn clamped_lookup(table: &[TuningStep], index: i64) -> Option<TuningStep> {
    if table.is_empty() {
        return None;
    }

    let index = index.clamp(0, table.len() as i64 - 1) as usize;
    Some(table[index])
}

impl TuningTables {
    /// Quantizes `v` to an allowed pitch.
    ///
    /// When the selected table is empty this returns 0 V tagged with the last
    /// scale index, which callers treat as "no pitch available".
    pub fn quantize(&self, v: f64, mode: MappingMode, use_enabled: bool) -> TuningStep {
        let found = match mode {
            MappingMode::Proximity => nearest(self.table(use_enabled), v),
            MappingMode::Proportional => self.proportional(v, use_enabled),
            MappingMode::TwelveEdoIsomorphic => self.twelve_edo(v, use_enabled),
        };

        found.unwrap_or(TuningStep {
            voltage: 0.0,
            scale_index: self.last_index(),
        })
    }

    fn table(&self, use_enabled: bool) -> &[TuningStep] {
        if use_enabled {
            self.enabled()
        } else {
            self.full()
        }
    }

    fn proportional(&self, v: f64, use_enabled: bool) -> Option<TuningStep> {
        let (table, negative, step_count) = if use_enabled {
            (self.enabled(), self.negative_enabled(), self.enabled_period_entries())
        } else {
            (self.full(), self.negative_full(), self.period_entries())
        };
        if table.is_empty() || self.period_volts() <= 0.0 {
            return None;
        }

        let offset = (v / self.period_volts() * step_count as f64).round() as i64;
        clamped_lookup(table, (negative as i64).saturating_add(offset))
    }

    fn twelve_edo(&self, v: f64, use_enabled: bool) -> Option<TuningStep> {
        let offset = (v * 12.0).round() as i64;
        let index = (self.negative_full() as i64).saturating_add(offset);
        let grid_point = clamped_lookup(self.full(), index)?;

        if use_enabled {
            nearest(self.enabled(), grid_point.voltage)
        } else {
            Some(grid_point)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning_engine::constants::{MAX_VOLT, MIN_VOLT};
    use crate::tuning_engine::scale::{ScaleModel, ScaleStep};
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn twelve_equal() -> TuningTables {
        TuningTables::build(&ScaleModel::default())
    }

    #[test]
    fn test_proximity_picks_closer_upper_entry() {
        let tables = twelve_equal();

        let step = tables.quantize(0.05, MappingMode::Proximity, true);

        assert_abs_diff_eq!(step.voltage, 1.0 / 12.0, epsilon = 1e-9);
        assert_eq!(step.scale_index, 1);
        assert_eq!(step.position(12), 0);
    }

    #[test]
    fn test_proximity_picks_closer_lower_entry() {
        let tables = twelve_equal();

        let step = tables.quantize(0.03, MappingMode::Proximity, true);

        assert_eq!(step.voltage, 0.0);
        assert_eq!(step.scale_index, 0);
    }

    #[test]
    fn test_proximity_tie_goes_up() {
        let tables = TuningTables::build(&ScaleModel::equal_divisions(4));

        let step = tables.quantize(0.125, MappingMode::Proximity, false);

        assert_eq!(step.voltage, 0.25);
        assert_eq!(step.scale_index, 1);
    }

    #[test]
    fn test_proximity_clamps_out_of_range() {
        let tables = twelve_equal();

        let low = tables.quantize(-20.0, MappingMode::Proximity, true);
        let high = tables.quantize(20.0, MappingMode::Proximity, true);

        assert_abs_diff_eq!(low.voltage, MIN_VOLT, epsilon = 1e-9);
        assert_abs_diff_eq!(high.voltage, MAX_VOLT, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_enabled_table_returns_sentinel() {
        let mut scale = ScaleModel::default();
        scale.set_all_enabled(false);
        let tables = TuningTables::build(&scale);

        for mode in MappingMode::ALL {
            for v in [-5.0, -0.3, 0.0, 0.41, 7.0] {
                let step = tables.quantize(v, mode, true);
                assert_eq!(step, TuningStep { voltage: 0.0, scale_index: 11 });
            }
        }
    }

    #[test]
    fn test_proportional_uses_uniform_grid() {
        // Just intonation major triad plus octave: uneven intervals.
        let scale = ScaleModel::from_cents(&[386.3, 702.0, 1200.0]).unwrap();
        let tables = TuningTables::build(&scale);

        let third = tables.quantize(1.0 / 3.0, MappingMode::Proportional, false);
        let fifth = tables.quantize(2.0 / 3.0, MappingMode::Proportional, false);
        let octave = tables.quantize(1.0, MappingMode::Proportional, false);

        assert_eq!(third.scale_index, 1);
        assert_abs_diff_eq!(third.voltage, 386.3 / 1200.0, epsilon = 1e-9);
        assert_eq!(fifth.scale_index, 2);
        assert_eq!(octave.scale_index, 0);
        assert_abs_diff_eq!(octave.voltage, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_proportional_enabled_counts_enabled_steps() {
        let mut scale = ScaleModel::default();
        scale.set_all_enabled(false);
        for index in [1, 3, 6, 8, 11] {
            scale.set_enabled(index, true);
        }
        let tables = TuningTables::build(&scale);

        // Five enabled steps per volt: one enabled step every 0.2 V of input.
        let step = tables.quantize(0.2, MappingMode::Proportional, true);
        assert_eq!(step.position(12), 1);
        let step = tables.quantize(0.4, MappingMode::Proportional, true);
        assert_eq!(step.position(12), 3);
        let step = tables.quantize(-0.2, MappingMode::Proportional, true);
        assert_eq!(step.position(12), 8);
    }

    #[test]
    fn test_proportional_grid_ignores_merged_steps() {
        // The 0-cent step coincides with the period root, leaving two pitches per period.
        let scale = ScaleModel::from_cents(&[0.0, 700.0, 1200.0]).unwrap();
        let tables = TuningTables::build(&scale);

        let fifth = tables.quantize(0.5, MappingMode::Proportional, false);
        let octave = tables.quantize(1.0, MappingMode::Proportional, false);

        assert_abs_diff_eq!(fifth.voltage, 700.0 / 1200.0, epsilon = 1e-9);
        assert_abs_diff_eq!(octave.voltage, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_proportional_rounds_half_away_from_zero() {
        let tables = TuningTables::build(&ScaleModel::equal_divisions(4));

        let up = tables.quantize(0.125, MappingMode::Proportional, false);
        let down = tables.quantize(-0.125, MappingMode::Proportional, false);

        assert_eq!(up.voltage, 0.25);
        assert_eq!(down.voltage, -0.25);
    }

    #[test]
    fn test_twelve_edo_rounds_half_away_from_zero() {
        let tables = TuningTables::build(&ScaleModel::equal_divisions(24));

        // 0.375 V is exactly between grid points 4 and 5.
        let step = tables.quantize(0.375, MappingMode::TwelveEdoIsomorphic, false);

        assert_eq!(step, tables.full()[tables.negative_full() + 5]);
    }

    #[test]
    fn test_twelve_edo_addresses_full_table_by_index() {
        // 5-EDO: one volt of input covers 12 full-table entries, more than two periods.
        let tables = TuningTables::build(&ScaleModel::equal_divisions(5));

        let step = tables.quantize(1.0, MappingMode::TwelveEdoIsomorphic, false);

        assert_abs_diff_eq!(step.voltage, 12.0 / 5.0, epsilon = 1e-9);
        assert_eq!(step.scale_index, 2);
    }

    #[test]
    fn test_twelve_edo_two_stage_enabled_lookup() {
        let mut scale = ScaleModel::equal_divisions(5);
        scale.set_all_enabled(false);
        scale.set_enabled(4, true);
        let tables = TuningTables::build(&scale);

        // Grid point for 1 V is 2.4 V; the nearest enabled pitch is 2 V.
        let step = tables.quantize(1.0, MappingMode::TwelveEdoIsomorphic, true);
        assert_abs_diff_eq!(step.voltage, 2.0, epsilon = 1e-9);
        assert_eq!(step.scale_index, 0);

        // A direct proximity lookup of 1 V would give 1 V instead.
        let direct = tables.quantize(1.0, MappingMode::Proximity, true);
        assert_abs_diff_eq!(direct.voltage, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_indices_clamped_at_boundaries() {
        let tables = twelve_equal();
        let first = tables.full()[0];
        let last = tables.full()[tables.full().len() - 1];

        for mode in [MappingMode::Proportional, MappingMode::TwelveEdoIsomorphic] {
            for v in [MIN_VOLT, MIN_VOLT - 0.01, -100.0, f64::NEG_INFINITY] {
                assert_eq!(tables.quantize(v, mode, false), first);
            }
            for v in [MAX_VOLT, MAX_VOLT + 0.01, 100.0, f64::INFINITY] {
                assert_eq!(tables.quantize(v, mode, false), last);
            }
        }
    }

    #[test]
    fn test_mapping_mode_from_u8() {
        assert_eq!(MappingMode::from(0), MappingMode::Proximity);
        assert_eq!(MappingMode::from(1), MappingMode::Proportional);
        assert_eq!(MappingMode::from(2), MappingMode::TwelveEdoIsomorphic);
        assert_eq!(MappingMode::from(9), MappingMode::Proximity);
        assert_eq!(u8::from(MappingMode::TwelveEdoIsomorphic), 2);
    }

    fn arb_scale() -> impl Strategy<Value = ScaleModel> {
        prop::collection::vec((1.0f64..2400.0, any::<bool>()), 1..24).prop_map(|steps| {
            ScaleModel::from_steps(
                steps
                    .into_iter()
                    .map(|(cents, enabled)| ScaleStep::new(cents, enabled))
                    .collect(),
            )
            .unwrap()
        })
    }

    proptest! {
        #[test]
        fn prop_proximity_within_half_spacing(scale in arb_scale(), v in -3.9f64..5.9) {
            let tables = TuningTables::build(&scale);
            let table = tables.full();
            let step = tables.quantize(v, MappingMode::Proximity, false);

            let ceil = table.partition_point(|e| e.voltage < v);
            prop_assume!(ceil > 0 && ceil < table.len());
            let spacing = table[ceil].voltage - table[ceil - 1].voltage;
            prop_assert!((step.voltage - v).abs() <= 0.5 * spacing + 1e-12);

            let midpoint = table[ceil - 1].voltage + 0.5 * spacing;
            if midpoint - table[ceil - 1].voltage == table[ceil].voltage - midpoint {
                let tie = tables.quantize(midpoint, MappingMode::Proximity, false);
                prop_assert_eq!(tie, table[ceil]);
            }
        }

        #[test]
        fn prop_grid_modes_never_out_of_bounds(
            scale in arb_scale(),
            v in prop_oneof![-1.0e6f64..1.0e6, Just(MIN_VOLT), Just(MAX_VOLT)],
            use_enabled in any::<bool>(),
        ) {
            let tables = TuningTables::build(&scale);
            for mode in MappingMode::ALL {
                let step = tables.quantize(v, mode, use_enabled);
                prop_assert!(step.voltage >= MIN_VOLT && step.voltage <= MAX_VOLT);
                prop_assert!(step.scale_index < scale.len());
            }
        }
    }
}

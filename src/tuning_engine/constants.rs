//! Tuning engine configuration constants and limits.

/// Lowest voltage covered by the tuning tables (about 16 Hz when 0 V is middle C).
pub const MIN_VOLT: f64 = -4.0;

/// Highest voltage covered by the tuning tables (about 17 kHz when 0 V is middle C).
pub const MAX_VOLT: f64 = 6.0;

/// Cents per volt (one volt per octave).
pub const CENTS_PER_VOLT: f64 = 1200.0;

/// Number of equal divisions in the default tuning.
pub const DEFAULT_DIVISIONS: usize = 12;

/// Tuning name used when none is known.
pub const UNKNOWN_TUNING_NAME: &str = "Unknown";

/// Tuning name of the default equal-tempered tuning.
pub const DEFAULT_TUNING_NAME: &str = "12-EDO";

/// Number of step indicators (and step buttons) on the panel.
pub const MATRIX_SIZE: usize = 36;

/// Maximum number of polyphonic channels per port.
pub const MAX_CHANNELS: usize = 16;

/// Upper bound on the number of entries in a tuning table.
pub const MAX_TABLE_STEPS: usize = 8192;

/// Rate of the light/control cadence, where staged changes are committed.
pub const LIGHT_RATE_HZ: f64 = 60.0;

/// Rate at which the auxiliary CV input is scanned for scale learning.
pub const SCAN_RATE_HZ: f64 = 1000.0;

/// Number of on/off cycles shown after a failed tuning-file load.
pub const ERROR_BLINK_CYCLES: u32 = 3;

/// Light ticks spent in each on or off phase of the error blink.
pub const ERROR_BLINK_PHASE_TICKS: u32 = 15;

/// Brightness of an enabled step that is not currently sounding.
pub const ENABLED_BRIGHTNESS: f32 = 0.25;

/// Brightness of the step currently selected for the first channel.
pub const ACTIVE_BRIGHTNESS: f32 = 1.0;

/// Capacity of the control and event ring buffers.
pub const MESSAGE_QUEUE_CAPACITY: usize = 256;

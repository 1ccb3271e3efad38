//! Elapsed-time accumulators for the slower update domains.

/// Fires once every `1 / rate_hz` seconds of accumulated sample time.
#[derive(Debug, Clone)]
pub struct Cadence {
    interval_s: f64,
    elapsed_s: f64,
}

impl Cadence {
    pub fn new(rate_hz: f64) -> Self {
        let interval_s = if rate_hz.is_finite() && rate_hz > 0.0 {
            1.0 / rate_hz
        } else {
            0.0
        };

        Self {
            interval_s,
            elapsed_s: 0.0,
        }
    }

    /// Advances by one frame. Returns true when the interval was exceeded,
    /// in which case the accumulator starts over.
    pub fn tick(&mut self, sample_time_s: f64) -> bool {
        if sample_time_s.is_finite() && sample_time_s > 0.0 {
            self.elapsed_s += sample_time_s;
        }

        if self.elapsed_s >= self.interval_s {
            self.elapsed_s = 0.0;
            return true;
        }

        false
    }

    pub fn reset(&mut self) {
        self.elapsed_s = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_at_rate() {
        let mut cadence = Cadence::new(1000.0);
        let sample_time = 1.0 / 48_000.0;

        let fired = (0..48_000).filter(|_| cadence.tick(sample_time)).count();

        // One tick every 48 or 49 frames depending on rounding.
        assert!((975..=1000).contains(&fired), "fired {fired} times");
    }

    #[test]
    fn test_independent_of_sample_rate() {
        let mut slow = Cadence::new(60.0);
        let mut fast = Cadence::new(60.0);

        let slow_ticks = (0..44_100).filter(|_| slow.tick(1.0 / 44_100.0)).count();
        let fast_ticks = (0..96_000).filter(|_| fast.tick(1.0 / 96_000.0)).count();

        assert!(slow_ticks.abs_diff(fast_ticks) <= 1);
    }

    #[test]
    fn test_zero_rate_fires_every_frame() {
        let mut cadence = Cadence::new(0.0);

        assert!(cadence.tick(1.0 / 48_000.0));
        assert!(cadence.tick(1.0 / 48_000.0));
    }

    #[test]
    fn test_reset() {
        let mut cadence = Cadence::new(10.0);
        assert!(!cadence.tick(0.09));

        cadence.reset();

        assert!(!cadence.tick(0.09));
        assert!(cadence.tick(0.02));
    }
}

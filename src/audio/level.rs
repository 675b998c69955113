// Level metering - block RMS and the signal-level percentage shown to users

/// Level floor in dBFS; anything quieter reads as 0%
pub const LEVEL_FLOOR_DB: f32 = -60.0;

/// Root mean square of a block of samples. Empty input yields 0.
///
/// Accumulates in f64 so long windows stay accurate.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&x| (x as f64) * (x as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Map an RMS value onto 0-100 using a dBFS scale with a -60 dB floor.
pub fn level_percent(rms: f32) -> f32 {
    if rms.is_nan() || rms <= 0.0 {
        return 0.0;
    }
    let db = 20.0 * rms.log10();
    ((db - LEVEL_FLOOR_DB) / -LEVEL_FLOOR_DB * 100.0).clamp(0.0, 100.0)
}

/// Tracks the RMS of the most recent block
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelMeter {
    last_rms: f32,
    peak_rms: f32,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measure a block and return its RMS
    pub fn process(&mut self, block: &[f32]) -> f32 {
        self.record(rms(block))
    }

    /// Record an RMS value measured elsewhere
    pub fn record(&mut self, rms: f32) -> f32 {
        self.last_rms = rms;
        self.peak_rms = self.peak_rms.max(rms);
        rms
    }

    pub fn rms(&self) -> f32 {
        self.last_rms
    }

    /// Highest block RMS since creation or the last reset
    pub fn peak_rms(&self) -> f32 {
        self.peak_rms
    }

    pub fn level_percent(&self) -> f32 {
        level_percent(self.last_rms)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_of_constant_signal() {
        assert!((rms(&[0.5; 64]) - 0.5).abs() < 1e-6);
        assert!((rms(&[-0.25; 10]) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_rms_of_empty_block_is_zero() {
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_rms_of_sine_is_amplitude_over_root_two() {
        let samples: Vec<f32> = (0..4410)
            .map(|i| (2.0 * std::f32::consts::PI * 100.0 * i as f32 / 44_100.0).sin())
            .collect();
        assert!((rms(&samples) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn test_level_percent_scale() {
        assert_eq!(level_percent(0.0), 0.0);
        assert_eq!(level_percent(f32::NAN), 0.0);
        assert!((level_percent(1.0) - 100.0).abs() < 1e-4);
        // -30 dBFS is half way
        assert!((level_percent(10f32.powf(-1.5)) - 50.0).abs() < 1e-3);
        assert_eq!(level_percent(1e-5), 0.0);
        assert_eq!(level_percent(4.0), 100.0);
    }

    #[test]
    fn test_level_meter_tracks_last_and_peak() {
        let mut meter = LevelMeter::new();
        meter.process(&[0.5; 32]);
        meter.process(&[0.1; 32]);
        assert!((meter.rms() - 0.1).abs() < 1e-6);
        assert!((meter.peak_rms() - 0.5).abs() < 1e-6);

        meter.reset();
        assert_eq!(meter.rms(), 0.0);
        assert_eq!(meter.peak_rms(), 0.0);
    }
}

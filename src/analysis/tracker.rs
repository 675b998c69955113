// PitchTracker - estimator plus its live configuration and cross-block history
//
// Configuration setters only touch the stored config, so a change applies to
// the next window processed. History is owned here and replaced wholesale by
// each estimation; `reset` is the only other way to change it.

use crate::analysis::pitch::{
    Algorithm, Estimation, EstimatorConfig, GateMode, PitchEstimator, TrackerState,
};
use crate::error::AudioError;

pub struct PitchTracker {
    estimator: PitchEstimator,
    config: EstimatorConfig,
    history: TrackerState,
}

/// Non-finite or negative values collapse to 0
fn non_negative(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

impl PitchTracker {
    pub fn new(
        sample_rate: u32,
        window_size: usize,
        config: EstimatorConfig,
    ) -> Result<Self, AudioError> {
        let mut tracker = Self {
            estimator: PitchEstimator::new(sample_rate, window_size)?,
            config: EstimatorConfig::default(),
            history: TrackerState::default(),
        };
        tracker.set_algorithm(config.algorithm);
        tracker.set_noise_gate_threshold(config.noise_gate_threshold);
        tracker.set_bias(config.pyin_bias);
        tracker.set_gate_mode(config.pyin_gate_mode);
        Ok(tracker)
    }

    /// Estimate one window with the current configuration and history
    pub fn process(&mut self, window: &[f32]) -> Estimation {
        let result = self.estimator.estimate(window, &self.config, self.history);
        self.history = result.history;
        result
    }

    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.config.algorithm = algorithm;
    }

    pub fn set_noise_gate_threshold(&mut self, threshold: f32) {
        self.config.noise_gate_threshold = non_negative(threshold);
    }

    pub fn set_bias(&mut self, bias: f32) {
        self.config.pyin_bias = non_negative(bias);
    }

    pub fn set_gate_mode(&mut self, mode: GateMode) {
        self.config.pyin_gate_mode = mode;
    }

    /// Forget the previous frequency and smoothed level
    pub fn reset(&mut self) {
        self.history = TrackerState::default();
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn history(&self) -> TrackerState {
        self.history
    }

    pub fn sample_rate(&self) -> u32 {
        self.estimator.sample_rate()
    }

    pub fn window_size(&self) -> usize {
        self.estimator.window_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::pitch::Verdict;
    use crate::fixtures::sine;

    fn tracker(algorithm: Algorithm) -> PitchTracker {
        let config = EstimatorConfig {
            algorithm,
            ..EstimatorConfig::default()
        };
        PitchTracker::new(44_100, 2048, config).unwrap()
    }

    #[test]
    fn test_new_propagates_estimator_errors() {
        assert!(PitchTracker::new(0, 2048, EstimatorConfig::default()).is_err());
    }

    #[test]
    fn test_pyin_history_accumulates_across_windows() {
        let mut tracker = tracker(Algorithm::Pyin);
        let window = sine(220.0, 0.5, 44_100, 2048);

        let first = tracker.process(&window);
        assert!(first.estimate.is_pitched());
        assert!(tracker.history().previous_frequency().is_some());

        let after_one = tracker.history().smoothed_rms();
        tracker.process(&window);
        assert!(tracker.history().smoothed_rms() > after_one);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut tracker = tracker(Algorithm::Pyin);
        tracker.process(&sine(220.0, 0.5, 44_100, 2048));
        tracker.reset();
        assert_eq!(tracker.history(), TrackerState::default());
    }

    #[test]
    fn test_switching_algorithm_keeps_history() {
        let mut tracker = tracker(Algorithm::Pyin);
        tracker.process(&sine(220.0, 0.5, 44_100, 2048));
        let history = tracker.history();

        tracker.set_algorithm(Algorithm::Mpm);
        tracker.process(&sine(330.0, 0.5, 44_100, 2048));
        assert_eq!(tracker.history(), history);
    }

    #[test]
    fn test_noise_gate_change_applies_to_next_window() {
        let mut tracker = tracker(Algorithm::Yin);
        let window = sine(220.0, 0.05, 44_100, 2048);
        assert_eq!(tracker.process(&window).verdict, Verdict::Pitched);

        tracker.set_noise_gate_threshold(0.2);
        assert_eq!(tracker.process(&window).verdict, Verdict::NoSignal);
    }

    #[test]
    fn test_setters_clamp_invalid_values() {
        let mut tracker = tracker(Algorithm::Yin);
        tracker.set_noise_gate_threshold(-1.0);
        tracker.set_bias(f32::NAN);
        tracker.set_gate_mode(GateMode::Instant);
        assert_eq!(tracker.config().noise_gate_threshold, 0.0);
        assert_eq!(tracker.config().pyin_bias, 0.0);
        assert_eq!(tracker.config().pyin_gate_mode, GateMode::Instant);
    }
}

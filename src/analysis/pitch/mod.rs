//! Pitch estimation - five interchangeable monophonic f0 estimators
//!
//! Every algorithm consumes one analysis window and returns either a positive
//! frequency or no pitch. They share:
//! - the noise gate (window RMS below `noise_gate_threshold` skips the algorithm)
//! - the lag search range (`sample_rate / 2000` ..= `sample_rate / 30`)
//! - 3-point parabolic refinement of the chosen integer lag or bin
//!
//! Algorithms are pure functions of (window, sample rate, config, history).
//! The only cross-block memory, pYIN's previous frequency and smoothed RMS,
//! travels as an explicit [`TrackerState`] value passed in and handed back.
//!
//! All scratch memory is allocated once by [`PitchEstimator::new`], so
//! estimation performs no heap allocation on the audio path.

use serde::{Deserialize, Serialize};

use crate::audio::level::rms;
use crate::error::AudioError;

pub mod common;
mod hps;
mod mpm;
mod pyin;
mod swipe;
mod yin;


use common::PeriodRange;

/// Pitch estimation algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// First cmndf dip below a fixed threshold
    #[default]
    Yin,
    /// Probabilistic YIN with temporal stickiness
    Pyin,
    /// McLeod pitch method (normalized square difference)
    Mpm,
    /// Subharmonic summation over log-spaced candidates
    Swipe,
    /// Harmonic product spectrum
    Hps,
}

impl Algorithm {
    pub const ALL: [Algorithm; 5] = [
        Algorithm::Yin,
        Algorithm::Pyin,
        Algorithm::Mpm,
        Algorithm::Swipe,
        Algorithm::Hps,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Yin => "yin",
            Algorithm::Pyin => "pyin",
            Algorithm::Mpm => "mpm",
            Algorithm::Swipe => "swipe",
            Algorithm::Hps => "hps",
        }
    }
}

/// pYIN acceptance threshold policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    /// Threshold follows an exponentially smoothed RMS
    #[default]
    Smooth,
    /// Fixed threshold
    Instant,
}

/// Runtime estimator configuration, applied from the next window onward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    pub algorithm: Algorithm,
    pub noise_gate_threshold: f32,
    pub pyin_bias: f32,
    pub pyin_gate_mode: GateMode,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Yin,
            noise_gate_threshold: 0.01,
            pyin_bias: 2.0,
            pyin_gate_mode: GateMode::Smooth,
        }
    }
}

/// Result of estimating one window
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PitchEstimate {
    #[default]
    NoPitch,
    /// Fundamental frequency in Hz, always finite and positive
    Frequency(f32),
}

impl PitchEstimate {
    /// Wrap a frequency, mapping zero, negative and non-finite values to `NoPitch`.
    pub fn from_hz(hz: f32) -> Self {
        if hz.is_finite() && hz > 0.0 {
            PitchEstimate::Frequency(hz)
        } else {
            PitchEstimate::NoPitch
        }
    }

    pub fn frequency(&self) -> Option<f32> {
        match *self {
            PitchEstimate::Frequency(hz) => Some(hz),
            PitchEstimate::NoPitch => None,
        }
    }

    pub fn is_pitched(&self) -> bool {
        matches!(self, PitchEstimate::Frequency(_))
    }
}

/// Why an estimate came out the way it did.
///
/// Callers only ever see [`PitchEstimate`]; the verdict exists so tests and
/// diagnostics can tell a gated window from a rejected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pitched,
    /// Window RMS below the noise gate; the algorithm did not run
    NoSignal,
    /// Algorithm ran but no candidate cleared its acceptance threshold
    NoConfidentPitch,
}

/// Cross-block memory used by pYIN
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackerState {
    previous_frequency: Option<f32>,
    smoothed_rms: f32,
}

impl TrackerState {
    pub fn previous_frequency(&self) -> Option<f32> {
        self.previous_frequency
    }

    pub fn smoothed_rms(&self) -> f32 {
        self.smoothed_rms
    }
}

/// Output of [`PitchEstimator::estimate`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimation {
    pub estimate: PitchEstimate,
    pub verdict: Verdict,
    /// Window RMS used by the noise gate
    pub rms: f32,
    /// History to pass into the next call
    pub history: TrackerState,
}

/// Preallocated working memory shared by all algorithms
pub(crate) struct Scratch {
    /// Lag-domain function (d, cmndf, nsdf or acf), indexed by lag
    pub lag: Vec<f32>,
    /// (index, score) candidates; capacity never exceeded
    pub candidates: Vec<(usize, f32)>,
    /// SWIPE candidate strengths
    pub strengths: Vec<f32>,
    /// HPS spectrum and product
    pub spectrum: Vec<f32>,
    pub product: Vec<f32>,
    /// Windowed HPS frame
    pub frame: Vec<f32>,
    /// DFT twiddle tables for the fixed HPS transform size
    pub cos_table: Vec<f32>,
    pub sin_table: Vec<f32>,
}

impl Scratch {
    fn new(window_size: usize) -> Self {
        let lag_len = window_size + 2;
        let (cos_table, sin_table) = hps::twiddle_tables();
        Self {
            lag: vec![0.0; lag_len],
            candidates: Vec::with_capacity(lag_len.max(swipe::CANDIDATE_COUNT)),
            strengths: vec![0.0; swipe::CANDIDATE_COUNT],
            spectrum: vec![0.0; hps::TRANSFORM_SIZE / 2 + 1],
            product: vec![0.0; hps::TRANSFORM_SIZE / 2 + 1],
            frame: vec![0.0; hps::TRANSFORM_SIZE],
            cos_table,
            sin_table,
        }
    }
}

/// Owner of the per-session estimator scratch memory
pub struct PitchEstimator {
    sample_rate: u32,
    window_size: usize,
    scratch: Scratch,
}

impl PitchEstimator {
    /// Create an estimator for windows of `window_size` samples.
    ///
    /// # Errors
    /// `InvalidSampleRate` for a zero rate, `InvalidWindowSize` if the window
    /// cannot hold the shortest searchable period range.
    pub fn new(sample_rate: u32, window_size: usize) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate { sample_rate });
        }
        let minimum = PeriodRange::minimum_window(sample_rate);
        if window_size < minimum {
            return Err(AudioError::InvalidWindowSize {
                size: window_size,
                minimum,
            });
        }

        Ok(Self {
            sample_rate,
            window_size,
            scratch: Scratch::new(window_size),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Estimate the pitch of one analysis window.
    ///
    /// Windows longer than the configured size are analysed on their most
    /// recent `window_size` samples. Windows too short for the period range
    /// produce `NoConfidentPitch`.
    pub fn estimate(
        &mut self,
        window: &[f32],
        config: &EstimatorConfig,
        history: TrackerState,
    ) -> Estimation {
        let window = if window.len() > self.window_size {
            &window[window.len() - self.window_size..]
        } else {
            window
        };

        let level = rms(window);
        if level < config.noise_gate_threshold {
            return Estimation {
                estimate: PitchEstimate::NoPitch,
                verdict: Verdict::NoSignal,
                rms: level,
                history,
            };
        }

        let Some(range) = PeriodRange::new(self.sample_rate, window.len()) else {
            return Estimation {
                estimate: PitchEstimate::NoPitch,
                verdict: Verdict::NoConfidentPitch,
                rms: level,
                history,
            };
        };

        let sample_rate = self.sample_rate as f32;
        let scratch = &mut self.scratch;
        let (hz, history) = match config.algorithm {
            Algorithm::Yin => (yin::estimate(window, sample_rate, range, scratch), history),
            Algorithm::Pyin => pyin::estimate(
                window,
                sample_rate,
                range,
                pyin::Params {
                    rms: level,
                    bias: config.pyin_bias,
                    gate_mode: config.pyin_gate_mode,
                },
                history,
                scratch,
            ),
            Algorithm::Mpm => (mpm::estimate(window, sample_rate, range, scratch), history),
            Algorithm::Swipe => (swipe::estimate(window, sample_rate, scratch), history),
            Algorithm::Hps => (hps::estimate(window, sample_rate, scratch), history),
        };

        let estimate = hz.map(PitchEstimate::from_hz).unwrap_or_default();
        let verdict = if estimate.is_pitched() {
            Verdict::Pitched
        } else {
            Verdict::NoConfidentPitch
        };

        Estimation {
            estimate,
            verdict,
            rms: level,
            history,
        }
    }
}

//! Configuration management for dynamic parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling fast iteration without recompilation. Pitch estimator defaults,
//! capture block sizes and scheduler timing can all be adjusted via the
//! config file. Every field has a default so partial files are accepted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::pitch::{Algorithm, EstimatorConfig, GateMode};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pitch: PitchConfig,
    pub audio: AudioConfig,
    pub scheduler: SchedulerConfig,
    pub exercise: ExerciseConfig,
}

/// Pitch estimator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    /// Algorithm selected at session start
    pub algorithm: Algorithm,
    /// Window RMS below this value yields no pitch
    pub noise_gate_threshold: f32,
    /// Semitone scale of the pYIN stickiness bonus (0 disables it)
    pub pyin_bias: f32,
    /// pYIN acceptance threshold policy
    pub pyin_gate_mode: GateMode,
    /// Analysis window length in samples
    pub window_size: usize,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Yin,
            noise_gate_threshold: 0.01,
            pyin_bias: 2.0,
            pyin_gate_mode: GateMode::Smooth,
            window_size: 2048,
        }
    }
}

impl PitchConfig {
    /// Runtime estimator configuration derived from this section
    pub fn estimator_config(&self) -> EstimatorConfig {
        EstimatorConfig {
            algorithm: self.algorithm,
            noise_gate_threshold: self.noise_gate_threshold.max(0.0),
            pyin_bias: self.pyin_bias.max(0.0),
            pyin_gate_mode: self.pyin_gate_mode,
        }
    }
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture sample rate in Hz
    pub sample_rate: u32,
    /// Size of buffer pool for real-time audio transfer
    pub buffer_pool_size: usize,
    /// Maximum samples delivered per capture callback
    pub block_size: usize,
    /// Capacity of the tracker command queue
    pub command_queue_capacity: usize,
    /// Log analysis statistics every N windows
    pub log_every_n_windows: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            buffer_pool_size: 32,
            block_size: 512,
            command_queue_capacity: 64,
            log_every_n_windows: 100,
        }
    }
}

/// Look-ahead scheduler timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Period of the scheduling tick
    pub tick_interval_ms: u64,
    /// Metronome events are emitted this far ahead of the clock
    pub lookahead_ms: u64,
    /// Next sequence is generated this long before it starts
    pub sequence_lead_ms: u64,
    /// Duration reported for metronome click events
    pub click_duration_ms: u64,
    /// Broadcast buffer for transport events
    pub event_channel_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 25,
            lookahead_ms: 100,
            sequence_lead_ms: 200,
            click_duration_ms: 20,
            event_channel_capacity: 256,
        }
    }
}

impl SchedulerConfig {
    pub fn lookahead_seconds(&self) -> f64 {
        self.lookahead_ms as f64 / 1000.0
    }

    pub fn sequence_lead_seconds(&self) -> f64 {
        self.sequence_lead_ms as f64 / 1000.0
    }

    pub fn click_duration_seconds(&self) -> f64 {
        self.click_duration_ms as f64 / 1000.0
    }
}

/// Exercise progression settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExerciseConfig {
    /// Silent beats between consecutive sequences
    pub gap_beats: f64,
    /// Play a preview rendition of the pattern before each target rendition
    pub preview_before_target: bool,
    /// Emit metronome clicks alongside the exercise
    pub metronome_enabled: bool,
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            gap_beats: 2.0,
            preview_before_target: false,
            metronome_enabled: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file does not exist
    /// or is not valid JSON
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default asset location
    pub fn load() -> Self {
        Self::load_from_file("assets/vocal_config.json")
    }
}

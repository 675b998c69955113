// Analysis module - per-block voice analysis pipeline
//
// This module assembles the audio-path pipeline: capture blocks are windowed
// by the SignalBuffer, metered, and each completed window is handed to the
// PitchTracker. The latest estimate and level are published through a
// single-writer value cell for the scheduling and rendering side.
//
// Architecture:
// - VoiceAnalyzer: owns the pipeline; `process_block` runs once per capture block
// - AnalyzerControl: non-blocking command producer used to retune the tracker
// - PitchMonitor: cloneable reader of the latest PitchReading
// - spawn_analysis_thread: drains a BufferPool data queue into a VoiceAnalyzer
//
// The per-block path never blocks, never logs and never allocates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rtrb::{Consumer, PopError, Producer, PushError, RingBuffer};

use crate::audio::buffer_pool::AnalysisChannels;
use crate::audio::level::LevelMeter;
use crate::audio::signal_buffer::SignalBuffer;
use crate::config::AppConfig;
use crate::error::AudioError;

pub mod pitch;
pub mod publish;
pub mod session;
pub mod tracker;

use pitch::{Algorithm, Estimation, GateMode, Verdict};
use publish::{published_value, PitchPublisher};
use tracker::PitchTracker;

pub use publish::{PitchMonitor, PitchReading};
pub use session::AnalysisSession;

/// Configuration change for the tracker, applied before the next block
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerCommand {
    SetAlgorithm(Algorithm),
    SetNoiseGate(f32),
    SetBias(f32),
    SetGateMode(GateMode),
    /// Clear tracker history and any partial window
    Reset,
}

/// Outcome of processing one capture block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockResult {
    /// RMS of the block
    pub rms: f32,
    /// Set when the block completed an analysis window
    pub estimation: Option<Estimation>,
}

/// Running counters kept by the analyzer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisStats {
    pub blocks: u64,
    pub windows: u64,
    pub pitched_windows: u64,
    pub gated_windows: u64,
    pub commands_applied: u64,
}

/// Audio-path pipeline: SignalBuffer → LevelMeter → PitchTracker → publisher
pub struct VoiceAnalyzer {
    buffer: SignalBuffer,
    meter: LevelMeter,
    tracker: PitchTracker,
    commands: Consumer<TrackerCommand>,
    publisher: PitchPublisher,
    stats: AnalysisStats,
}

impl VoiceAnalyzer {
    /// Process one capture block of any length.
    ///
    /// Pending tracker commands are applied first, so a change sent between
    /// two blocks affects the window completed by the second.
    pub fn process_block(&mut self, block: &[f32]) -> BlockResult {
        self.apply_pending_commands();
        self.stats.blocks += 1;

        let output = self.buffer.push(block);
        let level = self.meter.record(output.rms);

        let Some(window) = output.window else {
            self.publisher.publish_level(level);
            return BlockResult {
                rms: level,
                estimation: None,
            };
        };

        let estimation = self.tracker.process(window);
        self.stats.windows += 1;
        match estimation.verdict {
            Verdict::Pitched => self.stats.pitched_windows += 1,
            Verdict::NoSignal => self.stats.gated_windows += 1,
            Verdict::NoConfidentPitch => {}
        }
        self.publisher.publish(estimation.estimate, level);

        BlockResult {
            rms: level,
            estimation: Some(estimation),
        }
    }

    fn apply_pending_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: TrackerCommand) {
        match command {
            TrackerCommand::SetAlgorithm(algorithm) => self.tracker.set_algorithm(algorithm),
            TrackerCommand::SetNoiseGate(threshold) => {
                self.tracker.set_noise_gate_threshold(threshold)
            }
            TrackerCommand::SetBias(bias) => self.tracker.set_bias(bias),
            TrackerCommand::SetGateMode(mode) => self.tracker.set_gate_mode(mode),
            TrackerCommand::Reset => {
                self.tracker.reset();
                self.buffer.clear();
                self.meter.reset();
            }
        }
        self.stats.commands_applied += 1;
    }

    pub fn tracker(&self) -> &PitchTracker {
        &self.tracker
    }

    pub fn meter(&self) -> &LevelMeter {
        &self.meter
    }

    pub fn stats(&self) -> AnalysisStats {
        self.stats
    }
}

/// Non-blocking command sender for a [`VoiceAnalyzer`]
pub struct AnalyzerControl {
    commands: Producer<TrackerCommand>,
}

impl AnalyzerControl {
    pub fn send(&mut self, command: TrackerCommand) -> Result<(), AudioError> {
        self.commands
            .push(command)
            .map_err(|PushError::Full(command)| AudioError::CommandQueueFull {
                command: format!("{:?}", command),
            })
    }

    pub fn set_algorithm(&mut self, algorithm: Algorithm) -> Result<(), AudioError> {
        self.send(TrackerCommand::SetAlgorithm(algorithm))
    }

    pub fn set_noise_gate_threshold(&mut self, threshold: f32) -> Result<(), AudioError> {
        self.send(TrackerCommand::SetNoiseGate(threshold))
    }

    pub fn set_bias(&mut self, bias: f32) -> Result<(), AudioError> {
        self.send(TrackerCommand::SetBias(bias))
    }

    pub fn set_gate_mode(&mut self, mode: GateMode) -> Result<(), AudioError> {
        self.send(TrackerCommand::SetGateMode(mode))
    }

    pub fn reset(&mut self) -> Result<(), AudioError> {
        self.send(TrackerCommand::Reset)
    }
}

/// Build an analyzer with its control handle and a monitor of its output
///
/// # Arguments
/// * `config` - Application configuration (pitch and audio sections are used)
/// * `sample_rate` - Actual capture sample rate
///
/// # Errors
/// Returns `InvalidSampleRate` or `InvalidWindowSize` if the estimator cannot
/// be built for this rate and window
pub fn channel(
    config: &AppConfig,
    sample_rate: u32,
) -> Result<(VoiceAnalyzer, AnalyzerControl, PitchMonitor), AudioError> {
    let window_size = config.pitch.window_size;
    let tracker = PitchTracker::new(sample_rate, window_size, config.pitch.estimator_config())?;
    let (producer, consumer) = RingBuffer::new(config.audio.command_queue_capacity.max(1));
    let (publisher, monitor) = published_value();

    let analyzer = VoiceAnalyzer {
        buffer: SignalBuffer::new(window_size),
        meter: LevelMeter::new(),
        tracker,
        commands: consumer,
        publisher,
        stats: AnalysisStats::default(),
    };
    Ok((analyzer, AnalyzerControl { commands: producer }, monitor))
}

/// Spawn the analysis thread draining `channels` into `analyzer`.
///
/// The thread runs while `running` is true, then drains whatever is still
/// queued and exits, handing the analyzer back through the join handle.
///
/// # Arguments
/// * `log_every_n_windows` - Emit a summary log line every N windows (0 disables)
pub fn spawn_analysis_thread(
    mut analyzer: VoiceAnalyzer,
    mut channels: AnalysisChannels,
    running: Arc<AtomicBool>,
    log_every_n_windows: u64,
) -> Result<JoinHandle<VoiceAnalyzer>, AudioError> {
    let handle = thread::Builder::new()
        .name("vocal-analysis".into())
        .spawn(move || {
            log::info!("[Analysis] Thread started");
            let mut last_logged = 0u64;
            loop {
                let block = match channels.data_consumer.pop() {
                    Ok(block) => block,
                    Err(PopError::Empty) => {
                        // Check the running flag only when the queue is empty
                        if !running.load(Ordering::Acquire) {
                            break;
                        }
                        thread::sleep(Duration::from_millis(1));
                        continue;
                    }
                };

                let result = analyzer.process_block(block.as_slice());
                if channels.pool_producer.push(block).is_err() {
                    log::warn!("[Analysis] Pool queue full, dropping block");
                }

                let stats = analyzer.stats();
                if log_every_n_windows > 0
                    && result.estimation.is_some()
                    && stats.windows - last_logged >= log_every_n_windows
                {
                    last_logged = stats.windows;
                    log::info!(
                        "[Analysis] windows={} pitched={} gated={} rms={:.4} estimate={:?}",
                        stats.windows,
                        stats.pitched_windows,
                        stats.gated_windows,
                        result.rms,
                        result.estimation.map(|e| e.estimate)
                    );
                }
            }
            log::info!(
                "[Analysis] Thread stopped after {} blocks",
                analyzer.stats().blocks
            );
            analyzer
        })?;
    Ok(handle)
}

#[cfg(test)]
mod tests;

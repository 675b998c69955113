// Exercise and transport error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Exercise error code constants
///
/// Error code range: 2001-2006
pub struct ExerciseErrorCodes {}

impl ExerciseErrorCodes {
    /// Vocal range minimum is not below its maximum
    pub const INVALID_VOCAL_RANGE: i32 = 2001;

    /// A musical event has a zero, negative or non-finite duration
    pub const INVALID_DURATION: i32 = 2002;

    /// Exercise pattern contains no events
    pub const EMPTY_PATTERN: i32 = 2003;

    /// Tempo is zero, negative or non-finite
    pub const INVALID_TEMPO: i32 = 2004;

    /// Transport command issued while no exercise is loaded
    pub const NOT_RUNNING: i32 = 2005;

    /// Transport driver channel closed
    pub const CHANNEL_CLOSED: i32 = 2006;
}

/// Log an exercise error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_exercise_error(err: &ExerciseError, context: &str) {
    error!(
        "Exercise error in {}: code={}, component=Transport, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Exercise definition and transport errors
///
/// Definition errors are raised before any sequencer state changes, so a
/// rejected definition never leaves a half-started run behind.
///
/// Error code range: 2001-2006
#[derive(Debug, Clone, PartialEq)]
pub enum ExerciseError {
    /// Vocal range is inverted or empty
    InvalidVocalRange { min: i32, max: i32 },

    /// Event at `index` has a duration that is not strictly positive
    InvalidDuration { index: usize, duration_beats: f64 },

    /// Pattern has no events
    EmptyPattern,

    /// Tempo must be positive and finite
    InvalidTempo { bpm: f64 },

    /// No exercise is loaded on the transport
    NotRunning,

    /// Transport driver channel closed
    ChannelClosed { channel: String },
}

impl ErrorCode for ExerciseError {
    fn code(&self) -> i32 {
        match self {
            ExerciseError::InvalidVocalRange { .. } => ExerciseErrorCodes::INVALID_VOCAL_RANGE,
            ExerciseError::InvalidDuration { .. } => ExerciseErrorCodes::INVALID_DURATION,
            ExerciseError::EmptyPattern => ExerciseErrorCodes::EMPTY_PATTERN,
            ExerciseError::InvalidTempo { .. } => ExerciseErrorCodes::INVALID_TEMPO,
            ExerciseError::NotRunning => ExerciseErrorCodes::NOT_RUNNING,
            ExerciseError::ChannelClosed { .. } => ExerciseErrorCodes::CHANNEL_CLOSED,
        }
    }

    fn message(&self) -> String {
        match self {
            ExerciseError::InvalidVocalRange { min, max } => {
                format!(
                    "Vocal range minimum must be below maximum (min={}, max={})",
                    min, max
                )
            }
            ExerciseError::InvalidDuration {
                index,
                duration_beats,
            } => {
                format!(
                    "Event {} must have a positive duration (got {} beats)",
                    index, duration_beats
                )
            }
            ExerciseError::EmptyPattern => "Exercise pattern has no events".to_string(),
            ExerciseError::InvalidTempo { bpm } => {
                format!("BPM must be greater than 0 (got {})", bpm)
            }
            ExerciseError::NotRunning => {
                "No exercise loaded. Call start() first.".to_string()
            }
            ExerciseError::ChannelClosed { channel } => {
                format!("Transport channel closed: {}", channel)
            }
        }
    }
}

impl fmt::Display for ExerciseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExerciseError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ExerciseError {}

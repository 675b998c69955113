// Audio error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Single source of truth for the numeric codes reported by [`AudioError`].
///
/// Error code range: 1001-1007
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Analysis window size is zero or too small for the period range
    pub const INVALID_WINDOW_SIZE: i32 = 1001;

    /// Sample rate is zero
    pub const INVALID_SAMPLE_RATE: i32 = 1002;

    /// Analysis thread is already running
    pub const ALREADY_RUNNING: i32 = 1003;

    /// Analysis thread is not running
    pub const NOT_RUNNING: i32 = 1004;

    /// Tracker command queue is full
    pub const COMMAND_QUEUE_FULL: i32 = 1005;

    /// Audio stream disconnected or channel closed unexpectedly
    pub const STREAM_FAILURE: i32 = 1006;

    /// Analysis thread could not be spawned
    pub const THREAD_SPAWN_FAILED: i32 = 1007;
}

/// Log an audio error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=VoiceAnalyzer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover construction of the analysis pipeline, the analysis
/// thread lifecycle and the command channel into the audio path.
///
/// Error code range: 1001-1007
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Window size cannot hold the minimum period range
    InvalidWindowSize { size: usize, minimum: usize },

    /// Sample rate must be positive
    InvalidSampleRate { sample_rate: u32 },

    /// Analysis thread is already running
    AlreadyRunning,

    /// Analysis thread is not running
    NotRunning,

    /// Command could not be queued for the audio path
    CommandQueueFull { command: String },

    /// Stream channel disconnected unexpectedly
    StreamFailure { reason: String },

    /// Spawning the analysis thread failed
    ThreadSpawnFailed { reason: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::InvalidWindowSize { .. } => AudioErrorCodes::INVALID_WINDOW_SIZE,
            AudioError::InvalidSampleRate { .. } => AudioErrorCodes::INVALID_SAMPLE_RATE,
            AudioError::AlreadyRunning => AudioErrorCodes::ALREADY_RUNNING,
            AudioError::NotRunning => AudioErrorCodes::NOT_RUNNING,
            AudioError::CommandQueueFull { .. } => AudioErrorCodes::COMMAND_QUEUE_FULL,
            AudioError::StreamFailure { .. } => AudioErrorCodes::STREAM_FAILURE,
            AudioError::ThreadSpawnFailed { .. } => AudioErrorCodes::THREAD_SPAWN_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::InvalidWindowSize { size, minimum } => {
                format!(
                    "Analysis window must hold at least {} samples (got {})",
                    minimum, size
                )
            }
            AudioError::InvalidSampleRate { sample_rate } => {
                format!("Sample rate must be greater than 0 (got {})", sample_rate)
            }
            AudioError::AlreadyRunning => {
                "Analysis thread already running. Call stop() first.".to_string()
            }
            AudioError::NotRunning => {
                "Analysis thread not running. Call start() first.".to_string()
            }
            AudioError::CommandQueueFull { command } => {
                format!("Tracker command queue full, dropped {}", command)
            }
            AudioError::StreamFailure { reason } => {
                format!("Audio stream failed: {}", reason)
            }
            AudioError::ThreadSpawnFailed { reason } => {
                format!("Failed to spawn analysis thread: {}", reason)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::ThreadSpawnFailed {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_codes() {
        assert_eq!(
            AudioError::InvalidWindowSize {
                size: 0,
                minimum: 64
            }
            .code(),
            AudioErrorCodes::INVALID_WINDOW_SIZE
        );
        assert_eq!(
            AudioError::InvalidSampleRate { sample_rate: 0 }.code(),
            AudioErrorCodes::INVALID_SAMPLE_RATE
        );
        assert_eq!(
            AudioError::AlreadyRunning.code(),
            AudioErrorCodes::ALREADY_RUNNING
        );
        assert_eq!(AudioError::NotRunning.code(), AudioErrorCodes::NOT_RUNNING);
        assert_eq!(
            AudioError::CommandQueueFull {
                command: "Reset".to_string()
            }
            .code(),
            AudioErrorCodes::COMMAND_QUEUE_FULL
        );
        assert_eq!(
            AudioError::StreamFailure {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::STREAM_FAILURE
        );
        assert_eq!(
            AudioError::ThreadSpawnFailed {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::THREAD_SPAWN_FAILED
        );
    }

    #[test]
    fn test_audio_error_messages() {
        let err = AudioError::InvalidSampleRate { sample_rate: 0 };
        assert_eq!(err.message(), "Sample rate must be greater than 0 (got 0)");

        let err = AudioError::InvalidWindowSize {
            size: 16,
            minimum: 48,
        };
        assert!(err.message().contains("at least 48"));
        assert!(err.message().contains("got 16"));

        let err = AudioError::AlreadyRunning;
        assert!(err.message().contains("already running"));

        let err = AudioError::NotRunning;
        assert!(err.message().contains("not running"));
    }

    #[test]
    fn test_audio_error_display() {
        let err = AudioError::CommandQueueFull {
            command: "SetAlgorithm".to_string(),
        };
        let display = format!("{}", err);
        assert!(display.contains("AudioError"));
        assert!(display.contains(&err.code().to_string()));
        assert!(display.contains("SetAlgorithm"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::other("test io error");
        let audio_err: AudioError = io_err.into();
        match audio_err {
            AudioError::ThreadSpawnFailed { reason } => {
                assert!(reason.contains("test io error"));
            }
            _ => panic!("Expected ThreadSpawnFailed"),
        }
    }
}

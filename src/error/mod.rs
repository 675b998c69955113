// Error types for the vocal trainer core
//
// This module defines custom error types for the audio analysis path and the
// exercise transport, providing structured error handling with stable error codes.

mod audio;
mod exercise;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use exercise::{log_exercise_error, ExerciseError, ExerciseErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// every caller of the core.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

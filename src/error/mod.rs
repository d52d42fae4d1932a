// Error types for the noise tolerance tracking core
//
// This module defines custom error types for tracking runs and the audio
// output collaborator, providing structured error handling with numeric codes
// that host applications can surface without parsing messages.

mod audio;
mod tracking;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use tracking::{log_tracking_error, TrackingError, TrackingErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the host boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

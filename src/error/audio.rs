// Audio output error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio output error code constants
///
/// Error code range: 1001-1004
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Stop requested while playback is not running
    pub const NOT_PLAYING: i32 = 1001;

    /// Requested level is not a finite dB value
    pub const INVALID_LEVEL: i32 = 1002;

    /// The playback backend rejected the command
    pub const OUTPUT_FAILED: i32 = 1003;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1004;
}

/// Log an audio error with structured context
///
/// Audio failures are side effects of a tracking run and never abort it, so
/// callers log them here and carry on.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=AudioOutput, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors reported by the audio output collaborator
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Playback is not running
    NotPlaying,

    /// Level is NaN or infinite
    InvalidLevel { level_db: f64 },

    /// Backend-specific failure
    OutputFailed { reason: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::NotPlaying => AudioErrorCodes::NOT_PLAYING,
            AudioError::InvalidLevel { .. } => AudioErrorCodes::INVALID_LEVEL,
            AudioError::OutputFailed { .. } => AudioErrorCodes::OUTPUT_FAILED,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::NotPlaying => "Audio output is not playing. Call play() first.".to_string(),
            AudioError::InvalidLevel { level_db } => {
                format!("Level must be a finite dB value (got {})", level_db)
            }
            AudioError::OutputFailed { reason } => {
                format!("Audio output failed: {}", reason)
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned for component: {}", component)
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

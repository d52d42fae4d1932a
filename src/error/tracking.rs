// Tracking run error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Tracking error code constants
///
/// Error code range: 3001-3007
pub struct TrackingErrorCodes {}

impl TrackingErrorCodes {
    /// A run is already active
    pub const ALREADY_RUNNING: i32 = 3001;

    /// No run is active
    pub const NOT_RUNNING: i32 = 3002;

    /// The run has already produced its result
    pub const ALREADY_FINISHED: i32 = 3003;

    /// Configuration values are unusable
    pub const INVALID_CONFIG: i32 = 3004;

    /// Sample history cannot be evaluated
    pub const MALFORMED_HISTORY: i32 = 3005;

    /// Shared run/session state lock was poisoned
    pub const STATE_POISONED: i32 = 3006;

    /// Session operation not allowed in the current phase
    pub const INVALID_SESSION_STATE: i32 = 3007;
}

/// Log a tracking error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_tracking_error(err: &TrackingError, context: &str) {
    error!(
        "Tracking error in {}: code={}, component=TrackingRun, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Tracking-related errors
///
/// These cover run lifecycle, configuration validation, metric evaluation and
/// test-session sequencing.
///
/// Error code ranges: 3001-3007
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingError {
    /// A run is already active
    AlreadyRunning,

    /// No run is active
    NotRunning,

    /// The run has already produced its result
    AlreadyFinished,

    /// Configuration values are unusable
    InvalidConfig { reason: String },

    /// Sample history cannot be evaluated
    MalformedHistory { reason: String },

    /// Shared state lock was poisoned
    StatePoisoned,

    /// Session operation not allowed in the current phase
    InvalidSessionState { reason: String },
}

impl ErrorCode for TrackingError {
    fn code(&self) -> i32 {
        match self {
            TrackingError::AlreadyRunning => TrackingErrorCodes::ALREADY_RUNNING,
            TrackingError::NotRunning => TrackingErrorCodes::NOT_RUNNING,
            TrackingError::AlreadyFinished => TrackingErrorCodes::ALREADY_FINISHED,
            TrackingError::InvalidConfig { .. } => TrackingErrorCodes::INVALID_CONFIG,
            TrackingError::MalformedHistory { .. } => TrackingErrorCodes::MALFORMED_HISTORY,
            TrackingError::StatePoisoned => TrackingErrorCodes::STATE_POISONED,
            TrackingError::InvalidSessionState { .. } => {
                TrackingErrorCodes::INVALID_SESSION_STATE
            }
        }
    }

    fn message(&self) -> String {
        match self {
            TrackingError::AlreadyRunning => "Tracking run already in progress".to_string(),
            TrackingError::NotRunning => "No tracking run in progress".to_string(),
            TrackingError::AlreadyFinished => "Tracking run already finished".to_string(),
            TrackingError::InvalidConfig { reason } => {
                format!("Invalid tracking configuration: {}", reason)
            }
            TrackingError::MalformedHistory { reason } => {
                format!("Malformed tracking history: {}", reason)
            }
            TrackingError::StatePoisoned => "Tracking state lock poisoned".to_string(),
            TrackingError::InvalidSessionState { reason } => {
                format!("Invalid session state: {}", reason)
            }
        }
    }
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TrackingError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for TrackingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_error_codes() {
        assert_eq!(
            TrackingError::AlreadyRunning.code(),
            TrackingErrorCodes::ALREADY_RUNNING
        );
        assert_eq!(TrackingError::NotRunning.code(), TrackingErrorCodes::NOT_RUNNING);
        assert_eq!(
            TrackingError::AlreadyFinished.code(),
            TrackingErrorCodes::ALREADY_FINISHED
        );
        assert_eq!(
            TrackingError::InvalidConfig {
                reason: "test".to_string()
            }
            .code(),
            TrackingErrorCodes::INVALID_CONFIG
        );
        assert_eq!(
            TrackingError::MalformedHistory {
                reason: "test".to_string()
            }
            .code(),
            TrackingErrorCodes::MALFORMED_HISTORY
        );
        assert_eq!(
            TrackingError::StatePoisoned.code(),
            TrackingErrorCodes::STATE_POISONED
        );
        assert_eq!(
            TrackingError::InvalidSessionState {
                reason: "test".to_string()
            }
            .code(),
            TrackingErrorCodes::INVALID_SESSION_STATE
        );
    }

    #[test]
    fn test_tracking_error_messages() {
        let err = TrackingError::InvalidConfig {
            reason: "warm_rate must be positive".to_string(),
        };
        assert_eq!(
            err.message(),
            "Invalid tracking configuration: warm_rate must be positive"
        );

        let err = TrackingError::MalformedHistory {
            reason: "empty".to_string(),
        };
        assert_eq!(err.message(), "Malformed tracking history: empty");

        let err = TrackingError::AlreadyRunning;
        assert!(err.message().contains("already in progress"));

        let err = TrackingError::StatePoisoned;
        assert!(err.message().contains("poisoned"));
    }

    #[test]
    fn test_tracking_error_display() {
        let err = TrackingError::NotRunning;
        let display = format!("{}", err);
        assert!(display.contains("TrackingError"));
        assert!(display.contains(&err.code().to_string()));
    }
}

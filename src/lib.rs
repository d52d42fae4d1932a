// HANT Tracker Core - adaptive noise tracking for the Acceptable Noise Level test
// Real-time tracking loop, run scoring and Test A / Test B comparison

// Module declarations
pub mod audio;
pub mod comparison;
pub mod config;
pub mod engine;
pub mod error;
pub mod managers;
pub mod metrics;
pub mod telemetry;
pub mod tracking;

// Re-exports for convenience
pub use comparison::{compare_runs, compare_scores, SignificanceReport};
pub use config::{AppConfig, AudioConfig, TrackingConfig};
pub use error::{AudioError, TrackingError};
pub use metrics::{RunResult, StopReason};
pub use tracking::{TickOutcome, TrackingRun, TrackingSample};

/// Install the `tracing` fmt subscriber, which also forwards `log` records.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .try_init();
}

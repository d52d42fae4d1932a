//! Diagnostic event types published while runs are tracked.

use serde::{Deserialize, Serialize};

use crate::metrics::StopReason;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    Reversal {
        count: u32,
        level: f64,
        t: f64,
    },
    /// Rolling swing between consecutive reversal levels
    ReversalSwing {
        avg_db: f64,
        max_db: f64,
        sample_count: usize,
    },
    ReversalDebounced {
        since_last_ms: u64,
    },
    RateChanged {
        rate: f64,
        reversal_count: u32,
    },
    ForcedRelease {
        timestamp_ms: u64,
    },
    RunFinished {
        stop_reason: StopReason,
        score: f64,
    },
    MetricsDegraded {
        error: String,
    },
}

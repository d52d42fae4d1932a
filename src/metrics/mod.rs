// Metrics - scoring and qualitative assessment of finished runs

pub mod classification;
pub mod engine;
pub mod result;
pub mod stats;

pub use classification::{HearingAidPrognosis, StabilityClass, StabilizationSpeed};
pub use engine::MetricsEngine;
pub use result::{
    RunMeta, RunResult, RunScore, RunValidity, StabilityAssessment, StopReason,
};
pub use stats::ReversalStats;

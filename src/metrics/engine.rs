//! Metrics engine - derives the final result from a frozen run.
//!
//! Runs exactly once per run, after the finish latch has been taken. All
//! estimators read the same history; none of them mutate it.

use log::{info, warn};

use crate::config::TrackingConfig;
use crate::error::{log_tracking_error, TrackingError};
use crate::metrics::classification::{is_possible_guessing, StabilityClass};
use crate::metrics::result::{
    RunMeta, RunResult, RunScore, RunValidity, StabilityAssessment, StopReason,
};
use crate::metrics::stats::{self, ReversalStats};
use crate::telemetry;
use crate::tracking::TrackingSample;

/// Reversal index (1-based) whose time marks stabilization
const STABILIZATION_REVERSAL: usize = 3;

#[derive(Debug, Clone)]
pub struct MetricsEngine {
    stabilization_cutoff_seconds: f64,
    trend_window_seconds: f64,
    discarded_reversals: usize,
    min_valid_reversals: usize,
}

impl MetricsEngine {
    pub fn from_config(config: &TrackingConfig) -> Self {
        Self {
            stabilization_cutoff_seconds: config.stabilization_cutoff_seconds,
            trend_window_seconds: config.trend_window_seconds,
            discarded_reversals: config.discarded_reversals,
            min_valid_reversals: config.min_valid_reversals,
        }
    }

    /// Build the result for a finished run
    ///
    /// # Arguments
    /// * `history` - Complete sample history
    /// * `reversal_levels` - Levels captured at confirmed reversals
    /// * `speech_level` - Speech presentation level
    /// * `stop_reason` - Why the run ended
    ///
    /// # Returns
    /// * `Ok(RunResult)` - All metrics computed (some may be unavailable)
    /// * `Err(TrackingError::MalformedHistory)` - History cannot be scored
    pub fn evaluate(
        &self,
        history: &[TrackingSample],
        reversal_levels: &[f64],
        speech_level: f64,
        stop_reason: StopReason,
    ) -> Result<RunResult, TrackingError> {
        validate_history(history)?;
        if !speech_level.is_finite() {
            return Err(TrackingError::MalformedHistory {
                reason: format!("speech level {} is not finite", speech_level),
            });
        }
        let Some(last) = history.last() else {
            return Err(TrackingError::MalformedHistory {
                reason: "history is empty".to_string(),
            });
        };
        let duration_seconds = last.t;

        let post_cutoff: Vec<f64> = history
            .iter()
            .filter(|s| s.t > self.stabilization_cutoff_seconds)
            .map(|s| s.level)
            .collect();
        let scored_extrema = extrema(history, Some(self.stabilization_cutoff_seconds));
        let extrema_levels = stats::levels(&scored_extrema);

        let instantaneous_level = stats::mean(&extrema_levels)
            .or_else(|| stats::mean(&post_cutoff))
            .unwrap_or(last.level);
        let averaged_score = stats::mean(&post_cutoff).map(|level| level - speech_level);

        let reversal_stats = ReversalStats::from_reversals(
            reversal_levels,
            self.discarded_reversals,
            self.min_valid_reversals,
        );
        let average_excursion_height = excursion_height(&extrema_levels);

        let window = stats::trailing_window(history, self.trend_window_seconds);
        let window_std_dev = stats::population_std_dev(&stats::levels(window));
        let classification =
            StabilityClass::classify(window_std_dev, duration_seconds, self.trend_window_seconds);
        let stability = StabilityAssessment {
            classification,
            std_dev: if classification == StabilityClass::InsufficientData {
                None
            } else {
                window_std_dev
            },
            possible_guessing: is_possible_guessing(average_excursion_height),
        };

        let stabilization_seconds = extrema(history, None)
            .get(STABILIZATION_REVERSAL - 1)
            .map(|s| s.t);

        let result = RunResult {
            score: RunScore {
                instantaneous: instantaneous_level - speech_level,
                instantaneous_level,
            },
            validity: RunValidity {
                averaged_score,
                standard_error: reversal_stats.map(|r| r.standard_error),
                confidence_interval_95: reversal_stats.map(|r| r.confidence_interval_95),
                stability,
                average_excursion_height,
            },
            meta: RunMeta {
                speech_level,
                reversal_count: reversal_levels.len() as u32,
                duration_seconds,
                stabilization_seconds,
            },
            stop_reason,
            error: None,
            history: history.to_vec(),
        };

        info!(
            "[MetricsEngine] Run scored: {:.2} dB ({:?}, {} reversals, {:.1}s, {})",
            result.score.instantaneous,
            stop_reason,
            result.meta.reversal_count,
            duration_seconds,
            result.stability_label()
        );

        Ok(result)
    }

    /// Build the result, degrading instead of failing
    ///
    /// # Arguments
    /// * `history` - Complete sample history
    /// * `reversal_levels` - Levels captured at confirmed reversals
    /// * `speech_level` - Speech presentation level
    /// * `final_level` - Tracked level at finish, scored if metrics fail
    /// * `stop_reason` - Why the run ended
    pub fn finalize(
        &self,
        history: Vec<TrackingSample>,
        reversal_levels: &[f64],
        speech_level: f64,
        final_level: f64,
        stop_reason: StopReason,
    ) -> RunResult {
        match self.evaluate(&history, reversal_levels, speech_level, stop_reason) {
            Ok(result) => result,
            Err(err) => {
                log_tracking_error(&err, "metrics finalize");
                warn!(
                    "[MetricsEngine] Degraded result after {:?}; scoring final level {:.2}",
                    stop_reason, final_level
                );
                telemetry::hub().record_metrics_degraded(err.to_string());
                RunResult::degraded(
                    history,
                    reversal_levels.len() as u32,
                    speech_level,
                    final_level,
                    err.to_string(),
                )
            }
        }
    }
}

fn validate_history(history: &[TrackingSample]) -> Result<(), TrackingError> {
    if history.is_empty() {
        return Err(TrackingError::MalformedHistory {
            reason: "history is empty".to_string(),
        });
    }
    if let Some((index, sample)) = history
        .iter()
        .enumerate()
        .find(|(_, s)| !s.t.is_finite() || !s.level.is_finite())
    {
        return Err(TrackingError::MalformedHistory {
            reason: format!(
                "sample {} is not finite (t={}, level={})",
                index, sample.t, sample.level
            ),
        });
    }
    if let Some(index) = history.windows(2).position(|pair| pair[1].t < pair[0].t) {
        return Err(TrackingError::MalformedHistory {
            reason: format!("time decreases after sample {}", index),
        });
    }
    Ok(())
}

/// Strict local maxima and minima of the trace
///
/// Neighbours come from the full history; only candidates with `t > cutoff`
/// are kept when a cutoff is given.
pub fn extrema(history: &[TrackingSample], cutoff: Option<f64>) -> Vec<TrackingSample> {
    history
        .windows(3)
        .filter_map(|w| {
            let (prev, curr, next) = (w[0].level, w[1], w[2].level);
            let is_peak = curr.level > prev && curr.level > next;
            let is_valley = curr.level < prev && curr.level < next;
            let after_cutoff = cutoff.map_or(true, |c| curr.t > c);
            ((is_peak || is_valley) && after_cutoff).then_some(curr)
        })
        .collect()
}

/// Mean absolute swing between consecutive extrema
fn excursion_height(extrema_levels: &[f64]) -> Option<f64> {
    let swings: Vec<f64> = extrema_levels
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .collect();
    stats::mean(&swings)
}

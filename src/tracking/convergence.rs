// Convergence monitor - stopping rules evaluated after every sample
//
// Two rules, checked in this order every tick:
// 1. Hard timeout.
// 2. Stability: enough time, enough reversals, a tight confidence interval on
//    the post-warm-up reversal levels, and a flat trend over the trailing
//    window. Both precision and flatness are required together.

use serde::{Deserialize, Serialize};

use crate::config::TrackingConfig;
use crate::metrics::stats::{self, ReversalStats};
use crate::metrics::StopReason;
use crate::tracking::state::{RunState, TrackingSample};

/// Statistics computed while evaluating the stability rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSnapshot {
    pub reversals: ReversalStats,
    /// Least-squares slope over the trailing window (dB/second)
    pub slope: f64,
    /// Population standard deviation over the trailing window
    pub window_std_dev: f64,
    pub window_points: usize,
}

impl TrendSnapshot {
    fn is_stable(&self, ci95_threshold: f64, slope_threshold: f64) -> bool {
        self.reversals.confidence_interval_95 <= ci95_threshold
            && self.slope.abs() <= slope_threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConvergenceCheck {
    /// Keep tracking; carries the trend stats when they could be computed
    Continue(Option<TrendSnapshot>),
    Stop {
        reason: StopReason,
        trend: Option<TrendSnapshot>,
    },
}

#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    hard_timeout_seconds: f64,
    min_duration_seconds: f64,
    min_reversals_for_stop: u32,
    discarded_reversals: usize,
    min_valid_reversals: usize,
    trend_window_seconds: f64,
    min_trend_points: usize,
    ci95_stop_threshold: f64,
    slope_stop_threshold: f64,
}

impl ConvergenceMonitor {
    pub fn from_config(config: &TrackingConfig) -> Self {
        Self {
            hard_timeout_seconds: config.hard_timeout_seconds,
            min_duration_seconds: config.min_duration_seconds,
            min_reversals_for_stop: config.min_reversals_for_stop,
            discarded_reversals: config.discarded_reversals,
            min_valid_reversals: config.min_valid_reversals,
            trend_window_seconds: config.trend_window_seconds,
            min_trend_points: config.min_trend_points,
            ci95_stop_threshold: config.ci95_stop_threshold,
            slope_stop_threshold: config.slope_stop_threshold,
        }
    }

    /// Decide whether the run should terminate
    ///
    /// # Arguments
    /// * `state` - Current run state (reversal levels)
    /// * `history` - Full sample history including the sample just appended
    /// * `elapsed` - Seconds since run start
    pub fn evaluate(
        &self,
        state: &RunState,
        history: &[TrackingSample],
        elapsed: f64,
    ) -> ConvergenceCheck {
        if elapsed >= self.hard_timeout_seconds {
            return ConvergenceCheck::Stop {
                reason: StopReason::Timeout,
                trend: self.trend(state, history),
            };
        }

        if elapsed < self.min_duration_seconds
            || state.reversal_count() < self.min_reversals_for_stop
        {
            return ConvergenceCheck::Continue(None);
        }

        match self.trend(state, history) {
            Some(trend) if trend.is_stable(self.ci95_stop_threshold, self.slope_stop_threshold) => {
                ConvergenceCheck::Stop {
                    reason: StopReason::StableCriteriaMet,
                    trend: Some(trend),
                }
            }
            trend => ConvergenceCheck::Continue(trend),
        }
    }

    /// Reversal precision plus trailing-window trend, when both are computable
    pub fn trend(&self, state: &RunState, history: &[TrackingSample]) -> Option<TrendSnapshot> {
        let reversals = ReversalStats::from_reversals(
            state.reversal_levels(),
            self.discarded_reversals,
            self.min_valid_reversals,
        )?;

        let window = stats::trailing_window(history, self.trend_window_seconds);
        if window.len() <= self.min_trend_points {
            return None;
        }
        let slope = stats::linear_regression_slope(window)?;
        let window_std_dev = stats::population_std_dev(&stats::levels(window))?;

        Some(TrendSnapshot {
            reversals,
            slope,
            window_std_dev,
            window_points: window.len(),
        })
    }
}

//! Descriptive statistics over tracked levels.
//!
//! Sample standard deviation (n-1) is used for reversal levels, which are a
//! small sample of the listener's criterion. Population standard deviation is
//! used for the trailing window, which describes the tracked trace itself.

use serde::{Deserialize, Serialize};

use crate::tracking::TrackingSample;

/// z-score for a two-sided 95% interval
pub const Z_95: f64 = 1.96;
/// z-score for a two-sided 80% interval
pub const Z_80: f64 = 1.28;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Standard deviation with Bessel's correction; needs two values
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((sum_sq / values.len() as f64).sqrt())
}

/// Closed-form least-squares slope of level against time (dB/second)
///
/// `None` with fewer than two points or when every point shares one timestamp.
pub fn linear_regression_slope(samples: &[TrackingSample]) -> Option<f64> {
    if samples.len() < 2 {
        return None;
    }
    let n = samples.len() as f64;
    let (sum_x, sum_y, sum_xy, sum_xx) =
        samples
            .iter()
            .fold((0.0, 0.0, 0.0, 0.0), |(sx, sy, sxy, sxx), s| {
                (sx + s.t, sy + s.level, sxy + s.t * s.level, sxx + s.t * s.t)
            });

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON {
        return None;
    }
    Some((n * sum_xy - sum_x * sum_y) / denominator)
}

/// Trailing slice of `history` covering the last `window_seconds`
///
/// Includes every sample with `t >= last.t - window_seconds`. History must be
/// ordered by time.
pub fn trailing_window(history: &[TrackingSample], window_seconds: f64) -> &[TrackingSample] {
    let Some(last) = history.last() else {
        return history;
    };
    let start_t = last.t - window_seconds;
    let start = history.partition_point(|s| s.t < start_t);
    &history[start..]
}

pub fn levels(samples: &[TrackingSample]) -> Vec<f64> {
    samples.iter().map(|s| s.level).collect()
}

/// Precision of the reversal-based estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReversalStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub standard_error: f64,
    pub confidence_interval_95: f64,
}

impl ReversalStats {
    /// Stats over all reversal levels after dropping warm-up reversals
    ///
    /// # Arguments
    /// * `reversal_levels` - Levels in occurrence order
    /// * `discard` - Leading reversals to drop
    /// * `min_valid` - Remaining reversals required
    ///
    /// # Returns
    /// `None` when fewer than `min_valid` reversals remain
    pub fn from_reversals(reversal_levels: &[f64], discard: usize, min_valid: usize) -> Option<Self> {
        let valid = reversal_levels.get(discard..)?;
        if valid.len() < min_valid.max(2) {
            return None;
        }
        Self::from_valid(valid)
    }

    /// Stats over levels already filtered to the valid reversals
    pub fn from_valid(valid: &[f64]) -> Option<Self> {
        let mean = mean(valid)?;
        let std_dev = sample_std_dev(valid)?;
        let standard_error = std_dev / (valid.len() as f64).sqrt();
        Some(Self {
            count: valid.len(),
            mean,
            std_dev,
            standard_error,
            confidence_interval_95: Z_95 * standard_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REVERSAL_FIXTURE: [f64; 6] = [30.0, 40.0, 20.0, 35.0, 25.0, 38.0];

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mean_and_std_dev() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
        assert_eq!(sample_std_dev(&[1.0]), None);
        assert!(approx(sample_std_dev(&[2.0, 4.0]).unwrap(), 2f64.sqrt()));
        assert_eq!(population_std_dev(&[2.0, 4.0]), Some(1.0));
        assert_eq!(population_std_dev(&[]), None);
    }

    #[test]
    fn test_fixture_with_six_reversals_is_insufficient() {
        assert_eq!(ReversalStats::from_reversals(&REVERSAL_FIXTURE, 3, 4), None);
    }

    #[test]
    fn test_fixture_valid_reversal_arithmetic() {
        let stats = ReversalStats::from_valid(&REVERSAL_FIXTURE[3..]).unwrap();
        assert_eq!(stats.count, 3);
        assert!(approx(stats.mean, 98.0 / 3.0));
        assert!((stats.std_dev - 6.806859285554).abs() < 1e-9);
        assert!((stats.standard_error - 3.929942040851).abs() < 1e-9);
        assert!((stats.confidence_interval_95 - 7.702686400067).abs() < 1e-9);
    }

    #[test]
    fn test_fixture_with_seventh_reversal() {
        let mut levels = REVERSAL_FIXTURE.to_vec();
        levels.push(33.0);
        let stats = ReversalStats::from_reversals(&levels, 3, 4).unwrap();
        assert_eq!(stats.count, 4);
        assert!(approx(stats.mean, 32.75));
        assert!((stats.std_dev - 5.560275772537).abs() < 1e-9);
        assert!((stats.standard_error - 2.780137886269).abs() < 1e-9);
        assert!((stats.confidence_interval_95 - 5.449070257087).abs() < 1e-9);
    }

    #[test]
    fn test_from_reversals_shorter_than_discard() {
        assert_eq!(ReversalStats::from_reversals(&[1.0, 2.0], 3, 4), None);
    }

    #[test]
    fn test_slope_of_linear_ramp() {
        let ramp: Vec<TrackingSample> = (0..20)
            .map(|i| TrackingSample::new(i as f64 * 0.5, 40.0 + 0.25 * i as f64))
            .collect();
        assert!(approx(linear_regression_slope(&ramp).unwrap(), 0.5));

        let flat: Vec<TrackingSample> =
            (0..5).map(|i| TrackingSample::new(i as f64, 60.0)).collect();
        assert!(approx(linear_regression_slope(&flat).unwrap(), 0.0));
    }

    #[test]
    fn test_slope_degenerate_inputs() {
        assert_eq!(linear_regression_slope(&[TrackingSample::new(1.0, 2.0)]), None);
        let same_t = [TrackingSample::new(1.0, 2.0), TrackingSample::new(1.0, 4.0)];
        assert_eq!(linear_regression_slope(&same_t), None);
    }

    #[test]
    fn test_trailing_window_is_inclusive() {
        let history: Vec<TrackingSample> = (0..=40)
            .map(|i| TrackingSample::new(i as f64, i as f64))
            .collect();
        let window = trailing_window(&history, 30.0);
        assert_eq!(window.first().unwrap().t, 10.0);
        assert_eq!(window.len(), 31);

        assert!(trailing_window(&[], 30.0).is_empty());
    }
}

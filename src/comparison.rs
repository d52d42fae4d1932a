//! Cross-run significance comparison (Test A vs Test B).
//!
//! The difference between two scores is judged against the combined standard
//! error of both runs. A run without a usable standard error cannot be
//! compared; the report says so instead of treating the error as zero.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::metrics::stats::{Z_80, Z_95};
use crate::metrics::RunResult;

pub const INSUFFICIENT_DATA_MESSAGE: &str =
    "Cannot calculate significance (Missing Statistical Data).";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceStatus {
    /// Difference exceeds the 95% critical difference
    Strong,
    /// Difference exceeds the 80% critical difference only
    Moderate,
    NotSignificant,
}

impl SignificanceStatus {
    pub fn confidence_level(&self) -> Option<u8> {
        match self {
            SignificanceStatus::Strong => Some(95),
            SignificanceStatus::Moderate => Some(80),
            SignificanceStatus::NotSignificant => None,
        }
    }
}

/// Sign of B - A; a higher score tolerates more noise, so up is better
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Improvement,
    Decline,
    NoChange,
}

impl Direction {
    fn from_raw_diff(raw_diff: f64) -> Self {
        if raw_diff > 0.0 {
            Direction::Improvement
        } else if raw_diff < 0.0 {
            Direction::Decline
        } else {
            Direction::NoChange
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            Direction::Improvement => "Improvement",
            Direction::Decline => "Decline",
            Direction::NoChange => "No Change",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignificanceAssessment {
    pub status: SignificanceStatus,
    pub direction: Direction,
    pub combined_error: f64,
    pub critical_diff_95: f64,
    pub critical_diff_80: f64,
    /// |B - A|
    pub diff: f64,
    /// B - A
    pub raw_diff: f64,
}

impl SignificanceAssessment {
    pub fn message(&self) -> String {
        match self.status {
            SignificanceStatus::Strong => {
                format!("Definite {} (95% CI)", self.direction.display_name())
            }
            SignificanceStatus::Moderate => {
                format!("Likely {} (80% CI)", self.direction.display_name())
            }
            SignificanceStatus::NotSignificant => "No Significant Difference".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignificanceReport {
    InsufficientData,
    Assessed(SignificanceAssessment),
}

impl SignificanceReport {
    pub fn message(&self) -> String {
        match self {
            SignificanceReport::InsufficientData => INSUFFICIENT_DATA_MESSAGE.to_string(),
            SignificanceReport::Assessed(assessment) => assessment.message(),
        }
    }

    pub fn assessment(&self) -> Option<&SignificanceAssessment> {
        match self {
            SignificanceReport::InsufficientData => None,
            SignificanceReport::Assessed(assessment) => Some(assessment),
        }
    }
}

/// Compare two finished runs by their instantaneous scores
pub fn compare_runs(a: &RunResult, b: &RunResult) -> SignificanceReport {
    compare_scores(
        a.score.instantaneous,
        a.usable_standard_error(),
        b.score.instantaneous,
        b.usable_standard_error(),
    )
}

/// Compare two scores given their standard errors
///
/// # Arguments
/// * `score_a`, `se_a` - Test A score and standard error
/// * `score_b`, `se_b` - Test B score and standard error
///
/// # Returns
/// `InsufficientData` when either standard error is missing, non-positive or
/// not finite, or when a score is not finite
pub fn compare_scores(
    score_a: f64,
    se_a: Option<f64>,
    score_b: f64,
    se_b: Option<f64>,
) -> SignificanceReport {
    let usable = |se: Option<f64>| se.filter(|v| v.is_finite() && *v > 0.0);
    let (Some(se_a), Some(se_b)) = (usable(se_a), usable(se_b)) else {
        debug!("[Comparison] Missing standard error (A: {:?}, B: {:?})", se_a, se_b);
        return SignificanceReport::InsufficientData;
    };
    if !score_a.is_finite() || !score_b.is_finite() {
        debug!("[Comparison] Non-finite score (A: {}, B: {})", score_a, score_b);
        return SignificanceReport::InsufficientData;
    }

    let combined_error = (se_a.powi(2) + se_b.powi(2)).sqrt();
    let critical_diff_95 = Z_95 * combined_error;
    let critical_diff_80 = Z_80 * combined_error;
    let raw_diff = score_b - score_a;
    let diff = raw_diff.abs();

    let status = if diff > critical_diff_95 {
        SignificanceStatus::Strong
    } else if diff > critical_diff_80 {
        SignificanceStatus::Moderate
    } else {
        SignificanceStatus::NotSignificant
    };

    SignificanceReport::Assessed(SignificanceAssessment {
        status,
        direction: Direction::from_raw_diff(raw_diff),
        combined_error,
        critical_diff_95,
        critical_diff_80,
        diff,
        raw_diff,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn test_strong_improvement_example() {
        let report = compare_scores(5.0, Some(1.0), 9.0, Some(1.0));
        let assessment = report.assessment().unwrap();

        assert!(approx(assessment.combined_error, 1.414, 1e-3));
        assert!(approx(assessment.critical_diff_95, 2.772, 1e-3));
        assert!(approx(assessment.critical_diff_80, 1.810, 1e-3));
        assert_eq!(assessment.diff, 4.0);
        assert_eq!(assessment.raw_diff, 4.0);
        assert_eq!(assessment.status, SignificanceStatus::Strong);
        assert_eq!(assessment.status.confidence_level(), Some(95));
        assert_eq!(assessment.direction, Direction::Improvement);
        assert_eq!(report.message(), "Definite Improvement (95% CI)");
    }

    #[test]
    fn test_moderate_decline() {
        // crit80 = 1.81, crit95 = 2.77
        let report = compare_scores(5.0, Some(1.0), 3.0, Some(1.0));
        let assessment = report.assessment().unwrap();

        assert_eq!(assessment.status, SignificanceStatus::Moderate);
        assert_eq!(assessment.direction, Direction::Decline);
        assert_eq!(assessment.raw_diff, -2.0);
        assert_eq!(report.message(), "Likely Decline (80% CI)");
    }

    #[test]
    fn test_small_difference_is_not_significant() {
        let report = compare_scores(5.0, Some(1.0), 6.0, Some(1.0));
        assert_eq!(
            report.assessment().unwrap().status,
            SignificanceStatus::NotSignificant
        );
        assert_eq!(report.message(), "No Significant Difference");
    }

    #[test]
    fn test_zero_standard_error_is_insufficient() {
        assert_eq!(
            compare_scores(5.0, Some(0.0), 9.0, Some(1.0)),
            SignificanceReport::InsufficientData
        );
        assert_eq!(
            compare_scores(5.0, Some(1.0), 40.0, None),
            SignificanceReport::InsufficientData
        );
        assert_eq!(
            compare_scores(5.0, Some(f64::INFINITY), 9.0, Some(1.0)),
            SignificanceReport::InsufficientData
        );
        assert_eq!(
            compare_scores(5.0, Some(1.0), 9.0, Some(-1.0)).message(),
            INSUFFICIENT_DATA_MESSAGE
        );
    }

    #[test]
    fn test_manual_run_cannot_be_compared() {
        let manual = RunResult::from_manual_levels(70.0, 65.0);
        let mut tracked = RunResult::from_manual_levels(70.0, 55.0);
        tracked.validity.standard_error = Some(0.8);

        assert_eq!(
            compare_runs(&manual, &tracked),
            SignificanceReport::InsufficientData
        );
        assert_eq!(
            compare_runs(&tracked, &manual),
            SignificanceReport::InsufficientData
        );
    }

    #[test]
    fn test_compare_runs_uses_instantaneous_scores() {
        let mut a = RunResult::from_manual_levels(75.0, 60.0);
        a.validity.standard_error = Some(1.0);
        let mut b = RunResult::from_manual_levels(75.0, 66.0);
        b.validity.standard_error = Some(1.0);

        let report = compare_runs(&a, &b);
        let assessment = report.assessment().unwrap();
        assert_eq!(assessment.raw_diff, 6.0);
        assert_eq!(assessment.status, SignificanceStatus::Strong);
    }
}

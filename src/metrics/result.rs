// Run result - the immutable terminal record of one tracking run
//
// Serialized as camelCase JSON for the reporting layer. Values that could not
// be computed are `None` (JSON null), never zero.

use serde::{Deserialize, Serialize};

use crate::metrics::classification::{
    stability_label, HearingAidPrognosis, StabilityClass, StabilizationSpeed,
};
use crate::tracking::TrackingSample;

/// Why a run terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Timeout,
    StableCriteriaMet,
    ManualStop,
    /// Levels entered by hand rather than tracked
    ManualEntry,
    /// Metrics could not be computed; the result is degraded
    MetricsError,
}

impl StopReason {
    pub fn display_name(&self) -> &'static str {
        match self {
            StopReason::Timeout => "Timeout",
            StopReason::StableCriteriaMet => "Stable criteria met",
            StopReason::ManualStop => "Stopped by operator",
            StopReason::ManualEntry => "Manual entry",
            StopReason::MetricsError => "Metrics error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunScore {
    /// Noise level minus speech level (dB, signed)
    pub instantaneous: f64,
    /// Noise level the score was derived from
    pub instantaneous_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityAssessment {
    pub classification: StabilityClass,
    pub std_dev: Option<f64>,
    pub possible_guessing: bool,
}

impl StabilityAssessment {
    pub fn insufficient() -> Self {
        Self {
            classification: StabilityClass::InsufficientData,
            std_dev: None,
            possible_guessing: false,
        }
    }

    pub fn label(&self) -> String {
        stability_label(self.classification, self.possible_guessing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunValidity {
    pub averaged_score: Option<f64>,
    pub standard_error: Option<f64>,
    pub confidence_interval_95: Option<f64>,
    pub stability: StabilityAssessment,
    pub average_excursion_height: Option<f64>,
}

impl RunValidity {
    pub fn unavailable() -> Self {
        Self {
            averaged_score: None,
            standard_error: None,
            confidence_interval_95: None,
            stability: StabilityAssessment::insufficient(),
            average_excursion_height: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMeta {
    pub speech_level: f64,
    pub reversal_count: u32,
    pub duration_seconds: f64,
    pub stabilization_seconds: Option<f64>,
}

impl RunMeta {
    pub fn stabilization_speed(&self) -> Option<StabilizationSpeed> {
        self.stabilization_seconds.map(StabilizationSpeed::from_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub score: RunScore,
    pub validity: RunValidity,
    pub meta: RunMeta,
    pub stop_reason: StopReason,
    /// Set only on degraded results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub history: Vec<TrackingSample>,
}

impl RunResult {
    /// Result built when metrics failed; scored from the last tracked level
    ///
    /// # Arguments
    /// * `history` - Whatever history was accumulated
    /// * `reversal_count` - Confirmed reversals at finish
    /// * `speech_level` - Speech presentation level
    /// * `final_level` - Tracked noise level at finish
    /// * `error` - Description of the failure
    pub fn degraded(
        history: Vec<TrackingSample>,
        reversal_count: u32,
        speech_level: f64,
        final_level: f64,
        error: String,
    ) -> Self {
        let duration_seconds = history
            .last()
            .map(|sample| sample.t)
            .filter(|t| t.is_finite())
            .unwrap_or(0.0);

        Self {
            score: RunScore {
                instantaneous: final_level - speech_level,
                instantaneous_level: final_level,
            },
            validity: RunValidity::unavailable(),
            meta: RunMeta {
                speech_level,
                reversal_count,
                duration_seconds,
                stabilization_seconds: None,
            },
            stop_reason: StopReason::MetricsError,
            error: Some(error),
            history,
        }
    }

    /// Result for levels measured by hand
    ///
    /// # Arguments
    /// * `most_comfortable_level` - Speech level the listener chose (MCL)
    /// * `background_noise_level` - Highest noise accepted (BNL)
    pub fn from_manual_levels(most_comfortable_level: f64, background_noise_level: f64) -> Self {
        Self {
            score: RunScore {
                instantaneous: background_noise_level - most_comfortable_level,
                instantaneous_level: background_noise_level,
            },
            validity: RunValidity::unavailable(),
            meta: RunMeta {
                speech_level: most_comfortable_level,
                reversal_count: 0,
                duration_seconds: 0.0,
                stabilization_seconds: None,
            },
            stop_reason: StopReason::ManualEntry,
            error: None,
            history: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// Standard error when it can support a comparison
    pub fn usable_standard_error(&self) -> Option<f64> {
        self.validity
            .standard_error
            .filter(|se| se.is_finite() && *se > 0.0)
    }

    /// Acceptable noise level (speech minus noise), the negated score
    pub fn anl(&self) -> f64 {
        -self.score.instantaneous
    }

    pub fn prognosis(&self) -> HearingAidPrognosis {
        HearingAidPrognosis::from_anl(self.anl())
    }

    pub fn stability_label(&self) -> String {
        self.validity.stability.label()
    }
}

//! Qualitative labels derived from run metrics.

use serde::{Deserialize, Serialize};

/// Trailing-window SD at or below this is "High" stability (dB)
pub const HIGH_STABILITY_MAX_SD: f64 = 2.0;
/// Trailing-window SD at or below this is "Moderate" stability (dB)
pub const MODERATE_STABILITY_MAX_SD: f64 = 4.0;
/// Average excursion above this suggests the listener is not converging (dB)
pub const GUESSING_EXCURSION_DB: f64 = 5.0;

/// Tracking stability over the trailing window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityClass {
    High,
    Moderate,
    Low,
    InsufficientData,
}

impl StabilityClass {
    /// Classify a trailing-window standard deviation
    ///
    /// # Arguments
    /// * `std_dev` - Window SD, `None` when it could not be computed
    /// * `duration_seconds` - Total run duration
    /// * `min_duration_seconds` - Runs shorter than this cannot be classified
    pub fn classify(std_dev: Option<f64>, duration_seconds: f64, min_duration_seconds: f64) -> Self {
        if duration_seconds < min_duration_seconds {
            return StabilityClass::InsufficientData;
        }
        match std_dev {
            Some(sd) if sd <= HIGH_STABILITY_MAX_SD => StabilityClass::High,
            Some(sd) if sd <= MODERATE_STABILITY_MAX_SD => StabilityClass::Moderate,
            Some(_) => StabilityClass::Low,
            None => StabilityClass::InsufficientData,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StabilityClass::High => "High Stability",
            StabilityClass::Moderate => "Moderate Stability",
            StabilityClass::Low => "Low Stability",
            StabilityClass::InsufficientData => "Insufficient Data",
        }
    }
}

pub fn is_possible_guessing(average_excursion_height: Option<f64>) -> bool {
    average_excursion_height.is_some_and(|height| height > GUESSING_EXCURSION_DB)
}

/// Stability label with the guessing qualifier appended when flagged
pub fn stability_label(class: StabilityClass, possible_guessing: bool) -> String {
    if possible_guessing {
        format!("{} (Possible Guessing)", class.display_name())
    } else {
        class.display_name().to_string()
    }
}

/// How quickly the listener settled, from the time of the third reversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilizationSpeed {
    SuspiciouslyFast,
    HighCertainty,
    Normal,
    Delayed,
}

impl StabilizationSpeed {
    pub fn from_seconds(seconds: f64) -> Self {
        if seconds < 10.0 {
            StabilizationSpeed::SuspiciouslyFast
        } else if seconds < 30.0 {
            StabilizationSpeed::HighCertainty
        } else if seconds <= 60.0 {
            StabilizationSpeed::Normal
        } else {
            StabilizationSpeed::Delayed
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StabilizationSpeed::SuspiciouslyFast => "Suspiciously fast - check instructions were understood",
            StabilizationSpeed::HighCertainty => "Settled quickly - high certainty",
            StabilizationSpeed::Normal => "Normal stabilization",
            StabilizationSpeed::Delayed => "Delayed stabilization",
        }
    }
}

/// Likelihood of successful hearing-aid use, from the ANL (speech - noise)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HearingAidPrognosis {
    High,
    Moderate,
    Low,
}

impl HearingAidPrognosis {
    pub fn from_anl(anl: f64) -> Self {
        if anl <= 7.0 {
            HearingAidPrognosis::High
        } else if anl <= 13.0 {
            HearingAidPrognosis::Moderate
        } else {
            HearingAidPrognosis::Low
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            HearingAidPrognosis::High => "High Probability (85%+) of Successful Hearing Aid Use",
            HearingAidPrognosis::Moderate => "Moderate Probability of Successful Hearing Aid Use",
            HearingAidPrognosis::Low => "Low Probability of Successful Hearing Aid Use",
        }
    }
}

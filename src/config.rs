//! Configuration management for tracking runs
//!
//! This module provides runtime configuration loading from JSON files so a
//! clinic can adjust presentation levels and stopping rules without
//! recompiling. Every field has a default matching the clinical protocol, and
//! partial files only override the keys they name.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TrackingError;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tracking: TrackingConfig,
    pub audio: AudioConfig,
}

/// Adaptive tracking parameters for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Fixed speech presentation level in display dB
    pub speech_level: f64,
    /// Noise starts this many dB below the speech level
    pub initial_noise_offset: f64,
    /// Reversal count at which tracking switches to the precision rate
    pub warm_reversal_threshold: u32,
    /// Fine tracking speed in dB/second
    pub precision_rate: f64,
    /// Coarse tracking speed in dB/second
    pub warm_rate: f64,
    /// Minimum spacing between counted reversals
    pub debounce_ms: u64,
    /// Stability stop is never taken before this many seconds
    pub min_duration_seconds: f64,
    /// Stability stop needs at least this many reversals
    pub min_reversals_for_stop: u32,
    /// Unconditional stop
    pub hard_timeout_seconds: f64,
    /// Samples at or before this time are excluded from scoring
    pub stabilization_cutoff_seconds: f64,
    /// Nominal tick cadence; closer ticks are skipped
    pub tick_interval_ms: u64,
    /// Leading reversals treated as warm-up and dropped from reversal stats
    pub discarded_reversals: usize,
    /// Reversal levels required after discarding warm-up reversals
    pub min_valid_reversals: usize,
    /// Length of the trailing window used for trend and stability
    pub trend_window_seconds: f64,
    /// Trend window must contain strictly more points than this
    pub min_trend_points: usize,
    /// Stability stop requires CI95 at or below this (dB)
    pub ci95_stop_threshold: f64,
    /// Stability stop requires |slope| at or below this (dB/second)
    pub slope_stop_threshold: f64,
    /// Lower clamp for the tracked level
    pub level_min: f64,
    /// Upper clamp for the tracked level
    pub level_max: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            speech_level: 75.0,
            initial_noise_offset: 10.0,
            warm_reversal_threshold: 4,
            precision_rate: 0.5,
            warm_rate: 1.0,
            debounce_ms: 1000,
            min_duration_seconds: 60.0,
            min_reversals_for_stop: 7,
            hard_timeout_seconds: 120.0,
            stabilization_cutoff_seconds: 30.0,
            tick_interval_ms: 100,
            discarded_reversals: 3,
            min_valid_reversals: 4,
            trend_window_seconds: 30.0,
            min_trend_points: 10,
            ci95_stop_threshold: 2.5,
            slope_stop_threshold: 0.05,
            level_min: 0.0,
            level_max: 100.0,
        }
    }
}

impl TrackingConfig {
    /// Noise level at run start, clamped into the valid range
    pub fn initial_level(&self) -> f64 {
        (self.speech_level - self.initial_noise_offset).clamp(self.level_min, self.level_max)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Check that the configuration can drive a run
    ///
    /// # Returns
    /// * `Ok(())` - Configuration usable
    /// * `Err(TrackingError::InvalidConfig)` - First problem found
    pub fn validate(&self) -> Result<(), TrackingError> {
        let finite = [
            ("speech_level", self.speech_level),
            ("initial_noise_offset", self.initial_noise_offset),
            ("precision_rate", self.precision_rate),
            ("warm_rate", self.warm_rate),
            ("min_duration_seconds", self.min_duration_seconds),
            ("hard_timeout_seconds", self.hard_timeout_seconds),
            ("stabilization_cutoff_seconds", self.stabilization_cutoff_seconds),
            ("trend_window_seconds", self.trend_window_seconds),
            ("ci95_stop_threshold", self.ci95_stop_threshold),
            ("slope_stop_threshold", self.slope_stop_threshold),
            ("level_min", self.level_min),
            ("level_max", self.level_max),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, value)| !value.is_finite()) {
            return Err(invalid(format!("{} must be finite (got {})", name, value)));
        }

        if self.level_min >= self.level_max {
            return Err(invalid(format!(
                "level range [{}, {}] is empty",
                self.level_min, self.level_max
            )));
        }
        if self.warm_rate <= 0.0 || self.precision_rate <= 0.0 {
            return Err(invalid("tracking rates must be positive".to_string()));
        }
        if self.tick_interval_ms == 0 {
            return Err(invalid("tick_interval_ms must be non-zero".to_string()));
        }
        if self.hard_timeout_seconds <= 0.0 {
            return Err(invalid("hard_timeout_seconds must be positive".to_string()));
        }
        if self.min_valid_reversals < 2 {
            return Err(invalid(
                "min_valid_reversals must be at least 2 for a standard deviation".to_string(),
            ));
        }
        if self.trend_window_seconds <= 0.0 {
            return Err(invalid("trend_window_seconds must be positive".to_string()));
        }

        Ok(())
    }
}

fn invalid(reason: String) -> TrackingError {
    TrackingError::InvalidConfig { reason }
}

/// Playback level mapping configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Display level that corresponds to full-scale (0 dB) playback
    pub reference_level_db: f64,
    /// Extra offset applied to the noise channel only
    pub noise_offset_db: f64,
    /// Relative levels at or below this are rendered as silence
    pub mute_floor_db: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            reference_level_db: 85.0,
            noise_offset_db: 0.0,
            mute_floor_db: -100.0,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// Loaded configuration, or the defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default asset location
    pub fn load() -> Self {
        Self::load_from_file("assets/hant_config.json")
    }
}

//! Display level to linear playback gain.
//!
//! Display levels are referenced to `reference_level_db`: a display level
//! equal to the reference plays at full scale. Relative levels at or below
//! the mute floor are silent, and gains never exceed 1.0.

use crate::config::AudioConfig;
use crate::error::AudioError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelMapping {
    reference_level_db: f64,
    noise_offset_db: f64,
    mute_floor_db: f64,
}

impl LevelMapping {
    pub fn from_config(config: &AudioConfig) -> Self {
        Self {
            reference_level_db: config.reference_level_db,
            noise_offset_db: config.noise_offset_db,
            mute_floor_db: config.mute_floor_db,
        }
    }

    /// Player-relative dB for a display level
    pub fn relative_db(&self, level_db: f64) -> Result<f64, AudioError> {
        if !level_db.is_finite() {
            return Err(AudioError::InvalidLevel { level_db });
        }
        Ok(level_db - self.reference_level_db)
    }

    pub fn speech_gain(&self, level_db: f64) -> Result<f64, AudioError> {
        let relative = self.relative_db(level_db)?;
        Ok(self.gain_for(relative))
    }

    /// Noise gain; the channel offset is not applied to a muted level
    pub fn noise_gain(&self, level_db: f64) -> Result<f64, AudioError> {
        let relative = self.relative_db(level_db)?;
        if relative <= self.mute_floor_db {
            return Ok(0.0);
        }
        Ok(self.gain_for(relative + self.noise_offset_db))
    }

    fn gain_for(&self, relative_db: f64) -> f64 {
        if relative_db <= self.mute_floor_db {
            0.0
        } else {
            10f64.powf(relative_db / 20.0).min(1.0)
        }
    }
}

impl Default for LevelMapping {
    fn default() -> Self {
        Self::from_config(&AudioConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_reference_level_is_full_scale() {
        let mapping = LevelMapping::default();
        assert_eq!(mapping.speech_gain(85.0).unwrap(), 1.0);
        assert_eq!(mapping.speech_gain(95.0).unwrap(), 1.0);
    }

    #[test]
    fn test_twenty_db_down_is_a_tenth() {
        let mapping = LevelMapping::default();
        assert!(approx(mapping.speech_gain(65.0).unwrap(), 0.1));
        assert!(approx(mapping.noise_gain(45.0).unwrap(), 0.01));
    }

    #[test]
    fn test_mute_floor() {
        let mapping = LevelMapping::default();
        assert_eq!(mapping.speech_gain(-15.0).unwrap(), 0.0);
        assert!(mapping.speech_gain(-14.0).unwrap() > 0.0);
    }

    #[test]
    fn test_noise_offset_applies_to_noise_only() {
        let mapping = LevelMapping::from_config(&AudioConfig {
            noise_offset_db: -20.0,
            ..AudioConfig::default()
        });
        assert!(approx(mapping.noise_gain(85.0).unwrap(), 0.1));
        assert_eq!(mapping.speech_gain(85.0).unwrap(), 1.0);
        // Muted levels stay muted even with a positive offset
        let mapping = LevelMapping::from_config(&AudioConfig {
            noise_offset_db: 30.0,
            ..AudioConfig::default()
        });
        assert_eq!(mapping.noise_gain(-15.0).unwrap(), 0.0);
    }

    #[test]
    fn test_non_finite_level_is_rejected() {
        let mapping = LevelMapping::default();
        assert!(matches!(
            mapping.speech_gain(f64::NAN),
            Err(AudioError::InvalidLevel { .. })
        ));
    }
}

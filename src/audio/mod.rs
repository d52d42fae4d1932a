// Audio module - playback collaborator seam and level-to-gain mapping
//
// The tracking core never renders audio. It drives an AudioOutput with
// play/stop and per-channel levels in display dB; the host decides what a
// level means for its player.

pub mod gain;
pub mod stubs;

pub use gain::LevelMapping;
pub use stubs::{AudioCommand, NullAudioOutput, RecordingAudioOutput};

use crate::error::AudioError;

/// Playback collaborator driven by the run controller
///
/// Levels are display dB (the same scale as the tracked level).
pub trait AudioOutput: Send {
    fn play(&mut self) -> Result<(), AudioError>;
    fn stop(&mut self) -> Result<(), AudioError>;
    fn set_speech_level(&mut self, level_db: f64) -> Result<(), AudioError>;
    fn set_noise_level(&mut self, level_db: f64) -> Result<(), AudioError>;
}

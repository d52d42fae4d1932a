//! Stub audio outputs for desktop testing and simulation
//!
//! `RecordingAudioOutput` keeps every command it receives so tests can assert
//! on what the run controller asked the player to do. It shares the log
//! through an `Arc`, so a handle taken before the output is moved into a
//! controller still sees later commands. `NullAudioOutput` discards
//! everything.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::gain::LevelMapping;
use super::AudioOutput;
use crate::error::AudioError;

/// One command received by a recording output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioCommand {
    Play,
    Stop,
    SpeechLevel { level_db: f64, gain: f64 },
    NoiseLevel { level_db: f64, gain: f64 },
}

#[derive(Debug, Clone, Default)]
pub struct RecordingAudioOutput {
    mapping: LevelMapping,
    commands: Arc<Mutex<Vec<AudioCommand>>>,
    is_playing: Arc<AtomicBool>,
}

impl RecordingAudioOutput {
    pub fn new(mapping: LevelMapping) -> Self {
        Self {
            mapping,
            commands: Arc::new(Mutex::new(Vec::new())),
            is_playing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Copy of every command received so far
    pub fn commands(&self) -> Result<Vec<AudioCommand>, AudioError> {
        Ok(self.lock_commands()?.clone())
    }

    /// Most recent noise level set, if any
    pub fn last_noise_level(&self) -> Result<Option<f64>, AudioError> {
        Ok(self
            .lock_commands()?
            .iter()
            .rev()
            .find_map(|command| match command {
                AudioCommand::NoiseLevel { level_db, .. } => Some(*level_db),
                _ => None,
            }))
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing.load(Ordering::Relaxed)
    }

    fn record(&self, command: AudioCommand) -> Result<(), AudioError> {
        self.lock_commands()?.push(command);
        Ok(())
    }

    fn lock_commands(&self) -> Result<MutexGuard<'_, Vec<AudioCommand>>, AudioError> {
        self.commands.lock().map_err(|_| AudioError::LockPoisoned {
            component: "recording_audio_output".to_string(),
        })
    }
}

impl AudioOutput for RecordingAudioOutput {
    fn play(&mut self) -> Result<(), AudioError> {
        self.is_playing.store(true, Ordering::Relaxed);
        self.record(AudioCommand::Play)
    }

    /// # Errors
    /// Returns `AudioError::NotPlaying` if playback was never started
    fn stop(&mut self) -> Result<(), AudioError> {
        if !self.is_playing.swap(false, Ordering::Relaxed) {
            return Err(AudioError::NotPlaying);
        }
        self.record(AudioCommand::Stop)
    }

    fn set_speech_level(&mut self, level_db: f64) -> Result<(), AudioError> {
        let gain = self.mapping.speech_gain(level_db)?;
        self.record(AudioCommand::SpeechLevel { level_db, gain })
    }

    fn set_noise_level(&mut self, level_db: f64) -> Result<(), AudioError> {
        let gain = self.mapping.noise_gain(level_db)?;
        self.record(AudioCommand::NoiseLevel { level_db, gain })
    }
}

/// Output that accepts every command and does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudioOutput;

impl AudioOutput for NullAudioOutput {
    fn play(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn set_speech_level(&mut self, _level_db: f64) -> Result<(), AudioError> {
        Ok(())
    }

    fn set_noise_level(&mut self, _level_db: f64) -> Result<(), AudioError> {
        Ok(())
    }
}

// RunController - binds a TrackingRun to its collaborators
//
// Reads the clock and the input once per frame, forwards the frame to the
// run and pushes the resulting level to the audio output. Audio failures are
// logged and never end a run.

use std::sync::Arc;
use std::time::Instant;

use log::info;

use crate::audio::AudioOutput;
use crate::config::TrackingConfig;
use crate::error::{log_audio_error, AudioError, TrackingError};
use crate::metrics::RunResult;
use crate::telemetry;
use crate::tracking::{LiveSnapshot, TickOutcome, TrackingRun};

use super::clock::TimeSource;
use super::input::InputSignal;

pub struct RunController<A: AudioOutput> {
    run: TrackingRun,
    audio: A,
    input: Arc<dyn InputSignal>,
    clock: Arc<dyn TimeSource>,
    started_at: Option<Instant>,
}

impl<A: AudioOutput> RunController<A> {
    /// Create a controller for a fresh run
    ///
    /// # Errors
    /// Returns `TrackingError::InvalidConfig` if the configuration is rejected
    pub fn new(
        config: TrackingConfig,
        audio: A,
        input: Arc<dyn InputSignal>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, TrackingError> {
        Ok(Self {
            run: TrackingRun::new(config)?,
            audio,
            input,
            clock,
            started_at: None,
        })
    }

    /// Start playback and the run clock
    ///
    /// # Errors
    /// * `TrackingError::AlreadyRunning` - `start` was already called
    /// * `TrackingError::AlreadyFinished` - The run was stopped before starting
    pub fn start(&mut self) -> Result<(), TrackingError> {
        if self.started_at.is_some() {
            return Err(TrackingError::AlreadyRunning);
        }
        if self.run.is_finished() {
            return Err(TrackingError::AlreadyFinished);
        }

        self.started_at = Some(self.clock.now());
        let speech_level = self.run.config().speech_level;
        let noise_level = self.run.state().current_level();

        audio_step(self.audio.play(), "start playback");
        audio_step(self.audio.set_speech_level(speech_level), "set speech level");
        audio_step(self.audio.set_noise_level(noise_level), "set initial noise level");

        info!(
            "[RunController] Run started (speech {:.1} dB, noise {:.1} dB)",
            speech_level, noise_level
        );
        Ok(())
    }

    /// Process one host frame
    ///
    /// # Errors
    /// Returns `TrackingError::NotRunning` if `start` has not been called
    pub fn poll(&mut self) -> Result<TickOutcome, TrackingError> {
        let started_at = self.started_at.ok_or(TrackingError::NotRunning)?;
        let elapsed = self.clock.now().saturating_duration_since(started_at);
        let held = self.input.is_held();

        let outcome = self.run.tick(elapsed, held);
        match &outcome {
            TickOutcome::Advanced { sample, .. } => {
                audio_step(self.audio.set_noise_level(sample.level), "set noise level");
            }
            TickOutcome::Finished(result) => {
                if let Some(sample) = result.history.last() {
                    audio_step(self.audio.set_noise_level(sample.level), "set noise level");
                }
                audio_step(self.audio.stop(), "stop playback");
            }
            TickOutcome::Idle => {}
        }
        Ok(outcome)
    }

    /// Operator stop
    ///
    /// # Returns
    /// `None` if the run had already finished
    pub fn manual_stop(&mut self) -> Option<RunResult> {
        let result = self.run.manual_stop()?;
        if self.started_at.is_some() {
            audio_step(self.audio.stop(), "stop playback");
        }
        Some(result)
    }

    /// Release a control the host can no longer observe
    pub fn on_focus_lost(&self) {
        if self.input.is_held() {
            info!("[RunController] Focus lost while held; forcing release");
            telemetry::hub().record_forced_release();
        }
        self.input.force_release();
    }

    pub fn live_snapshot(&self) -> LiveSnapshot {
        self.run.live_snapshot()
    }

    pub fn run(&self) -> &TrackingRun {
        &self.run
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.run.is_finished()
    }
}

fn audio_step(result: Result<(), AudioError>, context: &str) {
    if let Err(err) = result {
        log_audio_error(&err, context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioCommand, RecordingAudioOutput};
    use crate::engine::clock::StubTimeSource;
    use crate::engine::input::SharedInput;
    use crate::metrics::StopReason;

    fn controller(
        input: &SharedInput,
    ) -> (RunController<RecordingAudioOutput>, RecordingAudioOutput) {
        let audio = RecordingAudioOutput::default();
        let handle = audio.clone();
        let controller = RunController::new(
            TrackingConfig::default(),
            audio,
            Arc::new(input.clone()),
            Arc::new(StubTimeSource::default()),
        )
        .unwrap();
        (controller, handle)
    }

    #[test]
    fn poll_before_start_is_rejected() {
        let input = SharedInput::new();
        let (mut controller, _) = controller(&input);
        assert_eq!(controller.poll(), Err(TrackingError::NotRunning));
    }

    #[test]
    fn start_plays_and_sets_levels() {
        let input = SharedInput::new();
        let (mut controller, audio) = controller(&input);
        controller.start().unwrap();

        let commands = audio.commands().unwrap();
        assert_eq!(commands[0], AudioCommand::Play);
        assert!(matches!(
            commands[1],
            AudioCommand::SpeechLevel { level_db, .. } if level_db == 75.0
        ));
        assert!(matches!(
            commands[2],
            AudioCommand::NoiseLevel { level_db, .. } if level_db == 65.0
        ));
        assert_eq!(controller.start(), Err(TrackingError::AlreadyRunning));
    }

    #[test]
    fn every_tick_updates_noise_level() {
        let input = SharedInput::new();
        let (mut controller, audio) = controller(&input);
        controller.start().unwrap();

        for _ in 0..5 {
            assert!(matches!(
                controller.poll().unwrap(),
                TickOutcome::Advanced { .. }
            ));
        }
        let level = audio.last_noise_level().unwrap().unwrap();
        assert!((level - 65.5).abs() < 1e-9);
    }

    #[test]
    fn held_input_turns_the_level_down() {
        let input = SharedInput::new();
        let (mut controller, _) = controller(&input);
        controller.start().unwrap();

        input.press();
        for _ in 0..10 {
            controller.poll().unwrap();
        }
        let snapshot = controller.live_snapshot();
        assert_eq!(snapshot.reversal_count, 1);
        assert!(!snapshot.is_increasing);
        assert!((snapshot.level - 64.0).abs() < 1e-9);
    }

    #[test]
    fn focus_loss_releases_the_control() {
        let input = SharedInput::new();
        let (mut controller, _) = controller(&input);
        controller.start().unwrap();

        input.press();
        controller.poll().unwrap();
        controller.on_focus_lost();
        assert!(!input.is_held());

        // Next accepted reversal flips back to increasing once debounce passes
        for _ in 0..11 {
            controller.poll().unwrap();
        }
        assert!(controller.live_snapshot().is_increasing);
        assert_eq!(controller.live_snapshot().reversal_count, 2);
    }

    #[test]
    fn manual_stop_stops_audio_once() {
        let input = SharedInput::new();
        let (mut controller, audio) = controller(&input);
        controller.start().unwrap();
        controller.poll().unwrap();

        let result = controller.manual_stop().unwrap();
        assert_eq!(result.stop_reason, StopReason::ManualStop);
        assert!(controller.manual_stop().is_none());
        assert!(matches!(controller.poll().unwrap(), TickOutcome::Idle));

        let stops = audio
            .commands()
            .unwrap()
            .iter()
            .filter(|command| **command == AudioCommand::Stop)
            .count();
        assert_eq!(stops, 1);
        assert!(!audio.is_playing());
    }

    #[test]
    fn timeout_finishes_and_stops_audio() {
        let input = SharedInput::new();
        let (mut controller, audio) = controller(&input);
        controller.start().unwrap();

        let result = loop {
            if let TickOutcome::Finished(result) = controller.poll().unwrap() {
                break *result;
            }
        };
        assert_eq!(result.stop_reason, StopReason::Timeout);
        assert!(controller.is_finished());
        assert!(!audio.is_playing());
    }
}

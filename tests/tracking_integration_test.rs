//! Integration tests for complete tracking sessions
//!
//! These tests drive the public API the way a host application would:
//! - Test A and Test B runs through the session manager
//! - A scripted listener wired through the run controller
//! - Saving and reloading results as JSON before comparison

use std::sync::Arc;
use std::time::Duration;

use hant_tracker::audio::{AudioCommand, RecordingAudioOutput};
use hant_tracker::comparison::{Direction, SignificanceStatus};
use hant_tracker::engine::{RunController, SharedInput, StubTimeSource};
use hant_tracker::managers::{SessionManager, TestSlot};
use hant_tracker::metrics::HearingAidPrognosis;
use hant_tracker::{
    compare_runs, RunResult, SignificanceReport, StopReason, TickOutcome, TrackingConfig,
};

/// Listener that holds the control whenever the noise is above `target`
fn run_session_slot(manager: &SessionManager, slot: TestSlot, target: f64) -> RunResult {
    manager.start_test(slot).unwrap();
    let mut level = TrackingConfig::default().initial_level();
    let mut k = 0u64;
    loop {
        k += 1;
        match manager
            .tick(Duration::from_millis(100 * k), level > target)
            .unwrap()
        {
            TickOutcome::Advanced { sample, .. } => level = sample.level,
            TickOutcome::Finished(result) => return *result,
            TickOutcome::Idle => {}
        }
        assert!(k < 2_000, "run did not finish");
    }
}

/// Full A/B session with two consistent listeners
///
/// Test steps:
/// 1. Test A converges around 60 dB noise
/// 2. Test B converges around 66 dB noise
/// 3. The comparison reports a definite improvement
#[test]
fn test_full_session_reports_improvement() {
    let manager = SessionManager::default();

    let a = run_session_slot(&manager, TestSlot::A, 60.0);
    assert_eq!(a.stop_reason, StopReason::StableCriteriaMet);
    assert_eq!(a.meta.duration_seconds, 60.0);
    assert!(a.usable_standard_error().is_some());

    let b = run_session_slot(&manager, TestSlot::B, 66.0);
    assert_eq!(b.stop_reason, StopReason::StableCriteriaMet);
    assert!(b.score.instantaneous > a.score.instantaneous);

    let report = manager.comparison().unwrap().unwrap();
    let assessment = report.assessment().unwrap();
    assert_eq!(assessment.status, SignificanceStatus::Strong);
    assert_eq!(assessment.direction, Direction::Improvement);
    assert_eq!(report.message(), "Definite Improvement (95% CI)");
}

/// Results survive a JSON round trip and compare the same afterwards
#[test]
fn test_reloaded_results_compare_identically() {
    let manager = SessionManager::default();
    let a = run_session_slot(&manager, TestSlot::A, 60.0);
    let b = run_session_slot(&manager, TestSlot::B, 66.0);

    let reload = |result: &RunResult| -> RunResult {
        let json = serde_json::to_string(result).unwrap();
        serde_json::from_str(&json).unwrap()
    };

    assert_eq!(compare_runs(&reload(&a), &reload(&b)), compare_runs(&a, &b));
}

/// A converged listener at 60 dB noise against 75 dB speech has an ANL near 15
#[test]
fn test_converged_run_metrics() {
    let manager = SessionManager::default();
    let result = run_session_slot(&manager, TestSlot::A, 60.0);

    assert!((result.anl() - 15.0).abs() < 1.0);
    assert_eq!(result.prognosis(), HearingAidPrognosis::Low);
    assert!(result.meta.reversal_count >= 7);
    assert!(result.validity.averaged_score.is_some());
    assert!(result.validity.stability.std_dev.unwrap() <= 2.0);
    assert_eq!(result.stability_label(), "High Stability");
    assert!(result.meta.stabilization_seconds.is_some());
    assert!(result
        .history
        .windows(2)
        .all(|pair| pair[1].t > pair[0].t));
}

/// Controller with recorded audio: every tick sends a noise level and the
/// run ends with a single stop
#[test]
fn test_controller_drives_audio_until_finish() {
    let input = SharedInput::new();
    let audio = RecordingAudioOutput::default();
    let audio_handle = audio.clone();
    let mut controller = RunController::new(
        TrackingConfig::default(),
        audio,
        Arc::new(input.clone()),
        Arc::new(StubTimeSource::default()),
    )
    .unwrap();
    controller.start().unwrap();

    let result = loop {
        let level = controller.live_snapshot().level;
        input.set_held(level > 60.0);
        if let TickOutcome::Finished(result) = controller.poll().unwrap() {
            break *result;
        }
    };

    assert_eq!(result.stop_reason, StopReason::StableCriteriaMet);
    let commands = audio_handle.commands().unwrap();
    let noise_updates = commands
        .iter()
        .filter(|command| matches!(command, AudioCommand::NoiseLevel { .. }))
        .count();
    // Initial level, 599 advancing ticks, and the finishing tick
    assert_eq!(noise_updates, 601);
    assert_eq!(commands.last(), Some(&AudioCommand::Stop));
}

/// Manual-entry results never produce a numeric significance claim
#[test]
fn test_manual_entry_against_tracked_run() {
    let manager = SessionManager::default();
    manager.record_manual(TestSlot::A, 70.0, 62.0).unwrap();
    let b = run_session_slot(&manager, TestSlot::B, 60.0);
    assert!(b.usable_standard_error().is_some());

    assert_eq!(
        manager.comparison().unwrap(),
        Some(SignificanceReport::InsufficientData)
    );
}

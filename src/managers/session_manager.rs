// SessionManager: Test A / Test B lifecycle for one patient session
//
// Single Responsibility: which run is active, which results exist, and
// when a comparison can be made. Runs are strictly sequential: one active
// run at a time, and Test B only after Test A has a result.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::comparison::{compare_runs, SignificanceReport};
use crate::config::TrackingConfig;
use crate::error::{log_tracking_error, TrackingError};
use crate::managers::broadcast_manager::BroadcastChannelManager;
use crate::metrics::RunResult;
use crate::tracking::{TickOutcome, TrackingRun};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestSlot {
    A,
    B,
}

impl TestSlot {
    pub fn display_name(&self) -> &'static str {
        match self {
            TestSlot::A => "Test A",
            TestSlot::B => "Test B",
        }
    }
}

/// A finished run tagged with the slot it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotResult {
    pub slot: TestSlot,
    pub result: RunResult,
}

/// Labels shown on reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub patient_label: String,
    pub test_a_label: String,
    pub test_b_label: String,
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self {
            patient_label: String::new(),
            test_a_label: "Current Hearing Aids".to_string(),
            test_b_label: "New Hearing Aids".to_string(),
        }
    }
}

struct ActiveRun {
    slot: TestSlot,
    run: TrackingRun,
}

#[derive(Default)]
struct SessionResults {
    a: Option<RunResult>,
    b: Option<RunResult>,
}

impl SessionResults {
    fn get(&self, slot: TestSlot) -> Option<&RunResult> {
        match slot {
            TestSlot::A => self.a.as_ref(),
            TestSlot::B => self.b.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: TestSlot) -> &mut Option<RunResult> {
        match slot {
            TestSlot::A => &mut self.a,
            TestSlot::B => &mut self.b,
        }
    }
}

/// Manages one patient session
///
/// This manager handles:
/// - Starting runs for Test A and Test B in order
/// - Forwarding host frames to the active run
/// - Storing finished results and publishing them
/// - Manual-entry results and restarts
/// - Cross-run comparison once both results exist
pub struct SessionManager {
    config: TrackingConfig,
    info: Arc<RwLock<SessionInfo>>,
    active: Arc<Mutex<Option<ActiveRun>>>,
    results: Arc<RwLock<SessionResults>>,
    broadcasts: BroadcastChannelManager,
}

impl SessionManager {
    pub fn new(config: TrackingConfig) -> Self {
        let broadcasts = BroadcastChannelManager::new();
        broadcasts.init_results();
        Self {
            config,
            info: Arc::new(RwLock::new(SessionInfo::default())),
            active: Arc::new(Mutex::new(None)),
            results: Arc::new(RwLock::new(SessionResults::default())),
            broadcasts,
        }
    }

    pub fn broadcasts(&self) -> &BroadcastChannelManager {
        &self.broadcasts
    }

    pub fn info(&self) -> Result<SessionInfo, TrackingError> {
        Ok(self.read_info()?.clone())
    }

    pub fn set_info(&self, info: SessionInfo) -> Result<(), TrackingError> {
        *self.write_info()? = info;
        Ok(())
    }

    /// Start a tracking run for `slot`
    ///
    /// # Errors
    /// - `AlreadyRunning` if another run is active
    /// - `InvalidSessionState` if the slot already has a result, or Test B is
    ///   started before Test A has one
    /// - `InvalidConfig` if the session's tracking configuration is rejected
    pub fn start_test(&self, slot: TestSlot) -> Result<(), TrackingError> {
        let mut active = self.lock_active()?;
        if let Some(current) = active.as_ref() {
            let err = TrackingError::AlreadyRunning;
            log_tracking_error(&err, &format!("start {:?} while {:?} active", slot, current.slot));
            return Err(err);
        }
        self.check_slot_available(slot)?;

        let run = TrackingRun::new(self.config.clone())?;
        self.broadcasts.init_samples();
        *active = Some(ActiveRun { slot, run });

        info!("[SessionManager] {} started", slot.display_name());
        Ok(())
    }

    /// Forward one host frame to the active run
    ///
    /// # Errors
    /// `NotRunning` if no run is active
    pub fn tick(&self, elapsed: Duration, held: bool) -> Result<TickOutcome, TrackingError> {
        let mut active = self.lock_active()?;
        let current = active.as_mut().ok_or(TrackingError::NotRunning)?;

        let outcome = current.run.tick(elapsed, held);
        match &outcome {
            TickOutcome::Advanced { sample, .. } => {
                if let Some(tx) = self.broadcasts.sample_sender() {
                    let _ = tx.send(*sample);
                }
            }
            TickOutcome::Finished(result) => {
                if let (Some(tx), Some(sample)) =
                    (self.broadcasts.sample_sender(), result.history.last())
                {
                    let _ = tx.send(*sample);
                }
                let slot = current.slot;
                *active = None;
                self.store_result(slot, (**result).clone())?;
            }
            TickOutcome::Idle => {}
        }
        Ok(outcome)
    }

    /// Operator stop of the active run
    ///
    /// # Errors
    /// `NotRunning` if no run is active
    pub fn manual_stop(&self) -> Result<RunResult, TrackingError> {
        let mut active = self.lock_active()?;
        let mut current = active.take().ok_or(TrackingError::NotRunning)?;
        let result = current
            .run
            .manual_stop()
            .ok_or(TrackingError::AlreadyFinished)?;
        self.store_result(current.slot, result.clone())?;
        Ok(result)
    }

    /// Store a result measured by hand (MCL / BNL)
    pub fn record_manual(
        &self,
        slot: TestSlot,
        most_comfortable_level: f64,
        background_noise_level: f64,
    ) -> Result<RunResult, TrackingError> {
        if !most_comfortable_level.is_finite() || !background_noise_level.is_finite() {
            return Err(TrackingError::InvalidSessionState {
                reason: "manual levels must be finite".to_string(),
            });
        }
        let active = self.lock_active()?;
        if active.is_some() {
            return Err(TrackingError::AlreadyRunning);
        }
        self.check_slot_available(slot)?;

        let result = RunResult::from_manual_levels(most_comfortable_level, background_noise_level);
        self.store_result(slot, result.clone())?;
        Ok(result)
    }

    /// Discard a slot's result, and its run if that slot is active
    pub fn restart_test(&self, slot: TestSlot) -> Result<(), TrackingError> {
        let mut active = self.lock_active()?;
        if active.as_ref().is_some_and(|current| current.slot == slot) {
            *active = None;
        }
        *self.write_results()?.slot_mut(slot) = None;
        info!("[SessionManager] {} restarted", slot.display_name());
        Ok(())
    }

    pub fn result(&self, slot: TestSlot) -> Result<Option<RunResult>, TrackingError> {
        Ok(self.read_results()?.get(slot).cloned())
    }

    pub fn active_slot(&self) -> Result<Option<TestSlot>, TrackingError> {
        Ok(self.lock_active()?.as_ref().map(|current| current.slot))
    }

    /// Significance of B against A once both results exist
    pub fn comparison(&self) -> Result<Option<SignificanceReport>, TrackingError> {
        let results = self.read_results()?;
        Ok(match (results.a.as_ref(), results.b.as_ref()) {
            (Some(a), Some(b)) => Some(compare_runs(a, b)),
            _ => None,
        })
    }

    // ========================================================================
    // HELPER METHODS - Lock management and validation
    // ========================================================================

    fn check_slot_available(&self, slot: TestSlot) -> Result<(), TrackingError> {
        let results = self.read_results()?;
        let reason = if results.get(slot).is_some() {
            Some(format!("{} already has a result; restart it first", slot.display_name()))
        } else if slot == TestSlot::B && results.a.is_none() {
            Some("Test B requires a finished Test A".to_string())
        } else {
            None
        };

        match reason {
            Some(reason) => {
                let err = TrackingError::InvalidSessionState { reason };
                log_tracking_error(&err, "check_slot_available");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn store_result(&self, slot: TestSlot, result: RunResult) -> Result<(), TrackingError> {
        *self.write_results()?.slot_mut(slot) = Some(result.clone());
        info!(
            "[SessionManager] {} finished: score {:.1} dB ({:?})",
            slot.display_name(),
            result.score.instantaneous,
            result.stop_reason
        );
        if let Some(tx) = self.broadcasts.result_sender() {
            let _ = tx.send(SlotResult { slot, result });
        }
        Ok(())
    }

    fn lock_active(&self) -> Result<MutexGuard<'_, Option<ActiveRun>>, TrackingError> {
        self.active.lock().map_err(|_| TrackingError::StatePoisoned)
    }

    fn read_results(&self) -> Result<RwLockReadGuard<'_, SessionResults>, TrackingError> {
        self.results.read().map_err(|_| TrackingError::StatePoisoned)
    }

    fn write_results(&self) -> Result<RwLockWriteGuard<'_, SessionResults>, TrackingError> {
        self.results.write().map_err(|_| TrackingError::StatePoisoned)
    }

    fn read_info(&self) -> Result<RwLockReadGuard<'_, SessionInfo>, TrackingError> {
        self.info.read().map_err(|_| TrackingError::StatePoisoned)
    }

    fn write_info(&self) -> Result<RwLockWriteGuard<'_, SessionInfo>, TrackingError> {
        self.info.write().map_err(|_| TrackingError::StatePoisoned)
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(TrackingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::StopReason;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    /// Tick a silent listener until the run times out
    fn run_to_timeout(manager: &SessionManager) -> RunResult {
        let mut k = 0;
        loop {
            k += 1;
            if let TickOutcome::Finished(result) = manager.tick(ms(100 * k), false).unwrap() {
                return *result;
            }
        }
    }

    #[test]
    fn test_default_labels() {
        let manager = SessionManager::default();
        let info = manager.info().unwrap();
        assert_eq!(info.test_a_label, "Current Hearing Aids");
        assert_eq!(info.test_b_label, "New Hearing Aids");
    }

    #[test]
    fn test_only_one_active_run() {
        let manager = SessionManager::default();
        manager.start_test(TestSlot::A).unwrap();
        assert_eq!(manager.active_slot().unwrap(), Some(TestSlot::A));
        assert_eq!(
            manager.start_test(TestSlot::A),
            Err(TrackingError::AlreadyRunning)
        );
    }

    #[test]
    fn test_b_requires_a() {
        let manager = SessionManager::default();
        assert!(matches!(
            manager.start_test(TestSlot::B),
            Err(TrackingError::InvalidSessionState { .. })
        ));
    }

    #[test]
    fn test_tick_without_run_is_rejected() {
        let manager = SessionManager::default();
        assert_eq!(
            manager.tick(ms(100), false),
            Err(TrackingError::NotRunning)
        );
        assert_eq!(manager.manual_stop(), Err(TrackingError::NotRunning));
    }

    #[test]
    fn test_finished_run_is_stored_and_published() {
        let manager = SessionManager::default();
        let mut results_rx = manager.broadcasts().subscribe_results().unwrap();

        manager.start_test(TestSlot::A).unwrap();
        let result = run_to_timeout(&manager);

        assert_eq!(result.stop_reason, StopReason::Timeout);
        assert_eq!(manager.active_slot().unwrap(), None);
        assert_eq!(manager.result(TestSlot::A).unwrap(), Some(result.clone()));

        let published = results_rx.try_recv().unwrap();
        assert_eq!(published.slot, TestSlot::A);
        assert_eq!(published.result, result);
    }

    #[test]
    fn test_sample_stream_ends_with_final_sample() {
        let manager = SessionManager::new(TrackingConfig {
            hard_timeout_seconds: 1.0,
            ..TrackingConfig::default()
        });
        manager.start_test(TestSlot::A).unwrap();
        let mut samples_rx = manager.broadcasts().subscribe_samples().unwrap();
        let result = run_to_timeout(&manager);
        assert_eq!(result.stop_reason, StopReason::Timeout);

        let mut received = Vec::new();
        while let Ok(sample) = samples_rx.try_recv() {
            received.push(sample);
        }
        assert_eq!(received.len(), 10);
        assert_eq!(received[0].t, 0.1);
        assert_eq!(received.last(), result.history.last());
        assert_eq!(received.last().map(|sample| sample.t), Some(1.0));
    }

    #[test]
    fn test_manual_stop_stores_result() {
        let manager = SessionManager::default();
        manager.start_test(TestSlot::A).unwrap();
        manager.tick(ms(100), false).unwrap();

        let result = manager.manual_stop().unwrap();
        assert_eq!(result.stop_reason, StopReason::ManualStop);
        assert!(manager.result(TestSlot::A).unwrap().is_some());
        assert_eq!(manager.manual_stop(), Err(TrackingError::NotRunning));
    }

    #[test]
    fn test_slot_with_result_must_be_restarted() {
        let manager = SessionManager::default();
        manager.record_manual(TestSlot::A, 70.0, 62.0).unwrap();
        assert!(manager.start_test(TestSlot::A).is_err());

        manager.restart_test(TestSlot::A).unwrap();
        assert_eq!(manager.result(TestSlot::A).unwrap(), None);
        manager.start_test(TestSlot::A).unwrap();
    }

    #[test]
    fn test_restart_discards_active_run() {
        let manager = SessionManager::default();
        manager.start_test(TestSlot::A).unwrap();
        manager.restart_test(TestSlot::A).unwrap();
        assert_eq!(manager.active_slot().unwrap(), None);
        assert_eq!(manager.result(TestSlot::A).unwrap(), None);
    }

    #[test]
    fn test_comparison_needs_both_results() {
        let manager = SessionManager::default();
        assert_eq!(manager.comparison().unwrap(), None);

        manager.record_manual(TestSlot::A, 70.0, 62.0).unwrap();
        assert_eq!(manager.comparison().unwrap(), None);

        manager.record_manual(TestSlot::B, 70.0, 66.0).unwrap();
        // Manual results carry no standard error
        assert_eq!(
            manager.comparison().unwrap(),
            Some(SignificanceReport::InsufficientData)
        );
    }

    #[test]
    fn test_tracked_runs_without_reversals_cannot_be_compared() {
        let manager = SessionManager::default();
        manager.start_test(TestSlot::A).unwrap();
        run_to_timeout(&manager);
        manager.start_test(TestSlot::B).unwrap();
        run_to_timeout(&manager);

        assert_eq!(
            manager.comparison().unwrap(),
            Some(SignificanceReport::InsufficientData)
        );
    }

    #[test]
    fn test_manual_levels_must_be_finite() {
        let manager = SessionManager::default();
        assert!(manager.record_manual(TestSlot::A, f64::NAN, 60.0).is_err());
    }
}

//! Async run driver.
//!
//! Polls a `RunController` from a tokio interval the way a host display loop
//! would, several frames per tracking tick, and fans every new sample out on
//! a broadcast channel. Completion is two-phase: the result is computed
//! synchronously inside the run, then handed to the waiting host over a
//! oneshot channel.

use tokio::sync::{broadcast, oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::audio::AudioOutput;
use crate::error::TrackingError;
use crate::metrics::RunResult;
use crate::tracking::{TickOutcome, TrackingSample};

use super::controller::RunController;

/// Host frames per tracking tick
pub const FRAMES_PER_TICK: u32 = 4;

/// Handle to a spawned run
pub struct RunHandle {
    stop_tx: watch::Sender<bool>,
    result_rx: oneshot::Receiver<Result<RunResult, TrackingError>>,
}

impl RunHandle {
    /// Request a manual stop; a no-op once the run has finished
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Wait for the run's result
    pub async fn wait(self) -> Result<RunResult, TrackingError> {
        self.result_rx
            .await
            .unwrap_or(Err(TrackingError::NotRunning))
    }
}

/// Spawn a run on the current tokio runtime
///
/// # Arguments
/// * `controller` - Controller for a run that has not been started yet
/// * `samples` - Every appended sample is sent here
pub fn spawn_run<A>(controller: RunController<A>, samples: broadcast::Sender<TrackingSample>) -> RunHandle
where
    A: AudioOutput + 'static,
{
    let (stop_tx, stop_rx) = watch::channel(false);
    let (result_tx, result_rx) = oneshot::channel();

    tokio::spawn(async move {
        let result = drive_run(controller, samples, stop_rx).await;
        if result_tx.send(result).is_err() {
            debug!("run handle dropped before the result was delivered");
        }
    });

    RunHandle { stop_tx, result_rx }
}

/// Drive a run to completion
///
/// # Arguments
/// * `controller` - Started or unstarted controller; started here if needed
/// * `samples` - Every appended sample is sent here
/// * `stop_rx` - Becomes `true` when the operator stops the run
///
/// # Errors
/// Propagates controller state errors; a finished run always yields `Ok`
pub async fn drive_run<A: AudioOutput>(
    mut controller: RunController<A>,
    samples: broadcast::Sender<TrackingSample>,
    mut stop_rx: watch::Receiver<bool>,
) -> Result<RunResult, TrackingError> {
    if !controller.is_started() {
        controller.start()?;
    }

    let tick_interval = controller.run().config().tick_interval();
    let mut frames = interval(tick_interval / FRAMES_PER_TICK);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stop_open = true;

    info!(?tick_interval, "tracking run driver started");

    loop {
        tokio::select! {
            _ = frames.tick() => {
                match controller.poll()? {
                    TickOutcome::Advanced { sample, .. } => {
                        // No subscribers is fine; the history is kept in the run
                        let _ = samples.send(sample);
                    }
                    TickOutcome::Finished(result) => {
                        if let Some(sample) = result.history.last() {
                            let _ = samples.send(*sample);
                        }
                        info!(stop_reason = ?result.stop_reason, "tracking run finished");
                        return Ok(*result);
                    }
                    TickOutcome::Idle => {}
                }
            }
            changed = stop_rx.changed(), if stop_open => {
                if changed.is_err() {
                    warn!("stop signal dropped; run continues until it finishes");
                    stop_open = false;
                    continue;
                }
                if *stop_rx.borrow_and_update() {
                    info!("manual stop requested");
                    return controller.manual_stop().ok_or(TrackingError::AlreadyFinished);
                }
            }
        }
    }
}

// TrackingRun - one adaptive tracking run from start to result
//
// Owns the RunState and the growing history. The host calls `tick` from its
// own scheduler with the time since run start and the held state it read for
// this frame. The finish latch in RunState guarantees a single RunResult no
// matter whether timeout, stability or a manual stop gets there first.

use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::TrackingConfig;
use crate::error::TrackingError;
use crate::metrics::{MetricsEngine, RunResult, StopReason};
use crate::telemetry;
use crate::tracking::convergence::{ConvergenceCheck, ConvergenceMonitor, TrendSnapshot};
use crate::tracking::integrator::LevelIntegrator;
use crate::tracking::sampler::{SamplerEvent, SignalSampler};
use crate::tracking::state::{RunState, TrackingSample};

/// Result of offering one frame to the run
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Frame skipped: too close to the previous tick, or the run is over
    Idle,
    /// Level advanced and a sample was appended
    Advanced {
        sample: TrackingSample,
        event: SamplerEvent,
    },
    /// This tick ended the run
    Finished(Box<RunResult>),
}

/// Live view of a run for host dashboards
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSnapshot {
    pub elapsed_seconds: f64,
    pub level: f64,
    pub is_increasing: bool,
    pub reversal_count: u32,
    pub rate_per_second: f64,
    pub trend: Option<TrendSnapshot>,
    pub is_finished: bool,
}

pub struct TrackingRun {
    config: TrackingConfig,
    state: RunState,
    history: Vec<TrackingSample>,
    sampler: SignalSampler,
    integrator: LevelIntegrator,
    monitor: ConvergenceMonitor,
    metrics: MetricsEngine,
    /// Elapsed time of the last processed tick
    last_tick: Duration,
    last_trend: Option<TrendSnapshot>,
    stop_reason: Option<StopReason>,
}

impl TrackingRun {
    /// Create a run positioned at the initial noise level
    ///
    /// # Arguments
    /// * `config` - Tracking parameters; validated here
    ///
    /// # Returns
    /// * `Ok(TrackingRun)` - Ready to tick, history holds the `t = 0` sample
    /// * `Err(TrackingError::InvalidConfig)` - Configuration rejected
    pub fn new(config: TrackingConfig) -> Result<Self, TrackingError> {
        config.validate()?;

        let integrator = LevelIntegrator::from_config(&config);
        let initial_level = config.initial_level();
        let state = RunState::new(initial_level, integrator.rate_for(0));

        info!(
            "[TrackingRun] Starting run: speech {:.1} dB, noise {:.1} dB",
            config.speech_level, initial_level
        );

        Ok(Self {
            sampler: SignalSampler::new(config.debounce_ms),
            monitor: ConvergenceMonitor::from_config(&config),
            metrics: MetricsEngine::from_config(&config),
            integrator,
            state,
            history: vec![TrackingSample::new(0.0, initial_level)],
            last_tick: Duration::ZERO,
            last_trend: None,
            stop_reason: None,
            config,
        })
    }

    /// Offer one frame to the run
    ///
    /// # Arguments
    /// * `elapsed` - Time since run start
    /// * `held` - Decrease control state, read once for this frame
    pub fn tick(&mut self, elapsed: Duration, held: bool) -> TickOutcome {
        if self.state.is_finished() {
            return TickOutcome::Idle;
        }
        let Some(dt) = elapsed.checked_sub(self.last_tick) else {
            return TickOutcome::Idle;
        };
        if dt < self.config.tick_interval() {
            return TickOutcome::Idle;
        }

        let event = self.sampler.observe(&mut self.state, held, elapsed);
        self.report_sampler_event(event, elapsed);

        let previous_rate = self.state.rate_per_second();
        let level = self.integrator.advance(&mut self.state, dt.as_secs_f64());
        let rate = self.state.rate_per_second();
        if rate != previous_rate {
            info!(
                "[TrackingRun] Rate {:.2} -> {:.2} dB/s after {} reversals",
                previous_rate,
                rate,
                self.state.reversal_count()
            );
            telemetry::hub().record_rate_changed(rate, self.state.reversal_count());
        }

        let t = elapsed.as_secs_f64();
        let sample = TrackingSample::new(t, level);
        self.history.push(sample);
        self.last_tick = elapsed;

        match self.monitor.evaluate(&self.state, &self.history, t) {
            ConvergenceCheck::Continue(trend) => {
                if trend.is_some() {
                    self.last_trend = trend;
                }
                TickOutcome::Advanced { sample, event }
            }
            ConvergenceCheck::Stop { reason, trend } => {
                if trend.is_some() {
                    self.last_trend = trend;
                }
                match self.finish(reason) {
                    Some(result) => TickOutcome::Finished(Box::new(result)),
                    None => TickOutcome::Idle,
                }
            }
        }
    }

    /// Operator stop; safe to call at any time
    pub fn manual_stop(&mut self) -> Option<RunResult> {
        self.finish(StopReason::ManualStop)
    }

    /// Finish the run with the accumulated history
    ///
    /// # Returns
    /// * `Some(RunResult)` - This call won the finish latch
    /// * `None` - The run had already finished; nothing changed
    pub fn finish(&mut self, reason: StopReason) -> Option<RunResult> {
        if !self.state.mark_finished() {
            debug!(
                "[TrackingRun] Ignoring {:?}: run already finished with {:?}",
                reason, self.stop_reason
            );
            return None;
        }
        self.stop_reason = Some(reason);

        let result = self.metrics.finalize(
            self.history.clone(),
            self.state.reversal_levels(),
            self.config.speech_level,
            self.state.current_level(),
            reason,
        );

        info!(
            "[TrackingRun] Finished ({:?}) after {:.1}s with {} reversals",
            reason,
            result.meta.duration_seconds,
            self.state.reversal_count()
        );
        telemetry::hub().record_run_finished(reason, result.score.instantaneous);

        Some(result)
    }

    pub fn live_snapshot(&self) -> LiveSnapshot {
        LiveSnapshot {
            elapsed_seconds: self.last_tick.as_secs_f64(),
            level: self.state.current_level(),
            is_increasing: self.state.is_increasing(),
            reversal_count: self.state.reversal_count(),
            rate_per_second: self.state.rate_per_second(),
            trend: self.last_trend,
            is_finished: self.state.is_finished(),
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn history(&self) -> &[TrackingSample] {
        &self.history
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    fn report_sampler_event(&self, event: SamplerEvent, elapsed: Duration) {
        match event {
            SamplerEvent::Reversal { count, level } => {
                debug!(
                    "[TrackingRun] Reversal #{} at {:.2} dB ({:.1}s)",
                    count,
                    level,
                    elapsed.as_secs_f64()
                );
                telemetry::hub().record_reversal(count, level, elapsed.as_secs_f64());
            }
            SamplerEvent::Debounced { since_last } => {
                debug!(
                    "[TrackingRun] Reversal candidate {}ms after the last one ignored",
                    since_last.as_millis()
                );
                telemetry::hub().record_reversal_debounced(since_last.as_millis() as u64);
            }
            SamplerEvent::Unchanged => {}
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

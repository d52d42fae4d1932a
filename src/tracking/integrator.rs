// Level integrator - rate-based noise level advancement
//
// Each processed tick moves the level by `rate * dt` in the current
// direction. The rate is coarse until enough reversals have bracketed the
// listener's criterion, then drops to the precision rate. `dt` is the real
// time since the previous processed tick, not the nominal cadence.

use crate::config::TrackingConfig;
use crate::tracking::state::RunState;

#[derive(Debug, Clone, Copy)]
pub struct LevelIntegrator {
    warm_rate: f64,
    precision_rate: f64,
    warm_reversal_threshold: u32,
    level_min: f64,
    level_max: f64,
}

impl LevelIntegrator {
    pub fn from_config(config: &TrackingConfig) -> Self {
        Self {
            warm_rate: config.warm_rate,
            precision_rate: config.precision_rate,
            warm_reversal_threshold: config.warm_reversal_threshold,
            level_min: config.level_min,
            level_max: config.level_max,
        }
    }

    /// Tracking speed in dB/second for the given reversal count
    pub fn rate_for(&self, reversal_count: u32) -> f64 {
        if reversal_count < self.warm_reversal_threshold {
            self.warm_rate
        } else {
            self.precision_rate
        }
    }

    /// Advance the level by one tick
    ///
    /// # Arguments
    /// * `state` - Run state; its level and rate are updated
    /// * `dt_seconds` - Measured time since the previous processed tick
    ///
    /// # Returns
    /// The new, clamped level
    pub fn advance(&self, state: &mut RunState, dt_seconds: f64) -> f64 {
        let rate = self.rate_for(state.reversal_count());
        let direction = if state.is_increasing() { 1.0 } else { -1.0 };
        let delta = direction * rate * dt_seconds.max(0.0);
        let level = (state.current_level() + delta).clamp(self.level_min, self.level_max);

        state.set_level(level, rate);
        state.current_level()
    }
}

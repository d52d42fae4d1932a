// Run state and tracking samples
//
// RunState is the only mutable state of a tracking run. It is owned by the
// run controller and mutated synchronously once per tick by the sampler and
// the integrator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One point of the tracked noise level over time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingSample {
    /// Seconds since run start
    pub t: f64,
    /// Noise level in display dB
    pub level: f64,
}

impl TrackingSample {
    pub fn new(t: f64, level: f64) -> Self {
        Self { t, level }
    }
}

/// Mutable state of one tracking run
#[derive(Debug, Clone)]
pub struct RunState {
    current_level: f64,
    is_increasing: bool,
    reversal_levels: Vec<f64>,
    rate_per_second: f64,
    last_reversal_at: Option<Duration>,
    is_finished: bool,
}

impl RunState {
    /// Create a fresh state travelling upward from `initial_level`
    ///
    /// # Arguments
    /// * `initial_level` - Starting noise level, already clamped by the caller
    /// * `initial_rate` - Tracking speed before any reversal (dB/second)
    pub fn new(initial_level: f64, initial_rate: f64) -> Self {
        Self {
            current_level: initial_level,
            is_increasing: true,
            reversal_levels: Vec::new(),
            rate_per_second: initial_rate,
            last_reversal_at: None,
            is_finished: false,
        }
    }

    pub fn current_level(&self) -> f64 {
        self.current_level
    }

    pub fn is_increasing(&self) -> bool {
        self.is_increasing
    }

    /// Number of confirmed reversals; always equals `reversal_levels().len()`
    pub fn reversal_count(&self) -> u32 {
        self.reversal_levels.len() as u32
    }

    pub fn reversal_levels(&self) -> &[f64] {
        &self.reversal_levels
    }

    pub fn rate_per_second(&self) -> f64 {
        self.rate_per_second
    }

    pub fn last_reversal_at(&self) -> Option<Duration> {
        self.last_reversal_at
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    /// Record a confirmed reversal at the current level and flip direction
    pub(crate) fn confirm_reversal(&mut self, now: Duration, increasing: bool) {
        if self.is_finished {
            return;
        }
        self.reversal_levels.push(self.current_level);
        self.last_reversal_at = Some(now);
        self.is_increasing = increasing;
    }

    pub(crate) fn set_level(&mut self, level: f64, rate: f64) {
        if self.is_finished {
            return;
        }
        self.current_level = level;
        self.rate_per_second = rate;
    }

    /// Latch the finished flag
    ///
    /// # Returns
    /// `true` for the first caller only
    pub(crate) fn mark_finished(&mut self) -> bool {
        if self.is_finished {
            return false;
        }
        self.is_finished = true;
        true
    }
}

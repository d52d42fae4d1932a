//! Diagnostics telemetry collector and helpers.
//!
//! The collector keeps a bounded history of tracking events (reversals,
//! debounced candidates, rate changes, run completion) and re-publishes them
//! on a broadcast channel for live diagnostics.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::metrics::StopReason;

pub mod events;

pub use events::MetricEvent;

/// Global telemetry hub shared across the crate.
static HUB: Lazy<TelemetryHub> = Lazy::new(TelemetryHub::default);

/// Access the global telemetry hub.
pub fn hub() -> &'static TelemetryHub {
    &HUB
}

/// Diagnostics only; a poisoned lock still holds usable data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-kind event tallies since the collector was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCounts {
    pub reversals: u64,
    pub debounced_reversals: u64,
    pub rate_changes: u64,
    pub forced_releases: u64,
    pub runs_finished: u64,
    pub degraded_results: u64,
}

impl EventCounts {
    fn tally(&mut self, event: &MetricEvent) {
        match event {
            MetricEvent::Reversal { .. } => self.reversals += 1,
            MetricEvent::ReversalDebounced { .. } => self.debounced_reversals += 1,
            MetricEvent::RateChanged { .. } => self.rate_changes += 1,
            MetricEvent::ForcedRelease { .. } => self.forced_releases += 1,
            MetricEvent::RunFinished { .. } => self.runs_finished += 1,
            MetricEvent::MetricsDegraded { .. } => self.degraded_results += 1,
            MetricEvent::ReversalSwing { .. } => {}
        }
    }
}

/// Point-in-time view of the collector, written out by `hant_cli simulate --telemetry-out`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub counts: EventCounts,
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    /// Events that fell out of the recent window
    pub evicted_events: u64,
}

struct EventLog {
    recent: VecDeque<MetricEvent>,
    capacity: usize,
    counts: EventCounts,
    total: u64,
    evicted: u64,
}

/// Tallies tracking events, keeps the most recent ones and fans them out live.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    log: Mutex<EventLog>,
}

impl TelemetryCollector {
    pub fn new(channel_capacity: usize, recent_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(channel_capacity.max(1));
        let log = EventLog {
            recent: VecDeque::with_capacity(recent_capacity),
            capacity: recent_capacity,
            counts: EventCounts::default(),
            total: 0,
            evicted: 0,
        };
        Self {
            tx,
            log: Mutex::new(log),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        {
            let mut log = lock(&self.log);
            log.total += 1;
            log.counts.tally(&event);
            if log.capacity == 0 {
                log.evicted += 1;
            } else {
                if log.recent.len() == log.capacity {
                    log.recent.pop_front();
                    log.evicted += 1;
                }
                log.recent.push_back(event.clone());
            }
        }

        // No subscribers is the normal case outside diagnostics
        let _ = self.tx.send(event);
    }

    /// Live feed of every event published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let log = lock(&self.log);
        TelemetrySnapshot {
            counts: log.counts,
            recent: log.recent.iter().cloned().collect(),
            total_events: log.total,
            evicted_events: log.evicted,
        }
    }
}

/// Rolling window over the swing between consecutive reversal levels.
struct SwingTracker {
    swings: VecDeque<f64>,
    max_swings: usize,
    last_level: Option<f64>,
}

impl SwingTracker {
    fn new(max_swings: usize) -> Self {
        Self {
            swings: VecDeque::with_capacity(max_swings),
            max_swings,
            last_level: None,
        }
    }

    fn reset(&mut self) {
        self.swings.clear();
        self.last_level = None;
    }

    /// Returns (avg, max, count) once at least one swing is known
    fn observe(&mut self, level: f64) -> Option<(f64, f64, usize)> {
        let previous = self.last_level.replace(level)?;
        if self.swings.len() == self.max_swings {
            self.swings.pop_front();
        }
        self.swings.push_back((level - previous).abs());

        let count = self.swings.len();
        let sum: f64 = self.swings.iter().sum();
        let max = self.swings.iter().copied().fold(0.0_f64, f64::max);
        Some((sum / count as f64, max, count))
    }
}

/// Top-level hub wrapping collector state plus derived gauges.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    swings: Mutex<SwingTracker>,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize, swing_window: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
            swings: Mutex::new(SwingTracker::new(swing_window)),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.collector.snapshot()
    }

    /// Record a confirmed reversal; the first reversal of a run resets the swing window
    pub fn record_reversal(&self, count: u32, level: f64, t: f64) {
        self.collector
            .publish(MetricEvent::Reversal { count, level, t });

        let swing = {
            let mut tracker = lock(&self.swings);
            if count <= 1 {
                tracker.reset();
            }
            tracker.observe(level)
        };

        if let Some((avg_db, max_db, sample_count)) = swing {
            self.collector.publish(MetricEvent::ReversalSwing {
                avg_db,
                max_db,
                sample_count,
            });
        }
    }

    pub fn record_reversal_debounced(&self, since_last_ms: u64) {
        self.collector
            .publish(MetricEvent::ReversalDebounced { since_last_ms });
    }

    pub fn record_rate_changed(&self, rate: f64, reversal_count: u32) {
        self.collector.publish(MetricEvent::RateChanged {
            rate,
            reversal_count,
        });
    }

    pub fn record_forced_release(&self) {
        self.collector.publish(MetricEvent::ForcedRelease {
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_run_finished(&self, stop_reason: StopReason, score: f64) {
        self.collector
            .publish(MetricEvent::RunFinished { stop_reason, score });
    }

    pub fn record_metrics_degraded(&self, error: impl Into<String>) {
        self.collector.publish(MetricEvent::MetricsDegraded {
            error: error.into(),
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64, 16)
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// BroadcastChannelManager: Centralized tokio broadcast channel management
// Single Responsibility: Broadcast channel lifecycle and subscription

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::managers::session_manager::SlotResult;
use crate::tracking::TrackingSample;

/// Tracking samples buffered per subscriber (about 50 s of 100 ms ticks)
pub const SAMPLE_CHANNEL_CAPACITY: usize = 512;
/// Finished results buffered per subscriber
pub const RESULT_CHANNEL_CAPACITY: usize = 8;

/// Manages the tokio broadcast channels a session publishes on
///
/// # Channel Types
/// - Samples: every tracking sample as it is appended, for live charts
/// - Results: every finished run, tagged with its test slot
pub struct BroadcastChannelManager {
    samples: Arc<Mutex<Option<broadcast::Sender<TrackingSample>>>>,
    results: Arc<Mutex<Option<broadcast::Sender<SlotResult>>>>,
}

impl BroadcastChannelManager {
    /// Create a new BroadcastChannelManager with all channels uninitialized
    ///
    /// Channels must be explicitly initialized via init_* methods before use.
    pub fn new() -> Self {
        Self {
            samples: Arc::new(Mutex::new(None)),
            results: Arc::new(Mutex::new(None)),
        }
    }

    // ========================================================================
    // SAMPLE CHANNEL
    // ========================================================================

    /// Initialize the sample channel, replacing any previous one
    ///
    /// Subscribers of a replaced channel see it close.
    pub fn init_samples(&self) -> broadcast::Sender<TrackingSample> {
        let (tx, _) = broadcast::channel(SAMPLE_CHANNEL_CAPACITY);
        *lock(&self.samples) = Some(tx.clone());
        tx
    }

    /// Current sample sender, if initialized
    pub fn sample_sender(&self) -> Option<broadcast::Sender<TrackingSample>> {
        lock(&self.samples).clone()
    }

    /// Subscribe to tracking samples
    ///
    /// # Returns
    /// `None` if init_samples() was not called yet
    pub fn subscribe_samples(&self) -> Option<broadcast::Receiver<TrackingSample>> {
        lock(&self.samples).as_ref().map(|tx| tx.subscribe())
    }

    /// Tracking samples as a `Stream` for charting collaborators
    ///
    /// Lagged subscribers receive `BroadcastStreamRecvError::Lagged` items.
    pub fn sample_stream(&self) -> Option<BroadcastStream<TrackingSample>> {
        self.subscribe_samples().map(BroadcastStream::new)
    }

    // ========================================================================
    // RESULT CHANNEL
    // ========================================================================

    pub fn init_results(&self) -> broadcast::Sender<SlotResult> {
        let (tx, _) = broadcast::channel(RESULT_CHANNEL_CAPACITY);
        *lock(&self.results) = Some(tx.clone());
        tx
    }

    pub fn result_sender(&self) -> Option<broadcast::Sender<SlotResult>> {
        lock(&self.results).clone()
    }

    pub fn subscribe_results(&self) -> Option<broadcast::Receiver<SlotResult>> {
        lock(&self.results).as_ref().map(|tx| tx.subscribe())
    }

    pub fn result_stream(&self) -> Option<BroadcastStream<SlotResult>> {
        self.subscribe_results().map(BroadcastStream::new)
    }
}

impl Default for BroadcastChannelManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Channel slots hold no invariants, so a poisoned lock is still usable
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

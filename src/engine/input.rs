//! Held/released control input.
//!
//! The host wires its key or touch events into an `InputSignal`; the run
//! controller reads it once per frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub trait InputSignal: Send + Sync {
    /// Whether the decrease control is currently held
    fn is_held(&self) -> bool;
    /// Drop a held state the host can no longer observe (focus loss)
    fn force_release(&self);
}

/// Input shared between the host's event handlers and the run controller
#[derive(Debug, Clone, Default)]
pub struct SharedInput {
    held: Arc<AtomicBool>,
}

impl SharedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
    }

    pub fn set_held(&self, held: bool) {
        self.held.store(held, Ordering::SeqCst);
    }
}

impl InputSignal for SharedInput {
    fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    fn force_release(&self) {
        self.release();
    }
}

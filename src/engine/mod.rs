//! Engine module: the host-facing side of a tracking run.
//!
//! Trait seams for the clock (`clock`) and the held/released control
//! (`input`), the synchronous per-frame `RunController`, and an async tokio
//! driver for hosts that want the run scheduled for them.

pub mod clock;
pub mod controller;
pub mod driver;
pub mod input;

pub use clock::{StubTimeSource, SystemTimeSource, TimeSource};
pub use controller::RunController;
pub use driver::{drive_run, spawn_run, RunHandle, FRAMES_PER_TICK};
pub use input::{InputSignal, SharedInput};

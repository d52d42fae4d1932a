// Tracking - the adaptive noise-tracking loop
//
// One tick: the sampler reads the held state and may confirm a reversal, the
// integrator moves the level, a sample is appended and the convergence
// monitor decides whether the run is over.

pub mod convergence;
pub mod integrator;
pub mod run;
pub mod sampler;
pub mod state;

pub use convergence::{ConvergenceCheck, ConvergenceMonitor, TrendSnapshot};
pub use integrator::LevelIntegrator;
pub use run::{LiveSnapshot, TickOutcome, TrackingRun};
pub use sampler::{SamplerEvent, SignalSampler};
pub use state::{RunState, TrackingSample};

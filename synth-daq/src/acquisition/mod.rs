//! Trigger-driven two-channel capture

pub mod acq_loop;
pub mod backend;
pub mod budget;
pub mod clock;
pub mod simulated;

pub use acq_loop::{AcquisitionLoop, ChannelSinks, Counters, CycleTiming, LoopSettings, SampleSink};
pub use backend::{AcquisitionBackend, Channel, TriggerSource};
pub use budget::TimingBudget;
pub use clock::{Clock, MonotonicClock, ScriptedClock};
pub use simulated::{BackendStats, SimulatedBackend};

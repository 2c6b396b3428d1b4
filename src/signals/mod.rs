//! Signal generation: the per-tick engine, its throttle, and output sinks.

pub mod engine;
pub mod sink;
pub mod state_machine;

pub use engine::{SignalEngine, TickOutcome};
pub use sink::{ChannelSink, SignalSink, StatusSink, TracingSink};
pub use state_machine::{Lifecycle, SignalStateMachine};

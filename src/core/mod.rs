//! Core application primitives (orchestrator, clock)

pub mod clock;
pub mod runtime;

pub use clock::*;
pub use runtime::*;

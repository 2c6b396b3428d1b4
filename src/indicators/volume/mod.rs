//! Volume indicators

pub mod rel_volume;

pub use rel_volume::*;

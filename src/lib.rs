//! signalgen: real-time, rule-driven signal generation over streaming price bars.
//!
//! Pipeline: feed tick → candle aggregation → indicator snapshots → rule
//! evaluation → per-symbol cooldown → signal sinks.

pub mod candles;
pub mod common;
pub mod config;
pub mod core;
pub mod error;
pub mod indicators;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod rules;
pub mod services;
pub mod signals;

pub use error::{ConfigError, DataError, EngineError, FeedError, ValidationError};

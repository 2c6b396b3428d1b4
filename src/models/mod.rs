//! Shared data models spanning the engine layers.

pub mod candle;
pub mod indicators;
pub mod rule;
pub mod signal;
pub mod status;
pub mod watchlist;

pub use candle::{Candle, Tick, Timeframe, UnsupportedTimeframe};
pub use indicators::{IndicatorSnapshot, SnapshotPair};
pub use rule::{
    Condition, ConditionDefinition, Operand, OperandValue, Operator, Rule, RuleDefinition,
    SignalKind,
};
pub use signal::Signal;
pub use status::EngineStatus;
pub use watchlist::{Watchlist, MAX_WATCHLIST_SYMBOLS};

//! Tick to candle aggregation.

pub mod aggregator;

pub use aggregator::{CandleAggregator, SEEN_TIMESTAMPS_CAPACITY};

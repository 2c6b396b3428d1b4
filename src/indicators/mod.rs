//! Technical indicators over completed candles.

pub mod calculator;
pub mod registry;

pub mod momentum;
pub mod trend;
pub mod volatility;
pub mod volume;

pub use calculator::{IndicatorCalculator, DEFAULT_MAX_HISTORY};
pub use registry::*;

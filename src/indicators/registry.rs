//! Indicator vocabulary: identifiers, categories and lookbacks

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Indicator category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorCategory {
    Price,
    Trend,
    Momentum,
    Volatility,
    Volume,
}

/// Closed set of indicators a rule may reference.
///
/// Ordering follows declaration order, so snapshots iterate the same way
/// every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorId {
    Price,
    Volume,
    Ma5,
    Ma10,
    Ma20,
    Ma50,
    Ma200,
    Ema6,
    Ema9,
    Ema10,
    Ema12,
    Ema20,
    Ema26,
    Ema50,
    Ema200,
    Rsi14,
    Macd,
    MacdSignal,
    MacdHist,
    Adx5,
    Adx14,
    Atr14,
    BbUpper,
    BbMiddle,
    BbLower,
    #[serde(rename = "REL_VOLUME_20")]
    RelVolume20,
    PriceEma20DiffPct,
}

/// Suffix that turns an indicator name into a previous-snapshot reference.
pub const PREVIOUS_SUFFIX: &str = "_PREV";

impl IndicatorId {
    pub const ALL: [IndicatorId; 27] = [
        IndicatorId::Price,
        IndicatorId::Volume,
        IndicatorId::Ma5,
        IndicatorId::Ma10,
        IndicatorId::Ma20,
        IndicatorId::Ma50,
        IndicatorId::Ma200,
        IndicatorId::Ema6,
        IndicatorId::Ema9,
        IndicatorId::Ema10,
        IndicatorId::Ema12,
        IndicatorId::Ema20,
        IndicatorId::Ema26,
        IndicatorId::Ema50,
        IndicatorId::Ema200,
        IndicatorId::Rsi14,
        IndicatorId::Macd,
        IndicatorId::MacdSignal,
        IndicatorId::MacdHist,
        IndicatorId::Adx5,
        IndicatorId::Adx14,
        IndicatorId::Atr14,
        IndicatorId::BbUpper,
        IndicatorId::BbMiddle,
        IndicatorId::BbLower,
        IndicatorId::RelVolume20,
        IndicatorId::PriceEma20DiffPct,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IndicatorId::Price => "PRICE",
            IndicatorId::Volume => "VOLUME",
            IndicatorId::Ma5 => "MA5",
            IndicatorId::Ma10 => "MA10",
            IndicatorId::Ma20 => "MA20",
            IndicatorId::Ma50 => "MA50",
            IndicatorId::Ma200 => "MA200",
            IndicatorId::Ema6 => "EMA6",
            IndicatorId::Ema9 => "EMA9",
            IndicatorId::Ema10 => "EMA10",
            IndicatorId::Ema12 => "EMA12",
            IndicatorId::Ema20 => "EMA20",
            IndicatorId::Ema26 => "EMA26",
            IndicatorId::Ema50 => "EMA50",
            IndicatorId::Ema200 => "EMA200",
            IndicatorId::Rsi14 => "RSI14",
            IndicatorId::Macd => "MACD",
            IndicatorId::MacdSignal => "MACD_SIGNAL",
            IndicatorId::MacdHist => "MACD_HIST",
            IndicatorId::Adx5 => "ADX5",
            IndicatorId::Adx14 => "ADX14",
            IndicatorId::Atr14 => "ATR14",
            IndicatorId::BbUpper => "BB_UPPER",
            IndicatorId::BbMiddle => "BB_MIDDLE",
            IndicatorId::BbLower => "BB_LOWER",
            IndicatorId::RelVolume20 => "REL_VOLUME_20",
            IndicatorId::PriceEma20DiffPct => "PRICE_EMA20_DIFF_PCT",
        }
    }

    /// Number of completed candles needed before the value is emitted.
    pub fn lookback(self) -> usize {
        match self {
            IndicatorId::Price | IndicatorId::Volume => 1,
            IndicatorId::Ma5 => 5,
            IndicatorId::Ma10 => 10,
            IndicatorId::Ma20 => 20,
            IndicatorId::Ma50 => 50,
            IndicatorId::Ma200 => 200,
            IndicatorId::Ema6 => 6,
            IndicatorId::Ema9 => 9,
            IndicatorId::Ema10 => 10,
            IndicatorId::Ema12 => 12,
            IndicatorId::Ema20 => 20,
            IndicatorId::Ema26 => 26,
            IndicatorId::Ema50 => 50,
            IndicatorId::Ema200 => 200,
            IndicatorId::Rsi14 => 15,
            IndicatorId::Macd => 26,
            IndicatorId::MacdSignal | IndicatorId::MacdHist => 34,
            IndicatorId::Adx5 => 10,
            IndicatorId::Adx14 => 28,
            IndicatorId::Atr14 => 15,
            IndicatorId::BbUpper | IndicatorId::BbMiddle | IndicatorId::BbLower => 20,
            IndicatorId::RelVolume20 => 21,
            IndicatorId::PriceEma20DiffPct => 20,
        }
    }

    pub fn category(self) -> IndicatorCategory {
        match self {
            IndicatorId::Price | IndicatorId::PriceEma20DiffPct => IndicatorCategory::Price,
            IndicatorId::Volume | IndicatorId::RelVolume20 => IndicatorCategory::Volume,
            IndicatorId::Ma5
            | IndicatorId::Ma10
            | IndicatorId::Ma20
            | IndicatorId::Ma50
            | IndicatorId::Ma200
            | IndicatorId::Ema6
            | IndicatorId::Ema9
            | IndicatorId::Ema10
            | IndicatorId::Ema12
            | IndicatorId::Ema20
            | IndicatorId::Ema26
            | IndicatorId::Ema50
            | IndicatorId::Ema200
            | IndicatorId::Adx5
            | IndicatorId::Adx14 => IndicatorCategory::Trend,
            IndicatorId::Rsi14
            | IndicatorId::Macd
            | IndicatorId::MacdSignal
            | IndicatorId::MacdHist => IndicatorCategory::Momentum,
            IndicatorId::Atr14
            | IndicatorId::BbUpper
            | IndicatorId::BbMiddle
            | IndicatorId::BbLower => IndicatorCategory::Volatility,
        }
    }

    /// Longest lookback in the vocabulary.
    pub fn max_lookback() -> usize {
        IndicatorId::ALL
            .iter()
            .map(|id| id.lookback())
            .max()
            .unwrap_or(1)
    }
}

impl fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        IndicatorId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown indicator: {}", s))
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{IndicatorSnapshot, SignalKind};

/// A rule firing for one symbol on one completed candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub signal_kind: SignalKind,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub rule_id: String,
    pub rule_name: String,
    /// Snapshot the rule was evaluated against.
    pub indicators: IndicatorSnapshot,
}

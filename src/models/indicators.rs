use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::indicators::IndicatorId;

/// Indicator values computed after one completed candle.
///
/// A missing entry means the symbol has not seen enough candles for that
/// indicator yet. It is never filled with zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub values: BTreeMap<IndicatorId, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
}

impl IndicatorSnapshot {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            values: BTreeMap::new(),
            as_of: Some(as_of),
        }
    }

    pub fn get(&self, id: IndicatorId) -> Option<f64> {
        self.values.get(&id).copied()
    }

    /// Stores `value` if it is finite. Non-finite results are dropped.
    pub fn insert(&mut self, id: IndicatorId, value: f64) {
        if value.is_finite() {
            self.values.insert(id, value);
        }
    }

    pub fn insert_opt(&mut self, id: IndicatorId, value: Option<f64>) {
        if let Some(v) = value {
            self.insert(id, v);
        }
    }

    pub fn contains(&self, id: IndicatorId) -> bool {
        self.values.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn with_value(mut self, id: IndicatorId, value: f64) -> Self {
        self.insert(id, value);
        self
    }
}

/// The two most recent snapshots for a symbol.
///
/// `previous` was computed exactly one completed candle before `current`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPair {
    pub current: IndicatorSnapshot,
    pub previous: IndicatorSnapshot,
}

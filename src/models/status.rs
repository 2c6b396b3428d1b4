use serde::{Deserialize, Serialize};

use super::Timeframe;

/// Externally observable engine state, reported on every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub is_running: bool,
    pub is_connected: bool,
    pub active_symbols: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
    pub reconnect_attempts: u32,
    pub timeframe: Timeframe,
}

impl EngineStatus {
    pub fn stopped(timeframe: Timeframe) -> Self {
        Self {
            is_running: false,
            is_connected: false,
            active_symbols: Vec::new(),
            degraded_reason: None,
            reconnect_attempts: 0,
            timeframe,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded_reason.is_some()
    }
}

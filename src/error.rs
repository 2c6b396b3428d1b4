//! Error taxonomy for the signal pipeline.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::Timeframe;

/// A rule definition that cannot be activated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid rule JSON: {0}")]
    InvalidJson(String),

    #[error("Rule name must not be empty")]
    EmptyName,

    #[error("Unsupported logic operator: {0}")]
    UnsupportedLogic(String),

    #[error("At least one condition is required")]
    EmptyConditions,

    #[error("Condition {index}: unsupported operand: {operand}")]
    UnknownOperand { index: usize, operand: String },

    #[error("Condition {index}: literal operand must be finite")]
    NonFiniteLiteral { index: usize },

    #[error("Condition {index}: unsupported operator: {operator}")]
    UnknownOperator { index: usize, operator: String },

    #[error("Condition {index}: previous-value operands cannot be used with {operator}")]
    PreviousInCrossover { index: usize, operator: String },

    #[error("Cooldown must be a positive duration, got {0}s")]
    NonPositiveCooldown(i64),

    #[error("Cooldown of {0}s is out of range")]
    CooldownOutOfRange(i64),
}

/// A tick or candle rejected on the ingestion path. Never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("Malformed bar for {symbol}: {reason}")]
    Malformed { symbol: String, reason: String },

    #[error("Duplicate timestamp for {symbol}: {timestamp}")]
    Duplicate {
        symbol: String,
        timestamp: DateTime<Utc>,
    },

    #[error("Stale data for {symbol}: {timestamp} is not newer than {boundary}")]
    Stale {
        symbol: String,
        timestamp: DateTime<Utc>,
        boundary: DateTime<Utc>,
    },

    #[error("Symbol {0} is not on the active watchlist")]
    UnknownSymbol(String),

    #[error("Candle timeframe {found} does not match active timeframe {expected}")]
    TimeframeMismatch { expected: Timeframe, found: Timeframe },
}

impl DataError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            DataError::Malformed { .. } => "malformed",
            DataError::Duplicate { .. } => "duplicate",
            DataError::Stale { .. } => "stale",
            DataError::UnknownSymbol(_) => "unknown_symbol",
            DataError::TimeframeMismatch { .. } => "timeframe_mismatch",
        }
    }
}

/// Failures talking to the market data feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Feed unreachable: {0}")]
    Unreachable(String),

    #[error("Feed disconnected: {0}")]
    Disconnected(String),

    #[error("Feed protocol error: {0}")]
    Protocol(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid feed URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Failed to decode feed message: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("Failed to read rule file {path}: {source}")]
    RuleFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Rule file is invalid: {0}")]
    Rule(#[from] ValidationError),
}

/// Errors surfaced by the orchestrator's control operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine is already running")]
    AlreadyRunning,

    #[error("Cannot change timeframe while the engine is running")]
    TimeframeLocked,

    #[error("Invalid watchlist: {0}")]
    Watchlist(String),

    #[error("Rule validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Connection error: {0}")]
    Connection(#[from] FeedError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

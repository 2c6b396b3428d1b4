//! Environment configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::core::RuntimeConfig;
use crate::error::ConfigError;
use crate::models::{RuleDefinition, Timeframe, Watchlist};
use crate::rules::RuleEvaluator;

/// Deployment environment name, from `ENVIRONMENT` (default `sandbox`).
pub fn get_environment() -> String {
    env::var("ENVIRONMENT")
        .map(|v| v.trim().to_lowercase())
        .unwrap_or_else(|_| "sandbox".to_string())
}

/// Everything the `signal-engine` binary needs to run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub ws_url: String,
    pub http_url: String,
    pub watchlist: Watchlist,
    pub rule_path: Option<String>,
    pub runtime: RuntimeConfig,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let ws_url = required("FEED_WS_URL")?;
        let http_url = required("FEED_HTTP_URL")?;
        let symbols = required("SYMBOLS")?;
        let watchlist = Watchlist::parse(&symbols).map_err(|_| ConfigError::Invalid {
            key: "SYMBOLS",
            value: symbols.clone(),
        })?;

        let defaults = RuntimeConfig::default();
        let timeframe = parse_or("TIMEFRAME", get("TIMEFRAME"), defaults.timeframe)?;
        let max_reconnect_attempts = parse_or(
            "MAX_RECONNECT_ATTEMPTS",
            get("MAX_RECONNECT_ATTEMPTS"),
            defaults.max_reconnect_attempts,
        )?;
        let base_ms = parse_or(
            "RECONNECT_BASE_DELAY_MS",
            get("RECONNECT_BASE_DELAY_MS"),
            defaults.reconnect_base_delay.as_millis() as u64,
        )?;
        let max_ms = parse_or(
            "RECONNECT_MAX_DELAY_MS",
            get("RECONNECT_MAX_DELAY_MS"),
            defaults.reconnect_max_delay.as_millis() as u64,
        )?;
        let max_history = parse_or("INDICATOR_HISTORY", get("INDICATOR_HISTORY"), defaults.max_history)?;

        Ok(Self {
            ws_url,
            http_url,
            watchlist,
            rule_path: get("RULE_PATH"),
            runtime: RuntimeConfig {
                timeframe,
                max_reconnect_attempts,
                reconnect_base_delay: Duration::from_millis(base_ms),
                reconnect_max_delay: Duration::from_millis(max_ms),
                max_history,
            },
        })
    }

    /// Reads the rule at `RULE_PATH`, or the default scalping rule.
    pub fn load_rule(&self) -> Result<RuleDefinition, ConfigError> {
        let Some(path) = &self.rule_path else {
            return Ok(RuleDefinition::default_scalping());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::RuleFile {
            path: path.clone(),
            source,
        })?;
        let definition = RuleDefinition::from_json(&text)?;
        RuleEvaluator::validate(&definition)?;
        Ok(definition)
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}

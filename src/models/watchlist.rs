use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Upper bound on symbols streamed at once.
pub const MAX_WATCHLIST_SYMBOLS: usize = 5;

/// Ordered, de-duplicated set of upper-cased symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Watchlist {
    symbols: Vec<String>,
}

impl Watchlist {
    pub fn new<I, S>(symbols: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for raw in symbols {
            let symbol = raw.as_ref().trim().to_uppercase();
            if symbol.is_empty() {
                continue;
            }
            if !normalized.contains(&symbol) {
                normalized.push(symbol);
            }
        }

        if normalized.is_empty() {
            return Err(EngineError::Watchlist(
                "at least one symbol is required".to_string(),
            ));
        }
        if normalized.len() > MAX_WATCHLIST_SYMBOLS {
            return Err(EngineError::Watchlist(format!(
                "at most {} symbols are allowed, got {}",
                MAX_WATCHLIST_SYMBOLS,
                normalized.len()
            )));
        }

        Ok(Self { symbols: normalized })
    }

    /// Parses a comma-separated list such as `"aapl, msft"`.
    pub fn parse(list: &str) -> Result<Self, EngineError> {
        Self::new(list.split(','))
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl TryFrom<Vec<String>> for Watchlist {
    type Error = EngineError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Watchlist::new(value)
    }
}

impl From<Watchlist> for Vec<String> {
    fn from(value: Watchlist) -> Self {
        value.symbols
    }
}

//! MACD (Moving Average Convergence Divergence) indicator
//!
//! MACD = EMA(12) - EMA(26)
//! Signal = EMA(9) of MACD
//! Histogram = MACD - Signal

use crate::indicators::trend::Ema;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdValue {
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
        }
    }

    /// Feeds one close. The signal line only starts once MACD exists.
    pub fn update(&mut self, close: f64) -> MacdValue {
        let fast = self.fast.update(close);
        let slow = self.slow.update(close);
        let macd = fast.zip(slow).map(|(f, s)| f - s);
        let signal = macd.and_then(|m| self.signal.update(m));
        MacdValue {
            macd,
            signal,
            histogram: macd.zip(signal).map(|(m, s)| m - s),
        }
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new(12, 26, 9)
    }
}

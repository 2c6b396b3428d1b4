//! Bollinger Bands indicator
//!
//! Middle Band = SMA(period)
//! Upper/Lower Band = Middle ± multiplier × population standard deviation

use crate::indicators::trend::RollingWindow;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    window: RollingWindow,
    multiplier: f64,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64) -> Self {
        Self {
            window: RollingWindow::new(period),
            multiplier,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<BollingerBands> {
        self.window.push(close);
        let middle = self.window.mean()?;
        let std = self.window.std_dev()?;
        Some(BollingerBands {
            upper: middle + self.multiplier * std,
            middle,
            lower: middle - self.multiplier * std,
        })
    }
}

impl Default for Bollinger {
    fn default() -> Self {
        Self::new(20, 2.0)
    }
}

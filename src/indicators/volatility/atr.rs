//! ATR (Average True Range) indicator

use crate::common::math;

/// Wilder-smoothed true range. True range starts at the second candle.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    count: usize,
    seed_sum: f64,
    value: Option<f64>,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_close: None,
            count: 0,
            seed_sum: 0.0,
            value: None,
        }
    }

    pub fn update(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        let prev_close = self.prev_close.replace(close)?;
        let tr = math::true_range(high, low, prev_close);
        let n = self.period as f64;

        self.value = match self.value {
            Some(atr) => Some((atr * (n - 1.0) + tr) / n),
            None => {
                self.count += 1;
                self.seed_sum += tr;
                (self.count == self.period).then(|| self.seed_sum / n)
            }
        };
        self.value
    }
}

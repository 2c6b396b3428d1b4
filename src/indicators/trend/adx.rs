//! ADX (Average Directional Index) indicator
//!
//! Wilder's construction: +DM, -DM and true range are smoothed over
//! `period` bars, giving +DI/-DI and DX. ADX is the Wilder average of DX,
//! so the first value needs `2 * period` candles.

use crate::common::math;

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    prev: Option<(f64, f64, f64)>,
    // running sums until the first smoothed values exist
    seed_count: usize,
    tr_sum: f64,
    plus_dm_sum: f64,
    minus_dm_sum: f64,
    smoothed: Option<(f64, f64, f64)>,
    dx_count: usize,
    dx_sum: f64,
    value: Option<f64>,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev: None,
            seed_count: 0,
            tr_sum: 0.0,
            plus_dm_sum: 0.0,
            minus_dm_sum: 0.0,
            smoothed: None,
            dx_count: 0,
            dx_sum: 0.0,
            value: None,
        }
    }

    pub fn update(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        let Some((prev_high, prev_low, prev_close)) = self.prev.replace((high, low, close)) else {
            return None;
        };

        let tr = math::true_range(high, low, prev_close);
        let up_move = high - prev_high;
        let down_move = prev_low - low;
        let plus_dm = if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 };
        let minus_dm = if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 };

        let n = self.period as f64;
        let (s_tr, s_plus, s_minus) = match self.smoothed {
            Some((s_tr, s_plus, s_minus)) => (
                s_tr - s_tr / n + tr,
                s_plus - s_plus / n + plus_dm,
                s_minus - s_minus / n + minus_dm,
            ),
            None => {
                self.seed_count += 1;
                self.tr_sum += tr;
                self.plus_dm_sum += plus_dm;
                self.minus_dm_sum += minus_dm;
                if self.seed_count < self.period {
                    return None;
                }
                (self.tr_sum, self.plus_dm_sum, self.minus_dm_sum)
            }
        };
        self.smoothed = Some((s_tr, s_plus, s_minus));

        let dx = directional_index(s_tr, s_plus, s_minus);
        self.value = match self.value {
            Some(adx) => Some((adx * (n - 1.0) + dx) / n),
            None => {
                self.dx_count += 1;
                self.dx_sum += dx;
                (self.dx_count == self.period).then(|| self.dx_sum / n)
            }
        };
        self.value
    }
}

fn directional_index(tr: f64, plus_dm: f64, minus_dm: f64) -> f64 {
    if tr <= 0.0 {
        return 0.0;
    }
    let plus_di = 100.0 * plus_dm / tr;
    let minus_di = 100.0 * minus_dm / tr;
    let di_sum = plus_di + minus_di;
    if di_sum > 0.0 {
        100.0 * (plus_di - minus_di).abs() / di_sum
    } else {
        0.0
    }
}

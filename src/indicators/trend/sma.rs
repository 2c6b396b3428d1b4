//! Simple moving average over a fixed window

use std::collections::VecDeque;

use crate::common::math;

/// Fixed-size window with a running sum.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl RollingWindow {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            values: VecDeque::with_capacity(period + 1),
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;
        if self.values.len() > self.period {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.period
    }

    /// Mean of the window once it holds `period` values.
    pub fn mean(&self) -> Option<f64> {
        if !self.is_full() || self.period == 0 {
            return None;
        }
        Some(self.sum / self.period as f64)
    }

    /// Population standard deviation of a full window.
    pub fn std_dev(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        let values: Vec<f64> = self.values.iter().copied().collect();
        math::population_std(&values)
    }
}

/// Simple moving average over closes.
#[derive(Debug, Clone)]
pub struct Sma {
    window: RollingWindow,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self {
            window: RollingWindow::new(period),
        }
    }

    pub fn update(&mut self, close: f64) -> Option<f64> {
        self.window.push(close);
        self.window.mean()
    }
}

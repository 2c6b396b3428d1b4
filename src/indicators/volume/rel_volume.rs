//! Relative volume: current volume against the mean of the preceding bars.

use crate::indicators::trend::RollingWindow;

#[derive(Debug, Clone)]
pub struct RelativeVolume {
    preceding: RollingWindow,
}

impl RelativeVolume {
    pub fn new(period: usize) -> Self {
        Self {
            preceding: RollingWindow::new(period),
        }
    }

    /// `None` until `period` earlier volumes exist, or when their mean is 0.
    pub fn update(&mut self, volume: f64) -> Option<f64> {
        let ratio = self
            .preceding
            .mean()
            .filter(|mean| *mean > 0.0)
            .map(|mean| volume / mean);
        self.preceding.push(volume);
        ratio
    }
}

//! Batch statistics over price series.
//!
//! The indicator states compute incrementally; these functions are the
//! straightforward whole-series versions.

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Simple moving average of the last `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    mean(&values[values.len() - period..])
}

/// Exponential moving average seeded with the SMA of the first `period` values.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = mean(&values[..period])?;
    Some(
        values[period..]
            .iter()
            .fold(seed, |acc, v| alpha * v + (1.0 - alpha) * acc),
    )
}

/// Wilder's smoothing: seeded with the mean of the first `period` values,
/// then `avg = (avg * (period - 1) + v) / period`.
pub fn wilder(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let n = period as f64;
    let seed = mean(&values[..period])?;
    Some(values[period..].iter().fold(seed, |acc, v| (acc * (n - 1.0) + v) / n))
}

/// True range of a bar given the previous close.
pub fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    (high - low)
        .max((high - prev_close).abs())
        .max((low - prev_close).abs())
}

//! Moving average and standard deviation over a trailing window.
//!
//! Population standard deviation over n closing prices:
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n-1) / n)

use crate::domain::tick::Tick;

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance (divides by N), `None` for an empty slice.
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - m;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    Some(variance)
}

pub fn population_stddev(values: &[f64]) -> Option<f64> {
    population_variance(values).map(f64::sqrt)
}

pub fn mean_close(window: &[Tick]) -> Option<f64> {
    let closes: Vec<f64> = window.iter().map(|t| t.close).collect();
    mean(&closes)
}

pub fn stddev_close(window: &[Tick]) -> Option<f64> {
    let closes: Vec<f64> = window.iter().map(|t| t.close).collect();
    population_stddev(&closes)
}

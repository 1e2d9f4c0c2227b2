//! Bollinger Bands.
//!
//! - Middle: simple moving average over n periods
//! - Upper: middle + (k × stddev)
//! - Lower: middle - (k × stddev)
//!
//! Stddev is the population standard deviation (divides by N, not N-1).

use crate::domain::indicator::stddev::{mean_close, stddev_close};
use crate::domain::tick::Tick;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

pub fn bollinger(window: &[Tick], k: f64) -> Option<BollingerBands> {
    let middle = mean_close(window)?;
    let stddev = stddev_close(window)?;

    Some(BollingerBands {
        upper: middle + k * stddev,
        middle,
        lower: middle - k * stddev,
    })
}

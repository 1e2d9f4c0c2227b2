//! Technical indicators over a tick's trailing window.
//!
//! Every indicator is a pure function of the window ending at (and
//! including) the tick it is called on. Windows that reach back past the
//! start of the series yield `None` rather than a partial value.

pub mod bollinger;
pub mod stddev;
pub mod streak;

use std::fmt;

use crate::domain::tick::TickView;

pub use bollinger::BollingerBands;
pub use streak::{Direction, StreakStats};

/// Indicator identity + parameters, used to label output.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorType {
    Bollinger { period: usize, k: f64 },
    Streak {
        streak_length: usize,
        horizon: usize,
        direction: Direction,
        memory: usize,
    },
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Bollinger { period, k } => write!(f, "BOLLINGER({},{})", period, k),
            IndicatorType::Streak {
                streak_length,
                horizon,
                direction,
                memory,
            } => write!(
                f,
                "STREAK({},{},{},{})",
                streak_length, horizon, direction, memory
            ),
        }
    }
}

impl TickView<'_> {
    /// Mean close over the last `n` ticks.
    pub fn moving_average(&self, n: usize) -> Option<f64> {
        stddev::mean_close(self.window(n)?)
    }

    /// Population standard deviation of close over the last `n` ticks.
    pub fn std_dev(&self, n: usize) -> Option<f64> {
        stddev::stddev_close(self.window(n)?)
    }

    pub fn bollinger(&self, n: usize, k: f64) -> Option<BollingerBands> {
        bollinger::bollinger(self.window(n)?, k)
    }

    pub fn upper_band(&self, n: usize, k: f64) -> Option<f64> {
        self.bollinger(n, k).map(|b| b.upper)
    }

    pub fn lower_band(&self, n: usize, k: f64) -> Option<f64> {
        self.bollinger(n, k).map(|b| b.lower)
    }

    pub fn streak_indicator(
        &self,
        streak_length: usize,
        horizon: usize,
        direction: Direction,
        memory: usize,
    ) -> Option<StreakStats> {
        streak::streak_indicator(self, streak_length, horizon, direction, memory)
    }
}

//! Streak continuation indicator.
//!
//! Looks back over a tick's history, sampled every `horizon` ticks, for
//! runs of `streak_length` consecutive moves in one direction and counts how
//! often the following sample continued the run versus reversed it.

use std::fmt;
use std::str::FromStr;

use crate::domain::tick::TickView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn moved(self, from: f64, to: f64) -> bool {
        match self {
            Direction::Up => from < to,
            Direction::Down => from > to,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(format!("unknown direction '{other}' (expected up or down)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreakStats {
    /// Completed streaks followed by another move in the streak direction.
    pub up: usize,
    /// Completed streaks followed by a flat or opposite move.
    pub down: usize,
    /// `(up + down)` over the number of ticks in the look-back window.
    pub confidence: f64,
}

/// `memory == 0` means the whole history before `tick`. Returns `None`
/// when the look-back window is shorter than `streak_length` (or empty), or
/// when `horizon` is zero.
pub fn streak_indicator(
    tick: &TickView<'_>,
    streak_length: usize,
    horizon: usize,
    direction: Direction,
    memory: usize,
) -> Option<StreakStats> {
    let last = tick.index();
    let first = if memory == 0 {
        0
    } else {
        last.saturating_sub(memory)
    };
    let span = last - first;

    if span == 0 || span < streak_length || horizon == 0 {
        return None;
    }

    let sampled: Vec<f64> = tick.series().ticks()[first..last]
        .iter()
        .step_by(horizon)
        .map(|t| t.close)
        .collect();

    let mut up = 0;
    let mut down = 0;
    let mut streak = 0;

    for w in sampled.windows(3) {
        let (yesterday, today, tomorrow) = (w[0], w[1], w[2]);

        if direction.moved(yesterday, today) {
            streak += 1;
        } else {
            streak = 0;
        }

        if streak == streak_length {
            if direction.moved(today, tomorrow) {
                up += 1;
            } else {
                down += 1;
            }
        }
    }

    Some(StreakStats {
        up,
        down,
        confidence: (up + down) as f64 / span as f64,
    })
}

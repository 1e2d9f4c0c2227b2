//! Price ticks and the series that owns them.
//!
//! A [`Tick`] is one daily OHLCV bar. Ticks never point back at their
//! series; instead a [`TickView`] pairs a borrowed [`Series`] with an index,
//! which is all the indicator methods need to look at trailing history.

use chrono::NaiveDate;
use std::ops::Deref;

use crate::domain::error::BacktestError;

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub index: usize,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub adj_close: f64,
}

impl Tick {
    fn prices(&self) -> [f64; 5] {
        [self.open, self.high, self.low, self.close, self.adj_close]
    }
}

/// Ordered ticks for a single instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    symbol: String,
    ticks: Vec<Tick>,
}

impl Series {
    /// Builds a series, checking that indices run 0..n, dates never go
    /// backwards and every price is finite.
    pub fn new(symbol: impl Into<String>, ticks: Vec<Tick>) -> Result<Self, BacktestError> {
        let symbol = symbol.into();

        for (position, tick) in ticks.iter().enumerate() {
            if tick.index != position {
                return Err(BacktestError::invalid_input(format!(
                    "{symbol}: tick at position {position} has index {}",
                    tick.index
                )));
            }
            if tick.prices().iter().any(|p| !p.is_finite()) {
                return Err(BacktestError::invalid_input(format!(
                    "{symbol}: tick {position} has a non-finite price"
                )));
            }
        }

        if let Some(w) = ticks.windows(2).find(|w| w[1].date < w[0].date) {
            return Err(BacktestError::invalid_input(format!(
                "{symbol}: date {} at index {} precedes {}",
                w[1].date, w[1].index, w[0].date
            )));
        }

        Ok(Series { symbol, ticks })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    pub fn tick(&self, index: usize) -> Option<TickView<'_>> {
        (index < self.ticks.len()).then_some(TickView {
            series: self,
            index,
        })
    }

    pub fn first(&self) -> Option<TickView<'_>> {
        self.tick(0)
    }

    pub fn last(&self) -> Option<TickView<'_>> {
        self.len().checked_sub(1).and_then(|i| self.tick(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = TickView<'_>> + '_ {
        (0..self.ticks.len()).map(move |index| TickView {
            series: self,
            index,
        })
    }

    /// Closing prices of the whole series, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.ticks.iter().map(|t| t.close).collect()
    }
}

/// A tick seen from inside its series.
#[derive(Debug, Clone, Copy)]
pub struct TickView<'a> {
    series: &'a Series,
    index: usize,
}

impl<'a> TickView<'a> {
    pub fn series(&self) -> &'a Series {
        self.series
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn tick(&self) -> &'a Tick {
        &self.series.ticks[self.index]
    }

    /// The last `n` ticks up to and including this one, or `None` when the
    /// series does not reach back that far.
    pub fn window(&self, n: usize) -> Option<&'a [Tick]> {
        if n == 0 || n > self.index + 1 {
            return None;
        }
        Some(&self.series.ticks[self.index + 1 - n..=self.index])
    }
}

impl Deref for TickView<'_> {
    type Target = Tick;

    fn deref(&self) -> &Tick {
        self.tick()
    }
}

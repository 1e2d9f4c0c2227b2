//! Strategies: anything that turns a tick into an optional order.
//!
//! The engine only sees the [`Strategy`] trait. The built-in strategies
//! below cover the usual experiments: a passive benchmark, a Bollinger band
//! reversion rule, a streak follower and a rule driven by an auxiliary
//! dataset (e.g. patent filings).

use crate::domain::error::BacktestError;
use crate::domain::indicator::{Direction, IndicatorType};
use crate::domain::position::Order;
use crate::domain::tick::TickView;
use crate::ports::dataset_port::AuxiliaryDataset;

pub trait Strategy {
    fn name(&self) -> &str;

    fn decide(&mut self, tick: &TickView<'_>) -> Result<Option<Order>, BacktestError>;

    /// Indicators this strategy reads, for display.
    fn indicators(&self) -> Vec<IndicatorType> {
        Vec::new()
    }
}

impl std::fmt::Debug for dyn Strategy + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name()).finish()
    }
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn decide(&mut self, tick: &TickView<'_>) -> Result<Option<Order>, BacktestError> {
        (**self).decide(tick)
    }

    fn indicators(&self) -> Vec<IndicatorType> {
        (**self).indicators()
    }
}

/// A named closure.
pub struct SignalFn<F> {
    name: String,
    f: F,
}

impl<F> SignalFn<F>
where
    F: FnMut(&TickView<'_>) -> Option<Order>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        SignalFn {
            name: name.into(),
            f,
        }
    }
}

impl<F> Strategy for SignalFn<F>
where
    F: FnMut(&TickView<'_>) -> Option<Order>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn decide(&mut self, tick: &TickView<'_>) -> Result<Option<Order>, BacktestError> {
        Ok((self.f)(tick))
    }
}

/// Buys on the first tick and never exits.
#[derive(Debug, Clone, Default)]
pub struct BuyAndHold;

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "Hold"
    }

    fn decide(&mut self, tick: &TickView<'_>) -> Result<Option<Order>, BacktestError> {
        Ok((tick.index() == 0).then_some(Order::Buy))
    }
}

/// Buys below the lower band, sells above the upper band.
#[derive(Debug, Clone)]
pub struct BollingerReversion {
    pub period: usize,
    pub k: f64,
}

impl Strategy for BollingerReversion {
    fn name(&self) -> &str {
        "Bollinger"
    }

    fn decide(&mut self, tick: &TickView<'_>) -> Result<Option<Order>, BacktestError> {
        let Some(bands) = tick.bollinger(self.period, self.k) else {
            return Ok(None);
        };

        if tick.close < bands.lower {
            Ok(Some(Order::Buy))
        } else if tick.close > bands.upper {
            Ok(Some(Order::Sell))
        } else {
            Ok(None)
        }
    }

    fn indicators(&self) -> Vec<IndicatorType> {
        vec![IndicatorType::Bollinger {
            period: self.period,
            k: self.k,
        }]
    }
}

/// Trades on a completed streak, following whichever outcome (continuation
/// or reversal) has been more common in the tick's history.
#[derive(Debug, Clone)]
pub struct StreakFollower {
    pub streak_length: usize,
    pub horizon: usize,
    pub direction: Direction,
    pub memory: usize,
}

impl StreakFollower {
    /// True when the last `streak_length` sampled moves ending at `tick` all
    /// went in the streak direction.
    fn in_streak(&self, tick: &TickView<'_>) -> bool {
        let reach = self.streak_length * self.horizon;
        if self.streak_length == 0 || self.horizon == 0 || reach > tick.index() {
            return false;
        }

        let ticks = tick.series().ticks();
        let samples: Vec<f64> = (0..=self.streak_length)
            .rev()
            .map(|k| ticks[tick.index() - k * self.horizon].close)
            .collect();

        samples.windows(2).all(|w| match self.direction {
            Direction::Up => w[0] < w[1],
            Direction::Down => w[0] > w[1],
        })
    }
}

impl Strategy for StreakFollower {
    fn name(&self) -> &str {
        "Streak"
    }

    fn decide(&mut self, tick: &TickView<'_>) -> Result<Option<Order>, BacktestError> {
        if !self.in_streak(tick) {
            return Ok(None);
        }
        let Some(stats) = tick.streak_indicator(
            self.streak_length,
            self.horizon,
            self.direction,
            self.memory,
        ) else {
            return Ok(None);
        };

        let (follow, fade) = match self.direction {
            Direction::Up => (Order::Buy, Order::Sell),
            Direction::Down => (Order::Sell, Order::Buy),
        };

        let order = match stats.up.cmp(&stats.down) {
            std::cmp::Ordering::Greater => follow,
            std::cmp::Ordering::Less => fade,
            std::cmp::Ordering::Equal => Order::Close,
        };
        Ok(Some(order))
    }

    fn indicators(&self) -> Vec<IndicatorType> {
        vec![IndicatorType::Streak {
            streak_length: self.streak_length,
            horizon: self.horizon,
            direction: self.direction,
            memory: self.memory,
        }]
    }
}

/// Trades on the percent change of an auxiliary dataset field, looked up
/// `embargo_days` before each tick to avoid look-ahead.
pub struct DatasetThreshold {
    pub high: f64,
    pub low: f64,
    pub field: String,
    pub embargo_days: i64,
    pub dataset: Box<dyn AuxiliaryDataset>,
}

impl Strategy for DatasetThreshold {
    fn name(&self) -> &str {
        "Patent"
    }

    fn decide(&mut self, tick: &TickView<'_>) -> Result<Option<Order>, BacktestError> {
        let change = self
            .dataset
            .percent_change(tick.date, &self.field, self.embargo_days)?;

        Ok(match change {
            None => Some(Order::Close),
            Some(c) if c > self.high => Some(Order::Buy),
            Some(c) if c < self.low => Some(Order::Sell),
            Some(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tick::{Series, Tick};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn make_series(prices: &[f64]) -> Series {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let ticks = prices
            .iter()
            .enumerate()
            .map(|(i, &close)| Tick {
                index: i,
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
                adj_close: close,
            })
            .collect();
        Series::new("TEST", ticks).unwrap()
    }

    fn decisions<S: Strategy>(strategy: &mut S, series: &Series) -> Vec<Option<Order>> {
        series
            .iter()
            .map(|t| strategy.decide(&t).unwrap())
            .collect()
    }

    struct FixedChanges(HashMap<NaiveDate, f64>);

    impl AuxiliaryDataset for FixedChanges {
        fn value_at(&self, _date: NaiveDate, _field: &str) -> Result<Option<f64>, BacktestError> {
            Ok(None)
        }

        fn percent_change(
            &self,
            date: NaiveDate,
            _field: &str,
            embargo_days: i64,
        ) -> Result<Option<f64>, BacktestError> {
            Ok(self
                .0
                .get(&(date - chrono::Duration::days(embargo_days)))
                .copied())
        }
    }

    #[test]
    fn buy_and_hold_buys_once() {
        let series = make_series(&[1.0, 2.0, 3.0]);
        assert_eq!(
            decisions(&mut BuyAndHold, &series),
            vec![Some(Order::Buy), None, None]
        );
    }

    #[test]
    fn bollinger_waits_for_warmup_and_trades_outside_bands() {
        let series = make_series(&[10.0, 10.0, 10.0, 20.0, 10.0, 10.0, 1.0]);
        let mut strategy = BollingerReversion { period: 3, k: 1.0 };
        let out = decisions(&mut strategy, &series);

        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], None);
        assert_eq!(out[3], Some(Order::Sell));
        assert_eq!(out[6], Some(Order::Buy));
    }

    #[test]
    fn streak_follower_follows_continuations() {
        let series = make_series(&[1.0, 2.0, 3.0, 4.0, 3.0, 4.0, 5.0]);
        let mut strategy = StreakFollower {
            streak_length: 2,
            horizon: 1,
            direction: Direction::Up,
            memory: 0,
        };
        let out = decisions(&mut strategy, &series);

        // Index 6 closes a 2-up streak; history (1,2,3,4,3,4) saw one
        // continuation and no reversal.
        assert_eq!(out[6], Some(Order::Buy));
        assert_eq!(out[4], None);
    }

    #[test]
    fn streak_follower_fades_reversals() {
        let series = make_series(&[1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
        let mut strategy = StreakFollower {
            streak_length: 2,
            horizon: 1,
            direction: Direction::Up,
            memory: 0,
        };
        let out = decisions(&mut strategy, &series);
        assert_eq!(out[5], Some(Order::Sell));
    }

    #[test]
    fn dataset_threshold_rules() {
        let series = make_series(&[1.0, 1.0, 1.0, 1.0]);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let embargo = 365;
        let lagged = |i: i64| start + chrono::Duration::days(i) - chrono::Duration::days(embargo);

        let mut changes = HashMap::new();
        changes.insert(lagged(1), 5.0);
        changes.insert(lagged(2), -5.0);
        changes.insert(lagged(3), 0.0);

        let mut strategy = DatasetThreshold {
            high: 2.0,
            low: -2.0,
            field: "Utility_Patents_Issued".into(),
            embargo_days: embargo,
            dataset: Box::new(FixedChanges(changes)),
        };

        assert_eq!(
            decisions(&mut strategy, &series),
            vec![
                Some(Order::Close),
                Some(Order::Buy),
                Some(Order::Sell),
                None
            ]
        );
    }

    #[test]
    fn signal_fn_wraps_closure() {
        let series = make_series(&[1.0, 2.0]);
        let mut strategy = SignalFn::new("odd", |t: &TickView<'_>| {
            (t.index() % 2 == 1).then_some(Order::Close)
        });
        assert_eq!(strategy.name(), "odd");
        assert_eq!(decisions(&mut strategy, &series), vec![None, Some(Order::Close)]);
    }

    #[test]
    fn boxed_strategy_delegates() {
        let mut boxed: Box<dyn Strategy> = Box::new(BollingerReversion { period: 20, k: 2.0 });
        assert_eq!(boxed.name(), "Bollinger");
        assert_eq!(boxed.indicators().len(), 1);
        let series = make_series(&[1.0]);
        assert_eq!(boxed.decide(&series.tick(0).unwrap()).unwrap(), None);
    }
}

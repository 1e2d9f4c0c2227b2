//! Backtest engine and the result it produces.
//!
//! The engine walks a [`Series`] once, asking the strategy for a signal at
//! each tick and appending at most one trade per tick. Everything else
//! (position, P&L, returns, win rates) is derived on demand from the trade
//! log and the series, so any metric can be asked for "as of" any index.

use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::error::BacktestError;
use crate::domain::metrics::{self, DAILY, MONTHLY, QUARTERLY, WEEKLY, YEARLY};
use crate::domain::position::{Position, Side, Trade};
use crate::domain::strategy::Strategy;
use crate::domain::tick::Series;

/// Fee charged per executed trade, as a function of the absolute trade price.
#[derive(Clone)]
pub struct CostModel {
    fee: Arc<dyn Fn(f64) -> f64 + Send + Sync>,
}

impl CostModel {
    pub fn new<F>(fee: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        CostModel { fee: Arc::new(fee) }
    }

    pub fn zero() -> Self {
        CostModel::new(|_| 0.0)
    }

    /// `fixed + price * pct / 100` per trade.
    pub fn fixed_plus_pct(fixed: f64, pct: f64) -> Self {
        CostModel::new(move |price| fixed + price * pct / 100.0)
    }

    pub fn cost(&self, price: f64) -> f64 {
        (self.fee)(price)
    }
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel::zero()
    }
}

impl fmt::Debug for CostModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CostModel").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BacktestConfig {
    pub cost: CostModel,
}

/// Portfolio value (net P&L) recorded after each tick is processed.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub index: usize,
    pub date: NaiveDate,
    pub value: f64,
}

/// Trade-pair classification behind [`BacktestResult::trade_winrate`].
#[derive(Debug, Clone, PartialEq)]
pub struct TradeWinrate {
    pub winners: usize,
    pub losers: usize,
    /// Winners over the total number of trades, in percent.
    pub win_rate: f64,
    /// Sum of the price moves of classified pairs over the total number of
    /// trades.
    pub average_trade_return: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Backtest {
    config: BacktestConfig,
}

impl Backtest {
    pub fn new(config: BacktestConfig) -> Self {
        Backtest { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Runs `strategy` over `series`. Each call starts from an empty trade
    /// log; strategy errors are returned as-is.
    pub fn run<'a, S>(
        &self,
        series: &'a Series,
        strategy: &mut S,
    ) -> Result<BacktestResult<'a>, BacktestError>
    where
        S: Strategy + ?Sized,
    {
        let first = series
            .first()
            .ok_or_else(|| BacktestError::invalid_input(format!("{}: series is empty", series.symbol())))?;
        if first.close == 0.0 {
            return Err(BacktestError::invalid_input(format!(
                "{}: first close is zero",
                series.symbol()
            )));
        }

        info!(
            symbol = series.symbol(),
            strategy = strategy.name(),
            ticks = series.len(),
            "running backtest"
        );

        let mut result = BacktestResult {
            series,
            strategy_name: strategy.name().to_string(),
            cost: self.config.cost.clone(),
            trades: Vec::new(),
            history: Vec::with_capacity(series.len()),
        };

        for tick in series.iter() {
            let signal = strategy.decide(&tick)?;
            let position = result.position_at(tick.index());

            if let Some(side) = signal.and_then(|order| position.resolve(order)) {
                debug!(
                    index = tick.index(),
                    date = %tick.date,
                    side = %side,
                    close = tick.close,
                    "trade"
                );
                result.trades.push(Trade::at(side, &tick));
            }

            let value = result.net_pnl_at(tick.index());
            result.history.push(Snapshot {
                index: tick.index(),
                date: tick.date,
                value,
            });
        }

        info!(
            trades = result.trades.len(),
            net = result.net_pnl(),
            returns = result.returns(),
            "backtest complete"
        );

        Ok(result)
    }
}

/// Trade log and snapshot history of one run over a borrowed series.
#[derive(Debug, Clone)]
pub struct BacktestResult<'a> {
    series: &'a Series,
    strategy_name: String,
    cost: CostModel,
    trades: Vec<Trade>,
    history: Vec<Snapshot>,
}

impl<'a> BacktestResult<'a> {
    pub fn series(&self) -> &'a Series {
        self.series
    }

    pub fn symbol(&self) -> &str {
        self.series.symbol()
    }

    pub fn strategy_name(&self) -> &str {
        &self.strategy_name
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn history(&self) -> &[Snapshot] {
        &self.history
    }

    pub fn history_values(&self) -> Vec<f64> {
        self.history.iter().map(|s| s.value).collect()
    }

    pub fn last_index(&self) -> usize {
        self.series.len().saturating_sub(1)
    }

    fn clamp(&self, as_of: usize) -> usize {
        as_of.min(self.last_index())
    }

    fn trades_until(&self, as_of: usize) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(move |t| t.index <= as_of)
    }

    pub fn position_at(&self, as_of: usize) -> Position {
        Position::from_trades(&self.trades, as_of)
    }

    pub fn position(&self) -> Position {
        self.position_at(self.last_index())
    }

    pub fn trade_cost_at(&self, as_of: usize) -> f64 {
        self.trades_until(as_of)
            .map(|t| self.cost.cost(t.close.abs()))
            .sum()
    }

    pub fn trade_cost(&self) -> f64 {
        self.trade_cost_at(self.last_index())
    }

    /// Realised P&L: every leg counted at its close, no costs, no marking.
    pub fn gross_pnl_at(&self, as_of: usize) -> f64 {
        self.trades_until(as_of).map(Trade::cash_flow).sum()
    }

    pub fn gross_pnl(&self) -> f64 {
        self.gross_pnl_at(self.last_index())
    }

    /// Gross P&L less costs, with any open leg marked at the `as_of` close.
    pub fn net_pnl_at(&self, as_of: usize) -> f64 {
        let as_of = self.clamp(as_of);
        let close = self.series.ticks()[as_of].close;

        let mark = match self.position_at(as_of) {
            Position::Long => close,
            Position::Short => -close,
            Position::Flat => 0.0,
        };

        mark + self.gross_pnl_at(as_of) - self.trade_cost_at(as_of)
    }

    pub fn net_pnl(&self) -> f64 {
        self.net_pnl_at(self.last_index())
    }

    fn start_close(&self) -> f64 {
        self.series.ticks()[0].close
    }

    /// Net P&L as a percentage of the first close, rounded to 2 decimals.
    pub fn returns_at(&self, as_of: usize) -> f64 {
        metrics::round_to(self.net_pnl_at(as_of) / self.start_close() * 100.0, 2)
    }

    pub fn returns(&self) -> f64 {
        self.returns_at(self.last_index())
    }

    pub fn volatility(&self) -> f64 {
        metrics::volatility(&self.history_values())
    }

    pub fn average_annual_return_at(&self, as_of: usize) -> f64 {
        let as_of = self.clamp(as_of);
        let start = self.start_close();
        let ticks = self.series.ticks();

        metrics::average_annual_return(
            start,
            start + self.net_pnl_at(as_of),
            ticks[0].date,
            ticks[as_of].date,
        )
    }

    pub fn average_annual_return(&self) -> f64 {
        self.average_annual_return_at(self.last_index())
    }

    pub fn trade_stats(&self) -> TradeWinrate {
        let mut winners = 0;
        let mut losers = 0;
        let mut total_move = 0.0;

        for pair in self.trades.windows(2) {
            let (entry, exit) = (&pair[0], &pair[1]);
            let price_move = exit.close - entry.close;
            let held = self.position_at(entry.index);

            let won = match (held, price_move > 0.0) {
                (Position::Flat, _) => continue,
                (Position::Long, rose) => rose,
                (Position::Short, rose) => !rose,
            };
            if won {
                winners += 1;
            } else {
                losers += 1;
            }
            total_move += price_move;
        }

        // Denominator is the trade count, not the number of pairs.
        let (win_rate, average_trade_return) = if self.trades.is_empty() {
            (0.0, 0.0)
        } else {
            let n = self.trades.len() as f64;
            (winners as f64 / n * 100.0, total_move / n)
        };

        TradeWinrate {
            winners,
            losers,
            win_rate,
            average_trade_return,
        }
    }

    pub fn trade_winrate(&self) -> f64 {
        self.trade_stats().win_rate
    }

    pub fn winrate(&self, n: usize) -> f64 {
        metrics::winrate(&self.history_values(), n)
    }

    pub fn daily(&self) -> f64 {
        self.winrate(DAILY)
    }

    pub fn weekly(&self) -> f64 {
        self.winrate(WEEKLY)
    }

    pub fn monthly(&self) -> f64 {
        self.winrate(MONTHLY)
    }

    pub fn quarterly(&self) -> f64 {
        self.winrate(QUARTERLY)
    }

    pub fn yearly(&self) -> f64 {
        self.winrate(YEARLY)
    }

    /// Beta of the portfolio value against `benchmark` closes.
    pub fn beta(&self, benchmark: &Series) -> f64 {
        let portfolio = metrics::pct_changes(&self.history_values());
        let benchmark = metrics::pct_changes(&benchmark.closes());
        metrics::beta(&portfolio, &benchmark)
    }
}

impl fmt::Display for BacktestResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Backtest(trades={}, position={}, returns={:.2}, gross={:.2}, net={:.2})",
            self.trades.len(),
            self.position(),
            self.returns(),
            self.gross_pnl(),
            self.net_pnl()
        )
    }
}

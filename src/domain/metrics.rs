//! Performance statistics over a run's snapshot history.
//!
//! The free functions work on plain value slices so they can be checked in
//! isolation; [`Metrics`] gathers everything the CLI reports for one run.

use chrono::NaiveDate;

use super::backtest::{BacktestResult, TradeWinrate};
use super::indicator::stddev::{mean, population_stddev, population_variance};
use super::position::Position;
use super::tick::Series;

pub const DAILY: usize = 1;
pub const WEEKLY: usize = 7;
pub const MONTHLY: usize = 30;
pub const QUARTERLY: usize = 65;
pub const YEARLY: usize = 365;

const DAYS_PER_YEAR: f64 = 365.0;

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Step-over-step percent changes. Steps whose prior value is exactly zero
/// are dropped, not reported as zero.
pub fn pct_changes(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| 100.0 * (w[1] - w[0]) / w[0])
        .collect()
}

/// Population standard deviation of the percent changes; 0 when there are
/// none.
pub fn volatility(values: &[f64]) -> f64 {
    population_stddev(&pct_changes(values)).unwrap_or(0.0)
}

/// Share (in percent) of sampled periods whose absolute change is
/// non-negative. Values are sampled every `n` steps (`n == 0` is treated as
/// 1); periods starting from a zero value are skipped. Returns 0 when no
/// period qualifies.
pub fn winrate(values: &[f64], n: usize) -> f64 {
    let sampled: Vec<f64> = values.iter().copied().step_by(n.max(1)).collect();
    let changes: Vec<f64> = sampled
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] - w[0])
        .collect();

    if changes.is_empty() {
        return 0.0;
    }

    let winners = changes.iter().filter(|&&c| c >= 0.0).count();
    winners as f64 / changes.len() as f64 * 100.0
}

/// Sample covariance of the two change series over the benchmark's
/// population variance, rounded to 3 decimals. Both inputs are cut to the
/// shorter length first. Returns 0 with fewer than two points or a
/// benchmark with no variance.
pub fn beta(portfolio_changes: &[f64], benchmark_changes: &[f64]) -> f64 {
    let n = portfolio_changes.len().min(benchmark_changes.len());
    if n < 2 {
        return 0.0;
    }
    let portfolio = &portfolio_changes[..n];
    let benchmark = &benchmark_changes[..n];

    let (Some(mean_p), Some(mean_b), Some(variance)) = (
        mean(portfolio),
        mean(benchmark),
        population_variance(benchmark),
    ) else {
        return 0.0;
    };
    if variance == 0.0 {
        return 0.0;
    }

    let covariance = portfolio
        .iter()
        .zip(benchmark)
        .map(|(p, b)| (p - mean_p) * (b - mean_b))
        .sum::<f64>()
        / (n - 1) as f64;

    round_to(covariance / variance, 3)
}

/// Compound annual growth rate in percent. A span shorter than one day
/// counts as one year.
pub fn average_annual_return(
    start_value: f64,
    end_value: f64,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> f64 {
    let mut years = (end_date - start_date).num_days() as f64 / DAYS_PER_YEAR;
    if years == 0.0 {
        years = 1.0;
    }
    ((end_value / start_value).powf(1.0 / years) - 1.0) * 100.0
}

/// Summary of one run, as reported by the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_trades: usize,
    pub position: Position,
    pub gross_pnl: f64,
    pub trade_cost: f64,
    pub net_pnl: f64,
    pub returns: f64,
    pub volatility: f64,
    pub average_annual_return: f64,
    pub trade_winrate: TradeWinrate,
    pub daily_winrate: f64,
    pub weekly_winrate: f64,
    pub monthly_winrate: f64,
    pub quarterly_winrate: f64,
    pub yearly_winrate: f64,
    pub beta: Option<f64>,
}

impl Metrics {
    pub fn compute(result: &BacktestResult<'_>, benchmark: Option<&Series>) -> Self {
        Metrics {
            total_trades: result.trades().len(),
            position: result.position(),
            gross_pnl: result.gross_pnl(),
            trade_cost: result.trade_cost(),
            net_pnl: result.net_pnl(),
            returns: result.returns(),
            volatility: result.volatility(),
            average_annual_return: result.average_annual_return(),
            trade_winrate: result.trade_stats(),
            daily_winrate: result.daily(),
            weekly_winrate: result.weekly(),
            monthly_winrate: result.monthly(),
            quarterly_winrate: result.quarterly(),
            yearly_winrate: result.yearly(),
            beta: benchmark.map(|b| result.beta(b)),
        }
    }
}

//! Price source port trait.

use crate::domain::error::BacktestError;
use crate::domain::tick::Series;

pub trait PriceSource {
    /// Full price history for `symbol`, oldest first.
    fn fetch_series(&self, symbol: &str) -> Result<Series, BacktestError>;

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError>;
}

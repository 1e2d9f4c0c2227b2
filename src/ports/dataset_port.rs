//! Auxiliary dataset port trait.
//!
//! Strategies read point-in-time values from datasets such as monthly
//! patent filing counts. The engine never touches a dataset directly.

use crate::domain::error::BacktestError;
use chrono::NaiveDate;

pub trait AuxiliaryDataset {
    /// Value of `field` in the most recent row dated on or before `date`.
    fn value_at(&self, date: NaiveDate, field: &str) -> Result<Option<f64>, BacktestError>;

    /// Percent change of `field` between the two most recent rows strictly
    /// before `date - embargo_days`.
    fn percent_change(
        &self,
        date: NaiveDate,
        field: &str,
        embargo_days: i64,
    ) -> Result<Option<f64>, BacktestError>;
}

//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use std::path::Path;

/// Port for rendering a finished run.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult<'_>, output_path: &Path) -> Result<(), BacktestError>;
}

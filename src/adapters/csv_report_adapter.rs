//! CSV report: one row per tick with the values a chart of the run needs.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use crate::ports::report_port::ReportPort;
use std::path::Path;

const HEADER: [&str; 6] = ["date", "close", "position", "net_pnl", "returns", "trade"];

pub struct CsvReportAdapter;

fn report_error(e: csv::Error) -> BacktestError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => BacktestError::Io(io),
        other => BacktestError::Io(std::io::Error::other(format!("{:?}", other))),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult<'_>, output_path: &Path) -> Result<(), BacktestError> {
        let mut wtr = csv::Writer::from_path(output_path).map_err(report_error)?;
        wtr.write_record(HEADER).map_err(report_error)?;

        let trades = result.trades();
        for tick in result.series().iter() {
            let i = tick.index();
            let trade = trades
                .iter()
                .find(|t| t.index == i)
                .map(|t| t.side.to_string())
                .unwrap_or_default();

            wtr.write_record([
                tick.date.to_string(),
                tick.close.to_string(),
                result.position_at(i).numeric().to_string(),
                format!("{:.4}", result.net_pnl_at(i)),
                format!("{:.2}", result.returns_at(i)),
                trade,
            ])
            .map_err(report_error)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

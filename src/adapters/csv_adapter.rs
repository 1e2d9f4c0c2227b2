//! CSV file price source.
//!
//! One file per symbol, `<base_path>/<SYMBOL>.csv`, with a header row.
//! Columns are matched by name (case-insensitive, spaces read as `_`):
//! `date,open,high,low,close,volume` are required, `adj_close` (or
//! `adjusted_close`) is optional and defaults to `close`.

use crate::domain::error::BacktestError;
use crate::domain::tick::{Series, Tick};
use crate::ports::data_port::PriceSource;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvPriceSource {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    adj_close: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, BacktestError> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim().to_lowercase().replace(' ', "_"))
            .collect();
        let find = |name: &str| names.iter().position(|n| n == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| BacktestError::DataSource {
                reason: format!("missing {} column", name),
            })
        };

        Ok(Columns {
            date: require("date")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: require("volume")?,
            adj_close: find("adj_close").or_else(|| find("adjusted_close")),
        })
    }
}

fn field<'r>(record: &'r csv::StringRecord, idx: usize, name: &str) -> Result<&'r str, BacktestError> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| BacktestError::DataSource {
            reason: format!("missing {} value", name),
        })
}

fn price(record: &csv::StringRecord, idx: usize, name: &str) -> Result<f64, BacktestError> {
    field(record, idx, name)?
        .parse()
        .map_err(|e| BacktestError::DataSource {
            reason: format!("invalid {} value: {}", name, e),
        })
}

impl CsvPriceSource {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

impl PriceSource for CsvPriceSource {
    fn fetch_series(&self, symbol: &str) -> Result<Series, BacktestError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => BacktestError::NoData {
                symbol: symbol.to_string(),
            },
            _ => BacktestError::DataSource {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| BacktestError::DataSource {
            reason: format!("CSV header error: {}", e),
        })?;
        let columns = Columns::from_headers(headers)?;

        let mut ticks = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| BacktestError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date = NaiveDate::parse_from_str(field(&record, columns.date, "date")?, DATE_FORMAT)
                .map_err(|e| BacktestError::DataSource {
                    reason: format!("invalid date format: {}", e),
                })?;
            let close = price(&record, columns.close, "close")?;
            let adj_close = match columns.adj_close {
                Some(idx) => price(&record, idx, "adj_close")?,
                None => close,
            };
            let volume: i64 = field(&record, columns.volume, "volume")?
                .parse()
                .map_err(|e| BacktestError::DataSource {
                    reason: format!("invalid volume value: {}", e),
                })?;

            ticks.push(Tick {
                index: 0,
                date,
                open: price(&record, columns.open, "open")?,
                high: price(&record, columns.high, "high")?,
                low: price(&record, columns.low, "low")?,
                close,
                volume,
                adj_close,
            });
        }

        ticks.sort_by_key(|t| t.date);
        for (index, tick) in ticks.iter_mut().enumerate() {
            tick.index = index;
        }

        Series::new(symbol, ticks)
    }

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| BacktestError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| BacktestError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

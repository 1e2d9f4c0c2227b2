//! CSV-backed auxiliary dataset.
//!
//! The first column holds the row date, every other column a numeric
//! field. Field names are taken from the header with each run of
//! non-alphanumeric characters replaced by `_`, so "Utility Patents Issued"
//! becomes `Utility_Patents_Issued`. Rows without a date are skipped and
//! blank cells are missing values.

use crate::domain::error::BacktestError;
use crate::ports::dataset_port::AuxiliaryDataset;
use chrono::{NaiveDate, TimeDelta};
use std::fs;
use std::path::Path;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
struct Row {
    date: NaiveDate,
    values: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct CsvDataset {
    fields: Vec<String>,
    rows: Vec<Row>,
}

pub fn sanitize_field_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_gap = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            in_gap = false;
        } else if !in_gap {
            out.push('_');
            in_gap = true;
        }
    }
    out
}

fn dataset_error(reason: impl Into<String>) -> BacktestError {
    BacktestError::Dataset {
        reason: reason.into(),
    }
}

impl CsvDataset {
    pub fn from_file<P: AsRef<Path>>(path: P, date_format: &str) -> Result<Self, BacktestError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| dataset_error(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_string(&content, date_format)
    }

    pub fn from_string(content: &str, date_format: &str) -> Result<Self, BacktestError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| dataset_error(format!("CSV header error: {}", e)))?;
        let fields: Vec<String> = headers.iter().skip(1).map(sanitize_field_name).collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| dataset_error(format!("CSV parse error: {}", e)))?;

            let raw_date = record.get(0).map(str::trim).unwrap_or_default();
            if raw_date.is_empty() {
                continue;
            }
            // Spreadsheet exports often carry a time part.
            let day = raw_date.split(' ').next().unwrap_or(raw_date);
            let date = NaiveDate::parse_from_str(day, date_format).map_err(|e| {
                dataset_error(format!("invalid date '{}' for format {}: {}", raw_date, date_format, e))
            })?;

            let values = (1..=fields.len())
                .map(|idx| match record.get(idx).map(str::trim) {
                    None | Some("") => Ok(None),
                    Some(cell) => cell.parse::<f64>().map(Some).map_err(|e| {
                        dataset_error(format!("invalid value '{}' on {}: {}", cell, raw_date, e))
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;

            rows.push(Row { date, values });
        }

        rows.sort_by_key(|r| r.date);
        Ok(CsvDataset { fields, rows })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn field_index(&self, field: &str) -> Result<usize, BacktestError> {
        self.fields
            .iter()
            .position(|f| f == field)
            .ok_or_else(|| dataset_error(format!("unknown field {}", field)))
    }
}

impl AuxiliaryDataset for CsvDataset {
    fn value_at(&self, date: NaiveDate, field: &str) -> Result<Option<f64>, BacktestError> {
        let idx = self.field_index(field)?;
        let upto = self.rows.partition_point(|r| r.date <= date);
        Ok(upto
            .checked_sub(1)
            .and_then(|i| self.rows[i].values[idx]))
    }

    fn percent_change(
        &self,
        date: NaiveDate,
        field: &str,
        embargo_days: i64,
    ) -> Result<Option<f64>, BacktestError> {
        let idx = self.field_index(field)?;
        let cutoff = TimeDelta::try_days(embargo_days)
            .and_then(|lag| date.checked_sub_signed(lag))
            .ok_or_else(|| {
                dataset_error(format!("embargo of {} days from {} is out of range", embargo_days, date))
            })?;
        let before = self.rows.partition_point(|r| r.date < cutoff);
        if before < 2 {
            return Ok(None);
        }

        let latest = self.rows[before - 1].values[idx];
        let prior = self.rows[before - 2].values[idx];
        Ok(match (latest, prior) {
            (Some(latest), Some(prior)) if prior != 0.0 => Some((latest - prior) / prior * 100.0),
            _ => None,
        })
    }
}

#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use tickback::domain::error::BacktestError;
use tickback::domain::position::Order;
use tickback::domain::strategy::SignalFn;
pub use tickback::domain::tick::{Series, Tick, TickView};
use tickback::ports::data_port::PriceSource;

pub struct MockPriceSource {
    pub data: HashMap<String, Series>,
    pub errors: HashMap<String, String>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.data.insert(series.symbol().to_string(), series);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl PriceSource for MockPriceSource {
    fn fetch_series(&self, symbol: &str) -> Result<Series, BacktestError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BacktestError::DataSource {
                reason: reason.clone(),
            });
        }
        self.data
            .get(symbol)
            .cloned()
            .ok_or_else(|| BacktestError::NoData {
                symbol: symbol.to_string(),
            })
    }

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_tick(index: usize, date: NaiveDate, close: f64) -> Tick {
    Tick {
        index,
        date,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1000,
        adj_close: close,
    }
}

/// One tick per calendar day starting 2024-01-01.
pub fn make_series(symbol: &str, closes: &[f64]) -> Series {
    let start = date(2024, 1, 1);
    let ticks = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_tick(i, start + chrono::Duration::days(i as i64), close))
        .collect();
    Series::new(symbol, ticks).unwrap()
}

/// Emits the scripted order at each listed index, nothing elsewhere.
pub fn scripted(
    orders: Vec<(usize, Order)>,
) -> SignalFn<impl FnMut(&TickView<'_>) -> Option<Order>> {
    SignalFn::new("scripted", move |t: &TickView<'_>| {
        orders
            .iter()
            .find(|(i, _)| *i == t.index())
            .map(|(_, o)| *o)
    })
}

pub const PRICES_CSV_HEADER: &str = "date,open,high,low,close,volume,adj_close\n";

/// Writes `<dir>/<symbol>.csv` with one row per close, one day apart.
pub fn write_price_csv(dir: &std::path::Path, symbol: &str, closes: &[f64]) {
    let start = date(2024, 1, 1);
    let mut content = PRICES_CSV_HEADER.to_string();
    for (i, close) in closes.iter().enumerate() {
        let d = start + chrono::Duration::days(i as i64);
        content.push_str(&format!("{d},{close},{close},{close},{close},1000,{close}\n"));
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
}

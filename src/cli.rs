//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvPriceSource;
use crate::adapters::csv_dataset_adapter::{CsvDataset, DEFAULT_DATE_FORMAT};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{Backtest, BacktestConfig, BacktestResult, CostModel};
use crate::domain::config_validation::{
    strategy_type, validate_backtest_config, validate_cost_config, validate_strategy_config,
};
use crate::domain::error::BacktestError;
use crate::domain::indicator::Direction;
use crate::domain::metrics::Metrics;
use crate::domain::strategy::{
    BollingerReversion, BuyAndHold, DatasetThreshold, Strategy, StreakFollower,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceSource;
use crate::ports::report_port::ReportPort;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_DATASET_FIELD: &str = "Utility_Patents_Issued";

#[derive(Parser, Debug)]
#[command(name = "tickback", about = "Single-instrument strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest and print its metrics
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [backtest] symbol
        #[arg(long)]
        symbol: Option<String>,
        /// Write the per-tick curve as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the data range for a symbol
    Info {
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// List symbols with price files in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            symbol,
            output,
        } => run_backtest(&config, symbol.as_deref(), output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info {
            symbol,
            config,
            data_dir,
        } => run_info(symbol.as_deref(), config.as_deref(), data_dir),
        Command::ListSymbols { config, data_dir } => run_list_symbols(config.as_deref(), data_dir),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, BacktestError> {
    FileConfigAdapter::from_file(path).map_err(|e| BacktestError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub fn data_dir(config: &dyn ConfigPort) -> PathBuf {
    config
        .get_trimmed("data", "dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, BacktestError> {
    validate_cost_config(config)?;
    let fixed = config.get_double("backtest", "cost_fixed", 0.0);
    let pct = config.get_double("backtest", "cost_pct", 0.0);

    let cost = if fixed == 0.0 && pct == 0.0 {
        CostModel::zero()
    } else {
        CostModel::fixed_plus_pct(fixed, pct)
    };
    Ok(BacktestConfig { cost })
}

fn usize_value(config: &dyn ConfigPort, key: &str, default: i64) -> usize {
    config.get_int("strategy", key, default).max(0) as usize
}

fn threshold(config: &dyn ConfigPort, key: &str) -> Result<f64, BacktestError> {
    let raw = config
        .get_trimmed("strategy", key)
        .ok_or_else(|| BacktestError::ConfigMissing {
            section: "strategy".into(),
            key: key.into(),
        })?;
    raw.parse().map_err(|_| BacktestError::ConfigInvalid {
        section: "strategy".into(),
        key: key.into(),
        reason: format!("'{}' is not a number", raw),
    })
}

/// Loads the auxiliary dataset named by `[data] dataset`.
pub fn load_dataset(config: &dyn ConfigPort) -> Result<CsvDataset, BacktestError> {
    let path = config
        .get_trimmed("data", "dataset")
        .ok_or_else(|| BacktestError::ConfigMissing {
            section: "data".into(),
            key: "dataset".into(),
        })?;
    let date_format = config
        .get_trimmed("data", "dataset_date_format")
        .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());

    let dataset = CsvDataset::from_file(&path, &date_format)?;
    info!(path = %path, rows = dataset.len(), fields = dataset.fields().len(), "loaded dataset");
    Ok(dataset)
}

pub fn build_strategy(config: &dyn ConfigPort) -> Result<Box<dyn Strategy>, BacktestError> {
    validate_strategy_config(config)?;

    let strategy: Box<dyn Strategy> = match strategy_type(config)?.as_str() {
        "bollinger" => Box::new(BollingerReversion {
            period: usize_value(config, "period", 20),
            k: config.get_double("strategy", "k", 2.0),
        }),
        "streak" => {
            let direction = match config.get_trimmed("strategy", "direction") {
                Some(raw) => raw.parse::<Direction>().map_err(|reason| BacktestError::ConfigInvalid {
                    section: "strategy".into(),
                    key: "direction".into(),
                    reason,
                })?,
                None => Direction::Down,
            };
            Box::new(StreakFollower {
                streak_length: usize_value(config, "streak_length", 3),
                horizon: usize_value(config, "horizon", 1),
                direction,
                memory: usize_value(config, "memory", 0),
            })
        }
        "patent" => {
            let field = config
                .get_trimmed("strategy", "field")
                .unwrap_or_else(|| DEFAULT_DATASET_FIELD.to_string());
            let dataset = load_dataset(config)?;
            if !dataset.fields().iter().any(|f| *f == field) {
                return Err(BacktestError::ConfigInvalid {
                    section: "strategy".into(),
                    key: "field".into(),
                    reason: format!(
                        "dataset has no field '{}' (available: {})",
                        field,
                        dataset.fields().join(", ")
                    ),
                });
            }
            Box::new(DatasetThreshold {
                high: threshold(config, "high")?,
                low: threshold(config, "low")?,
                field,
                embargo_days: config.get_int("strategy", "embargo_days", 365),
                dataset: Box::new(dataset),
            })
        }
        _ => Box::new(BuyAndHold),
    };
    Ok(strategy)
}

pub fn resolve_symbol(symbol_override: Option<&str>, config: &dyn ConfigPort) -> Option<String> {
    symbol_override
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| config.get_trimmed("backtest", "symbol"))
        .map(|s| s.to_uppercase())
}

fn run_backtest(
    config_path: &Path,
    symbol_override: Option<&str>,
    output_path: Option<&Path>,
) -> Result<(), BacktestError> {
    info!(path = %config_path.display(), "loading config");
    let config = load_config(config_path)?;

    let symbol = resolve_symbol(symbol_override, &config).ok_or_else(|| {
        BacktestError::ConfigMissing {
            section: "backtest".into(),
            key: "symbol".into(),
        }
    })?;
    let bt_config = build_backtest_config(&config)?;
    let mut strategy = build_strategy(&config)?;
    let benchmark = config
        .get_trimmed("backtest", "benchmark")
        .map(|s| s.to_uppercase());

    let source = CsvPriceSource::new(data_dir(&config));
    run_backtest_pipeline(
        &source,
        strategy.as_mut(),
        bt_config,
        &symbol,
        benchmark.as_deref(),
        output_path,
    )?;
    Ok(())
}

/// Fetches prices, runs the strategy, prints the summary and optionally
/// writes the per-tick report. Returns the computed metrics.
pub fn run_backtest_pipeline(
    source: &dyn PriceSource,
    strategy: &mut dyn Strategy,
    bt_config: BacktestConfig,
    symbol: &str,
    benchmark: Option<&str>,
    output_path: Option<&Path>,
) -> Result<Metrics, BacktestError> {
    let series = source.fetch_series(symbol)?;

    // A missing benchmark only costs the beta line.
    let benchmark_series = match benchmark {
        Some(b) if b == symbol => Some(series.clone()),
        Some(b) => match source.fetch_series(b) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(benchmark = b, error = %e, "skipping beta");
                None
            }
        },
        None => None,
    };

    let engine = Backtest::new(bt_config);
    let result = engine.run(&series, strategy)?;
    let metrics = Metrics::compute(&result, benchmark_series.as_ref());

    print_summary(&result, &metrics, benchmark);

    if let Some(path) = output_path {
        CsvReportAdapter.write(&result, path)?;
        info!(path = %path.display(), "report written");
    }

    Ok(metrics)
}

fn print_summary(result: &BacktestResult<'_>, metrics: &Metrics, benchmark: Option<&str>) {
    let series = result.series();
    println!("=== {} / {} ===", result.symbol(), result.strategy_name());
    if let (Some(first), Some(last)) = (series.first(), series.last()) {
        println!("Period:            {} to {} ({} ticks)", first.date, last.date, series.len());
    }
    println!("Trades:            {}", metrics.total_trades);
    println!("Position:          {}", metrics.position);
    println!("Gross P&L:         {:.2}", metrics.gross_pnl);
    println!("Trade Cost:        {:.2}", metrics.trade_cost);
    println!("Net P&L:           {:.2}", metrics.net_pnl);
    println!("Returns:           {:.2}%", metrics.returns);
    println!("Avg Annual Return: {:.2}%", metrics.average_annual_return);
    println!("Volatility:        {:.2}%", metrics.volatility);
    println!(
        "Trade Winrate:     {:.1}% ({} won, {} lost, avg {:.2})",
        metrics.trade_winrate.win_rate,
        metrics.trade_winrate.winners,
        metrics.trade_winrate.losers,
        metrics.trade_winrate.average_trade_return,
    );
    println!(
        "Winrate d/w/m/q/y: {:.1}% / {:.1}% / {:.1}% / {:.1}% / {:.1}%",
        metrics.daily_winrate,
        metrics.weekly_winrate,
        metrics.monthly_winrate,
        metrics.quarterly_winrate,
        metrics.yearly_winrate,
    );
    if let (Some(beta), Some(b)) = (metrics.beta, benchmark) {
        println!("Beta vs {}:        {:.3}", b, beta);
    }
}

fn run_validate(config_path: &Path) -> Result<(), BacktestError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;

    validate_backtest_config(&config)?;
    build_backtest_config(&config)?;
    let strategy = build_strategy(&config)?;

    println!("Symbol:     {}", resolve_symbol(None, &config).unwrap_or_default());
    println!("Strategy:   {}", strategy.name());
    let indicators: Vec<String> = strategy.indicators().iter().map(|i| i.to_string()).collect();
    if !indicators.is_empty() {
        println!("Indicators: {}", indicators.join(", "));
    }
    eprintln!("Configuration is valid.");
    Ok(())
}

fn resolve_data_dir(
    config_path: Option<&Path>,
    data_dir_override: Option<PathBuf>,
) -> Result<(Option<FileConfigAdapter>, PathBuf), BacktestError> {
    let config = config_path.map(load_config).transpose()?;
    let dir = data_dir_override
        .or_else(|| config.as_ref().map(|c| data_dir(c)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    Ok((config, dir))
}

fn run_info(
    symbol_override: Option<&str>,
    config_path: Option<&Path>,
    data_dir_override: Option<PathBuf>,
) -> Result<(), BacktestError> {
    let (config, dir) = resolve_data_dir(config_path, data_dir_override)?;
    let source = CsvPriceSource::new(dir);

    let symbol = match config.as_ref() {
        Some(c) => resolve_symbol(symbol_override, c),
        None => symbol_override
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty()),
    };
    let symbols = match symbol {
        Some(s) => vec![s],
        None => source.list_symbols()?,
    };

    for symbol in &symbols {
        match source.fetch_series(symbol) {
            Ok(series) => match (series.first(), series.last()) {
                (Some(first), Some(last)) => println!(
                    "{}: {} ticks, {} to {}",
                    symbol,
                    series.len(),
                    first.date,
                    last.date
                ),
                _ => eprintln!("{}: no data found", symbol),
            },
            Err(e) => eprintln!("{}: {}", symbol, e),
        }
    }
    Ok(())
}

fn run_list_symbols(
    config_path: Option<&Path>,
    data_dir_override: Option<PathBuf>,
) -> Result<(), BacktestError> {
    let (_, dir) = resolve_data_dir(config_path, data_dir_override)?;
    let symbols = CsvPriceSource::new(dir.clone()).list_symbols()?;

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

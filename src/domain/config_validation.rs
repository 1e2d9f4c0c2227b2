//! Configuration validation.
//!
//! Checks every field a backtest run reads before any data is loaded.

use crate::domain::error::BacktestError;
use crate::domain::indicator::Direction;
use crate::ports::config_port::ConfigPort;

pub const STRATEGY_TYPES: [&str; 4] = ["hold", "bollinger", "patent", "streak"];

/// Upper bound on `[strategy] embargo_days` (one century).
pub const MAX_EMBARGO_DAYS: i64 = 36_500;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_symbol(config)?;
    validate_cost(config)?;
    Ok(())
}

/// Cost fields only, for runs whose symbol comes from elsewhere.
pub fn validate_cost_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_cost(config)
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    match strategy_type(config)?.as_str() {
        "bollinger" => validate_bollinger(config),
        "patent" => validate_patent(config),
        "streak" => validate_streak(config),
        _ => Ok(()),
    }
}

/// Lower-cased `[strategy] type`, defaulting to `hold`.
pub fn strategy_type(config: &dyn ConfigPort) -> Result<String, BacktestError> {
    let kind = config
        .get_trimmed("strategy", "type")
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| "hold".to_string());

    if !STRATEGY_TYPES.contains(&kind.as_str()) {
        return Err(invalid(
            "strategy",
            "type",
            format!("unknown strategy type '{}', expected one of {}", kind, STRATEGY_TYPES.join(", ")),
        ));
    }
    Ok(kind)
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> BacktestError {
    BacktestError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn validate_symbol(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    match config.get_trimmed("backtest", "symbol") {
        Some(_) => Ok(()),
        None => Err(missing("backtest", "symbol")),
    }
}

fn validate_cost(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    for key in ["cost_fixed", "cost_pct"] {
        let value = config.get_double("backtest", key, 0.0);
        if value < 0.0 || !value.is_finite() {
            return Err(invalid("backtest", key, format!("{} must be non-negative", key)));
        }
    }
    Ok(())
}

fn validate_positive_int(config: &dyn ConfigPort, key: &str, default: i64) -> Result<(), BacktestError> {
    if config.get_int("strategy", key, default) < 1 {
        return Err(invalid("strategy", key, format!("{} must be at least 1", key)));
    }
    Ok(())
}

fn validate_bollinger(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_positive_int(config, "period", 20)?;
    let k = config.get_double("strategy", "k", 2.0);
    if k < 0.0 {
        return Err(invalid("strategy", "k", "k must be non-negative"));
    }
    Ok(())
}

fn validate_patent(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    if config.get_trimmed("data", "dataset").is_none() {
        return Err(missing("data", "dataset"));
    }
    for key in ["high", "low"] {
        let Some(raw) = config.get_trimmed("strategy", key) else {
            return Err(missing("strategy", key));
        };
        if raw.parse::<f64>().is_err() {
            return Err(invalid("strategy", key, format!("{} must be a number", key)));
        }
    }
    let embargo = config.get_int("strategy", "embargo_days", 365);
    if !(0..=MAX_EMBARGO_DAYS).contains(&embargo) {
        return Err(invalid(
            "strategy",
            "embargo_days",
            format!("embargo_days must be between 0 and {}", MAX_EMBARGO_DAYS),
        ));
    }
    Ok(())
}

fn validate_streak(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_positive_int(config, "streak_length", 3)?;
    validate_positive_int(config, "horizon", 1)?;
    if config.get_int("strategy", "memory", 0) < 0 {
        return Err(invalid("strategy", "memory", "memory must be non-negative"));
    }
    if let Some(raw) = config.get_trimmed("strategy", "direction") {
        raw.parse::<Direction>()
            .map_err(|e| invalid("strategy", "direction", e))?;
    }
    Ok(())
}

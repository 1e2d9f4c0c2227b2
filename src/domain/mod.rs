//! Core domain types and logic.

pub mod tick;
pub mod position;
pub mod indicator;
pub mod backtest;
pub mod metrics;
pub mod strategy;
pub mod config_validation;
pub mod error;

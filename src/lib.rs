//! tickback: single-instrument strategy backtester.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. A backtest walks a price
//! [`Series`](domain::tick::Series) once, asks a
//! [`Strategy`](domain::strategy::Strategy) for an order on every tick and
//! records the fills. Every metric is then derived from that trade log.

pub mod cli;
pub mod domain;
pub mod ports;
pub mod adapters;

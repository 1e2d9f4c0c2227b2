//! Orders, executed trades and the position they imply.

use chrono::NaiveDate;
use std::fmt;

use crate::domain::tick::TickView;

/// A strategy signal. "No signal" is expressed as `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Buy,
    Sell,
    Close,
}

/// The concrete side of an executed trade; `Close` is resolved into one of
/// these before it reaches the trade log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub side: Side,
    pub index: usize,
    pub date: NaiveDate,
    pub close: f64,
}

impl Trade {
    pub fn at(side: Side, tick: &TickView<'_>) -> Self {
        Trade {
            side,
            index: tick.index(),
            date: tick.date,
            close: tick.close,
        }
    }

    /// Realised cash flow: selling credits the close, buying debits it.
    pub fn cash_flow(&self) -> f64 {
        match self.side {
            Side::Sell => self.close,
            Side::Buy => -self.close,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Long,
    Flat,
    Short,
}

impl Position {
    /// Position implied by all trades with `index <= as_of`.
    pub fn from_trades(trades: &[Trade], as_of: usize) -> Self {
        let net: i64 = trades
            .iter()
            .filter(|t| t.index <= as_of)
            .map(|t| match t.side {
                Side::Buy => 1,
                Side::Sell => -1,
            })
            .sum();

        match net {
            n if n > 0 => Position::Long,
            n if n < 0 => Position::Short,
            _ => Position::Flat,
        }
    }

    pub fn numeric(self) -> i8 {
        match self {
            Position::Long => 1,
            Position::Flat => 0,
            Position::Short => -1,
        }
    }

    /// The trade (if any) that `order` produces from this position.
    pub fn resolve(self, order: Order) -> Option<Side> {
        match (order, self) {
            (Order::Buy, Position::Long) => None,
            (Order::Buy, _) => Some(Side::Buy),
            (Order::Sell, Position::Short) => None,
            (Order::Sell, _) => Some(Side::Sell),
            (Order::Close, Position::Long) => Some(Side::Sell),
            (Order::Close, Position::Short) => Some(Side::Buy),
            (Order::Close, Position::Flat) => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Long => write!(f, "long"),
            Position::Flat => write!(f, "flat"),
            Position::Short => write!(f, "short"),
        }
    }
}

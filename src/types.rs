//! Core data types used across the trading system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failure for a single OHLCV candle
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CandleValidationError {
    #[error("non-finite {field} value")]
    NonFinite { field: &'static str },
    #[error("high {high} is below low {low}")]
    HighBelowLow { high: f64, low: f64 },
    #[error("{field} {value} outside high-low range [{low}, {high}]")]
    OutsideRange {
        field: &'static str,
        value: f64,
        low: f64,
        high: f64,
    },
    #[error("negative volume {0}")]
    NegativeVolume(f64),
}

/// OHLCV candlestick data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Construct a candle, rejecting malformed OHLCV values
    pub fn new(
        datetime: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, CandleValidationError> {
        for (field, value) in [
            ("open", open),
            ("high", high),
            ("low", low),
            ("close", close),
            ("volume", volume),
        ] {
            if !value.is_finite() {
                return Err(CandleValidationError::NonFinite { field });
            }
        }

        if high < low {
            return Err(CandleValidationError::HighBelowLow { high, low });
        }

        for (field, value) in [("open", open), ("close", close)] {
            if value < low || value > high {
                return Err(CandleValidationError::OutsideRange {
                    field,
                    value,
                    low,
                    high,
                });
            }
        }

        if volume < 0.0 {
            return Err(CandleValidationError::NegativeVolume(volume));
        }

        Ok(Candle {
            datetime,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// Trading pair symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Symbol(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Side of an open position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

/// Position state tracked by the signal engine: flat, or holding one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionSide {
    #[default]
    Flat,
    Long,
    Short,
}

impl PositionSide {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionSide::Flat)
    }
}

/// Per-bar output of the signal engine
///
/// `None` means "no signal this bar" and is the normal case; it is an
/// explicit decision, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    None,
    EnterLong,
    EnterShort,
    Exit,
}

impl Decision {
    /// Translate a decision into the order intent handed to the host,
    /// sized as a fraction of available capital
    pub fn to_intent(self, size_fraction: f64) -> Option<OrderIntent> {
        match self {
            Decision::None => None,
            Decision::EnterLong => Some(OrderIntent::OpenLong(size_fraction)),
            Decision::EnterShort => Some(OrderIntent::OpenShort(size_fraction)),
            Decision::Exit => Some(OrderIntent::Close),
        }
    }
}

/// Directional order request sent across the host boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderIntent {
    OpenLong(f64),
    OpenShort(f64),
    Close,
}

/// An open paper position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub side: Side,
    pub entry_price: f64,
    pub quantity: f64,
    pub entry_time: DateTime<Utc>,
}

impl Position {
    pub fn notional(&self) -> f64 {
        self.quantity * self.entry_price
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        match self.side {
            Side::Long => (current_price - self.entry_price) * self.quantity,
            Side::Short => (self.entry_price - current_price) * self.quantity,
        }
    }
}

/// Completed trade record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: Symbol,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub pnl: f64,
    pub commission: f64,
    pub net_pnl: f64,
}

impl Trade {
    pub fn return_pct(&self) -> f64 {
        let raw = (self.exit_price - self.entry_price) / self.entry_price * 100.0;
        match self.side {
            Side::Long => raw,
            Side::Short => -raw,
        }
    }
}

/// Portfolio statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub calmar_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub total_commission: f64,
}

//! Chikou Breakout Trading System
//!
//! One strategy, fully plumbed: a Chikou-momentum Bollinger breakout on
//! Bitcoin 4-hour bars, confirmed by the Ichimoku cloud, with backtesting,
//! parameter optimization, and a paper-trading runner.
//!
//! The decision core is `strategy::SignalEngine` - a small state machine
//! evaluated once per completed bar. Indicator math lives behind plain
//! data (`indicators::IndicatorSnapshot`), so the engine can be exercised
//! with synthetic streams in tests.
//!
//! Historical data comes from Binance public market-data endpoints; no API
//! key is required.
//!
//! ## Example (Backtest)
//! ```no_run
//! use chikou_breakout::backtest::Backtester;
//! use chikou_breakout::{data, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let candles = data::load_csv("data/BTCUSDT_4h.csv")?;
//!     let mut backtester = Backtester::new(config);
//!     let result = backtester.run(&candles)?;
//!     println!("Total return: {:.2}%", result.metrics.total_return);
//!     Ok(())
//! }
//! ```

pub mod backtest;
pub mod binance;
pub mod config;
pub mod data;
pub mod indicators;
pub mod optimizer;
pub mod state;
pub mod strategy;
pub mod types;

pub use config::Config;
pub use indicators::IndicatorSnapshot;
pub use strategy::{ChikouBreakoutConfig, SignalEngine, SignalState};
pub use types::*;

// Re-export the exchange client for convenience
pub use binance::BinanceClient;

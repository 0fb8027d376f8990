//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files. All values have
//! sensible defaults so a missing section never aborts a run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::strategy::ChikouBreakoutConfig;
use crate::Symbol;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub strategy: ChikouBreakoutConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
    /// Grid search axes for optimization (optional)
    /// Each key is a strategy param name, value is an array of values to test
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<HashMap<String, Vec<serde_json::Value>>>,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        Ok(config)
    }

    pub fn symbol(&self) -> Symbol {
        Symbol::new(self.trading.pair.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            exchange: ExchangeConfig::default(),
            trading: TradingConfig::default(),
            strategy: ChikouBreakoutConfig::default(),
            backtest: BacktestConfig::default(),
            grid: None,
        }
    }
}

/// Exchange fee and slippage model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub taker_fee: f64,
    pub assumed_slippage: f64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig {
            taker_fee: 0.001, // 0.1%
            assumed_slippage: 0.001,
        }
    }
}

/// Trading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    pub pair: String,
    pub timeframe: String,
    pub initial_capital: f64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        TradingConfig {
            pair: "BTCUSDT".to_string(),
            timeframe: "4h".to_string(),
            initial_capital: 100_000.0,
        }
    }
}

/// Backtest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub data_dir: String,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            data_dir: "data".to_string(),
        }
    }
}

//! Parameter Optimization Framework
//!
//! Parallel grid search over strategy parameter combinations.

use indicatif::ProgressBar;
use rayon::prelude::*;
use std::collections::HashMap;

use crate::backtest::Backtester;
use crate::{Candle, Config};

/// Optimization result for a single parameter combination
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub params: HashMap<String, f64>,
    pub sharpe_ratio: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub total_trades: usize,
    pub calmar_ratio: f64,
    pub profit_factor: f64,
}

/// Strategy parameters varied by the grid, keyed by name for reporting
pub fn extract_params(config: &Config) -> HashMap<String, f64> {
    let mut params = HashMap::new();
    params.insert("bb_period".to_string(), config.strategy.bb_period as f64);
    params.insert("bb_std_dev".to_string(), config.strategy.bb_std_dev);
    params.insert(
        "min_signal_interval_hours".to_string(),
        config.strategy.min_signal_interval_hours as f64,
    );
    params
}

fn run_one(config: &Config, candles: &[Candle]) -> OptimizationResult {
    let mut backtester = Backtester::new(config.clone());
    let metrics = match backtester.run(candles) {
        Ok(result) => result.metrics,
        Err(e) => {
            tracing::warn!("Backtest failed for parameter combination: {}", e);
            Default::default()
        }
    };

    OptimizationResult {
        params: extract_params(config),
        sharpe_ratio: metrics.sharpe_ratio,
        total_return: metrics.total_return,
        max_drawdown: metrics.max_drawdown,
        win_rate: metrics.win_rate,
        total_trades: metrics.total_trades,
        calmar_ratio: metrics.calmar_ratio,
        profit_factor: metrics.profit_factor,
    }
}

/// Grid-search optimizer for the breakout strategy
pub struct Optimizer;

impl Optimizer {
    /// Run all parameter combinations in parallel
    pub fn optimize(candles: &[Candle], configs: Vec<Config>) -> Vec<OptimizationResult> {
        tracing::info!("Testing {} parameter combinations", configs.len());

        configs
            .par_iter()
            .map(|config| run_one(config, candles))
            .collect()
    }

    /// Run optimization with progress tracking
    pub fn optimize_with_progress(
        candles: &[Candle],
        configs: Vec<Config>,
        progress_bar: ProgressBar,
    ) -> Vec<OptimizationResult> {
        tracing::info!(
            "Testing {} parameter combinations with progress tracking",
            configs.len()
        );

        configs
            .par_iter()
            .map(|config| {
                let result = run_one(config, candles);
                progress_bar.inc(1);
                result
            })
            .collect()
    }

    /// Run optimization sequentially (no parallelism)
    /// Useful for debugging or when parallel execution causes issues
    pub fn optimize_sequential(candles: &[Candle], configs: Vec<Config>) -> Vec<OptimizationResult> {
        tracing::info!(
            "Testing {} parameter combinations sequentially",
            configs.len()
        );

        configs
            .iter()
            .map(|config| run_one(config, candles))
            .collect()
    }

    /// Sort optimization results by specified metric
    pub fn sort_results(results: &mut [OptimizationResult], sort_by: &str) {
        match sort_by {
            "calmar" => results.sort_by(|a, b| {
                b.calmar_ratio
                    .partial_cmp(&a.calmar_ratio)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            "return" => results.sort_by(|a, b| {
                b.total_return
                    .partial_cmp(&a.total_return)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            "win_rate" => results.sort_by(|a, b| {
                b.win_rate
                    .partial_cmp(&a.win_rate)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            "profit_factor" => results.sort_by(|a, b| {
                b.profit_factor
                    .partial_cmp(&a.profit_factor)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            _ => results.sort_by(|a, b| {
                b.sharpe_ratio
                    .partial_cmp(&a.sharpe_ratio)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_sharpe(sharpe: f64, ret: f64) -> OptimizationResult {
        OptimizationResult {
            params: HashMap::new(),
            sharpe_ratio: sharpe,
            total_return: ret,
            max_drawdown: 0.0,
            win_rate: 0.0,
            total_trades: 0,
            calmar_ratio: 0.0,
            profit_factor: 0.0,
        }
    }

    #[test]
    fn test_sort_results_by_sharpe_descending() {
        let mut results = vec![
            result_with_sharpe(0.5, 1.0),
            result_with_sharpe(2.0, -1.0),
            result_with_sharpe(1.0, 5.0),
        ];

        Optimizer::sort_results(&mut results, "sharpe");
        assert_eq!(results[0].sharpe_ratio, 2.0);
        assert_eq!(results[2].sharpe_ratio, 0.5);
    }

    #[test]
    fn test_sort_results_by_return() {
        let mut results = vec![
            result_with_sharpe(0.5, 1.0),
            result_with_sharpe(2.0, -1.0),
            result_with_sharpe(1.0, 5.0),
        ];

        Optimizer::sort_results(&mut results, "return");
        assert_eq!(results[0].total_return, 5.0);
    }

    #[test]
    fn test_extract_params_names_grid_axes() {
        let params = extract_params(&Config::default());
        assert_eq!(params.get("bb_period"), Some(&20.0));
        assert_eq!(params.get("bb_std_dev"), Some(&2.0));
        assert_eq!(params.get("min_signal_interval_hours"), Some(&12.0));
    }
}

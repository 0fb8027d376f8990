//! Optimize command implementation
//!
//! Grid search over the strategy's band and cooldown parameters against a
//! single symbol's history.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use chikou_breakout::optimizer::Optimizer;
use chikou_breakout::strategy::GridParams;
use chikou_breakout::{data, Config};

pub fn run(
    config_path: String,
    sort_by: String,
    top: usize,
    full: bool,
    sequential: bool,
) -> Result<()> {
    info!("Starting optimization");

    let config = Config::from_file(&config_path)?;
    info!("Loaded configuration from: {}", config_path);

    let mut grid = if full {
        GridParams::full()
    } else {
        GridParams::quick()
    };
    if let Some(overrides) = &config.grid {
        grid.apply_overrides(overrides);
    }

    let symbol = config.symbol();
    let timeframe = config.trading.timeframe.clone();
    let path =
        data::ensure_data_available_sync(&config.backtest.data_dir, &symbol, &timeframe, 730)?;
    let candles = data::load_csv(&path)?;

    let configs = grid.generate_configs(&config);
    let total_runs = configs.len();

    println!("\n{}", "=".repeat(70));
    println!("PARAMETER OPTIMIZATION");
    println!("{}", "=".repeat(70));
    println!("  Symbol:        {} ({})", symbol, timeframe);
    println!("  Candles:       {}", candles.len());
    println!("  Combinations:  {}", total_runs);
    println!(
        "  Mode:          {}",
        if sequential { "sequential" } else { "parallel" }
    );
    println!("{}\n", "=".repeat(70));

    // Create single progress bar (tqdm style)
    let pb = ProgressBar::new(total_runs as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("⚡ {percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}, {per_sec}]")
            .unwrap()
            .progress_chars("█░ "),
    );
    pb.tick();

    let mut results = if sequential {
        Optimizer::optimize_sequential(&candles, configs)
    } else {
        Optimizer::optimize_with_progress(&candles, configs, pb.clone())
    };

    pb.finish();
    println!();

    Optimizer::sort_results(&mut results, &sort_by);

    println!("\n{}", "=".repeat(90));
    println!("TOP {} RESULTS (sorted by {})", top.min(results.len()), sort_by);
    println!("{}", "=".repeat(90));
    println!(
        "{:<4} {:>7} {:>9} {:>8} {:>8} {:>7} | {}",
        "#", "Sharpe", "Return%", "MaxDD%", "WinRate", "Trades", "Params"
    );
    println!("{}", "-".repeat(90));

    for (i, result) in results.iter().take(top).enumerate() {
        let mut params: Vec<(&String, &f64)> = result.params.iter().collect();
        params.sort_by_key(|(name, _)| name.as_str());
        let params_str = params
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(", ");

        println!(
            "{:<4} {:>7.2} {:>9.2} {:>8.2} {:>8.2} {:>7} | {}",
            i + 1,
            result.sharpe_ratio,
            result.total_return,
            result.max_drawdown,
            result.win_rate,
            result.total_trades,
            params_str
        );
    }
    println!("{}", "=".repeat(90));

    info!("Optimization completed successfully");

    Ok(())
}

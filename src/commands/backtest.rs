//! Backtest command implementation

use anyhow::Result;
use chikou_breakout::backtest::Backtester;
use chikou_breakout::{data, Config};
use tracing::info;

pub fn run(
    config_path: String,
    capital_override: Option<f64>,
    start_override: Option<String>,
    end_override: Option<String>,
) -> Result<()> {
    info!("Starting backtest");

    // Load configuration
    let mut config = Config::from_file(&config_path)?;
    info!("Loaded configuration from: {}", config_path);

    if let Some(capital) = capital_override {
        info!("Overriding initial capital to: ${:.2}", capital);
        config.trading.initial_capital = capital;
    }

    let start = start_override.as_deref().map(data::parse_date).transpose()?;
    let end = end_override.as_deref().map(data::parse_date).transpose()?;

    // Load data, fetching from Binance if the file is missing
    let symbol = config.symbol();
    let timeframe = config.trading.timeframe.clone();
    info!("Loading {} {} data from: {}", symbol, timeframe, config.backtest.data_dir);

    let path = data::ensure_data_available_sync(&config.backtest.data_dir, &symbol, &timeframe, 730)?;
    let candles = data::load_csv(&path)?;
    let candles = data::filter_candles_by_date(candles, start, end);

    if candles.is_empty() {
        anyhow::bail!("No candles in the requested date range");
    }

    let validation = data::validate_candles(&candles);
    if !validation.is_valid() {
        for error in &validation.errors {
            tracing::error!("Data validation: {}", error);
        }
        anyhow::bail!("Candle data failed validation");
    }

    info!("Running backtest over {} candles...", candles.len());
    let mut backtester = Backtester::new(config.clone());
    let result = backtester.run(&candles)?;

    // Print results
    println!("\n{}", "=".repeat(60));
    println!("BACKTEST RESULTS");
    println!("{}", "=".repeat(60));
    println!("Symbol:             {} ({})", symbol, timeframe);
    println!("Initial Capital:    ${:.2}", config.trading.initial_capital);
    println!("Total Return:       {:.2}%", result.metrics.total_return);
    println!("Sharpe Ratio:       {:.2}", result.metrics.sharpe_ratio);
    println!("Calmar Ratio:       {:.2}", result.metrics.calmar_ratio);
    println!("Max Drawdown:       {:.2}%", result.metrics.max_drawdown);
    println!("Win Rate:           {:.2}%", result.metrics.win_rate);
    println!("Profit Factor:      {:.2}", result.metrics.profit_factor);
    println!("Total Trades:       {}", result.metrics.total_trades);
    println!("Winning Trades:     {}", result.metrics.winning_trades);
    println!("Losing Trades:      {}", result.metrics.losing_trades);
    println!("Average Win:        ${:.2}", result.metrics.avg_win);
    println!("Average Loss:       ${:.2}", result.metrics.avg_loss);
    println!("Largest Win:        ${:.2}", result.metrics.largest_win);
    println!("Largest Loss:       ${:.2}", result.metrics.largest_loss);
    println!("{}", "-".repeat(60));
    println!("Total Commission:   ${:.2}", result.metrics.total_commission);
    println!("{}", "=".repeat(60));

    info!("Backtest completed successfully");

    Ok(())
}

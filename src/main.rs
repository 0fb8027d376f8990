//! Chikou breakout strategy - main entry point
//!
//! This binary provides four subcommands:
//! - backtest: Run the strategy backtest
//! - optimize: Run parameter optimization
//! - live: Run the paper-trading loop
//! - download: Download historical data from Binance

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "chikou-breakout")]
#[command(about = "Chikou-momentum Bollinger breakout strategy for Bitcoin", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run strategy backtest
    Backtest {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/btcusdt_4h.json")]
        config: String,

        /// Initial capital
        #[arg(long)]
        capital: Option<f64>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },

    /// Optimize strategy parameters (grid search)
    Optimize {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/btcusdt_4h.json")]
        config: String,

        /// Sort results by metric (sharpe, calmar, return, win_rate, profit_factor)
        #[arg(long, default_value = "sharpe")]
        sort_by: String,

        /// Number of top results to show
        #[arg(short, long, default_value = "10")]
        top: usize,

        /// Use the full grid instead of the quick preset
        #[arg(long)]
        full: bool,

        /// Run sequentially instead of parallel
        #[arg(long)]
        sequential: bool,
    },

    /// Run the paper-trading loop (no real orders)
    Live {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/btcusdt_4h.json")]
        config: String,

        /// Cycle interval in seconds
        #[arg(long, default_value = "300")]
        interval: u64,

        /// State database path
        #[arg(long, default_value = "state.db")]
        state_db: String,
    },

    /// Download historical data from Binance
    Download {
        /// Binance trading pair
        #[arg(short, long, default_value = "BTCUSDT")]
        symbol: String,

        /// Timeframe intervals (comma-separated). E.g., "1h,4h,1d"
        #[arg(short, long, default_value = "4h")]
        timeframes: String,

        /// Number of days of history to fetch
        #[arg(short, long, default_value = "730")]
        days: u32,

        /// Output directory
        #[arg(short, long, default_value = "data")]
        output: String,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Set log level - filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    // File appender
    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    if file_only {
        // For optimizer: only log to file, keep console clean for progress bar
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);

        // File layer - same format but without ANSI colors
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Logging initialized");
        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine command name and whether to use file-only logging
    let (command_name, file_only) = match &cli.command {
        Commands::Backtest { .. } => ("backtest", false),
        Commands::Optimize { .. } => ("optimize", true), // File-only for clean progress bar
        Commands::Live { .. } => ("live", false),
        Commands::Download { .. } => ("download", false),
    };

    // Setup logging
    setup_logging(cli.verbose, command_name, file_only)?;

    // Execute command
    match cli.command {
        Commands::Backtest {
            config,
            capital,
            start,
            end,
        } => commands::backtest::run(config, capital, start, end),

        Commands::Optimize {
            config,
            sort_by,
            top,
            full,
            sequential,
        } => commands::optimize::run(config, sort_by, top, full, sequential),

        Commands::Live {
            config,
            interval,
            state_db,
        } => commands::live::run(config, interval, state_db),

        Commands::Download {
            symbol,
            timeframes,
            days,
            output,
        } => commands::download::run(symbol, timeframes, days, output),
    }
}

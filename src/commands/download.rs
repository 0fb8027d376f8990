//! Download command implementation

use anyhow::{Context, Result};
use chikou_breakout::data::BinanceDataFetcher;
use chikou_breakout::{binance, Symbol};
use tracing::{info, warn};

pub fn run(symbol: String, timeframes: String, days: u32, output: String) -> Result<()> {
    let symbol = Symbol::new(symbol.trim().to_uppercase());

    let intervals: Vec<&str> = timeframes
        .split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();

    for interval in &intervals {
        if !binance::is_valid_interval(interval) {
            anyhow::bail!(
                "Invalid interval '{}'. Valid: {}",
                interval,
                binance::BINANCE_INTERVALS.join(", ")
            );
        }
    }

    info!(
        "Downloading {} for {} ({} days) into {}",
        symbol,
        intervals.join(", "),
        days,
        output
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
    let fetcher = BinanceDataFetcher::new(&output);

    let mut failed = 0usize;
    for interval in &intervals {
        match runtime.block_on(fetcher.download_pair(&symbol, interval, days)) {
            Ok(path) => info!("Saved {}", path.display()),
            Err(e) => {
                failed += 1;
                warn!("Failed to download {} {}: {}", symbol, interval, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} downloads failed", failed, intervals.len());
    }

    info!("Download complete");
    Ok(())
}

//! Data loading and management
//!
//! Handles loading OHLCV data from CSV files and historical data fetching
//! from the Binance public API, plus the feed-contract checks the signal
//! engine relies on (strictly increasing bar timestamps).

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::binance::{BinanceClient, BinanceKline};
use crate::{Candle, CandleValidationError, Symbol};

// =============================================================================
// Feed Contract
// =============================================================================

/// Violation of the bar-feed contract
///
/// The engine never reorders input; out-of-order or duplicate timestamps are
/// the caller's problem and are surfaced as errors.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("duplicate bar timestamp {timestamp} at index {index}")]
    Duplicate {
        index: usize,
        timestamp: DateTime<Utc>,
    },
    #[error("out-of-order bar timestamp at index {index}: {current} follows {prev}")]
    OutOfOrder {
        index: usize,
        prev: DateTime<Utc>,
        current: DateTime<Utc>,
    },
}

/// Check that bar timestamps are strictly increasing
pub fn ensure_strict_order(candles: &[Candle]) -> Result<(), FeedError> {
    for (i, pair) in candles.windows(2).enumerate() {
        let (prev, current) = (&pair[0], &pair[1]);
        if current.datetime == prev.datetime {
            return Err(FeedError::Duplicate {
                index: i + 1,
                timestamp: current.datetime,
            });
        }
        if current.datetime < prev.datetime {
            return Err(FeedError::OutOfOrder {
                index: i + 1,
                prev: prev.datetime,
                current: current.datetime,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Candle Conversion
// =============================================================================

/// Convert from Binance kline to internal Candle type with validation
impl TryFrom<BinanceKline> for Candle {
    type Error = CandleValidationError;

    fn try_from(k: BinanceKline) -> Result<Self, Self::Error> {
        Candle::new(
            DateTime::from_timestamp_millis(k.open_time).unwrap_or_else(Utc::now),
            k.open,
            k.high,
            k.low,
            k.close,
            k.volume,
        )
    }
}

// =============================================================================
// CSV Data Loading
// =============================================================================

/// Path of the CSV file holding one symbol/timeframe series
pub fn data_path(data_dir: impl AsRef<Path>, symbol: &Symbol, timeframe: &str) -> PathBuf {
    data_dir
        .as_ref()
        .join(format!("{}_{}.csv", symbol.as_str(), timeframe))
}

/// Load OHLCV data from CSV file with validation
///
/// Invalid rows are skipped and counted rather than aborting the load.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let mut candles = Vec::new();
    let mut invalid_count = 0usize;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        if record.len() < 6 {
            invalid_count += 1;
            continue;
        }

        let parsed = parse_datetime(&record[0]).and_then(|datetime| {
            let fields: Option<[f64; 5]> = (1..6)
                .map(|i| record[i].trim().parse::<f64>().ok())
                .collect::<Option<Vec<f64>>>()
                .and_then(|v| v.try_into().ok());
            fields.map(|[open, high, low, close, volume]| {
                Candle::new(datetime, open, high, low, close, volume)
            })
        });

        match parsed {
            Some(Ok(candle)) => candles.push(candle),
            _ => invalid_count += 1,
        }
    }

    if invalid_count > 0 {
        warn!(
            "Skipped {} invalid rows while loading {}",
            invalid_count,
            path.display()
        );
    }

    info!("Loaded {} candles from {}", candles.len(), path.display());
    Ok(candles)
}

/// Save candles to a CSV file, creating the parent directory if needed
pub fn save_csv(path: impl AsRef<Path>, candles: &[Candle]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create data directory")?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

    writer.write_record(["datetime", "open", "high", "low", "close", "volume"])?;
    for candle in candles {
        writer.write_record([
            candle.datetime.to_rfc3339(),
            candle.open.to_string(),
            candle.high.to_string(),
            candle.low.to_string(),
            candle.close.to_string(),
            candle.volume.to_string(),
        ])?;
    }
    writer.flush()?;

    Ok(())
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

/// Parse a YYYY-MM-DD date argument into a UTC timestamp at midnight
pub fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    let naive = chrono::NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", date_str))?;
    Ok(naive
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc())
}

/// Restrict a candle series to an optional [start, end] date window
pub fn filter_candles_by_date(
    candles: Vec<Candle>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<Candle> {
    candles
        .into_iter()
        .filter(|c| start.map_or(true, |s| c.datetime >= s))
        .filter(|c| end.map_or(true, |e| c.datetime <= e))
        .collect()
}

// =============================================================================
// Data Availability
// =============================================================================

/// Fetch missing data from Binance, blocking until done
///
/// Spins up a runtime internally so synchronous command code can call it.
pub fn ensure_data_available_sync(
    data_dir: impl AsRef<Path>,
    symbol: &Symbol,
    timeframe: &str,
    days: u32,
) -> Result<PathBuf> {
    let path = data_path(&data_dir, symbol, timeframe);
    if path.exists() {
        return Ok(path);
    }

    info!("No local data for {} {}, fetching from Binance", symbol, timeframe);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
    let fetcher = BinanceDataFetcher::new(data_dir);
    runtime.block_on(fetcher.download_pair(symbol, timeframe, days))
}

// =============================================================================
// Binance Data Fetcher
// =============================================================================

/// Downloads historical candles from Binance and stores them as CSV
pub struct BinanceDataFetcher {
    client: BinanceClient,
    data_dir: PathBuf,
}

impl BinanceDataFetcher {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        BinanceDataFetcher {
            client: BinanceClient::new(),
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Download one symbol/timeframe series and write it to the data dir
    pub async fn download_pair(
        &self,
        symbol: &Symbol,
        interval: &str,
        days: u32,
    ) -> Result<PathBuf> {
        let klines = self
            .client
            .fetch_full_history(symbol.as_str(), interval, days)
            .await?;

        if klines.is_empty() {
            anyhow::bail!("No data returned for {} {}", symbol, interval);
        }

        let mut candles = Vec::with_capacity(klines.len());
        let mut rejected = 0usize;
        for kline in klines {
            match Candle::try_from(kline) {
                Ok(candle) => candles.push(candle),
                Err(e) => {
                    rejected += 1;
                    warn!("Rejected kline: {}", e);
                }
            }
        }
        if rejected > 0 {
            warn!("Rejected {} of the fetched klines", rejected);
        }

        let path = data_path(&self.data_dir, symbol, interval);
        save_csv(&path, &candles)?;
        info!("Saved {} candles to {}", candles.len(), path.display());

        Ok(path)
    }
}

// =============================================================================
// Candle Cache
// =============================================================================

struct CachedSeries {
    candles: Vec<Candle>,
    fetched_at: DateTime<Utc>,
}

/// In-memory candle cache for the paper-trading runner
pub struct CandleCache {
    series: HashMap<Symbol, CachedSeries>,
    max_candles: usize,
    ttl_seconds: i64,
}

impl CandleCache {
    pub fn new(max_candles: usize, ttl_seconds: i64) -> Self {
        CandleCache {
            series: HashMap::new(),
            max_candles,
            ttl_seconds,
        }
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Vec<Candle>> {
        self.series.get(symbol).map(|s| &s.candles)
    }

    /// Replace a symbol's series, trimming to the cache capacity
    pub fn update(&mut self, symbol: Symbol, mut candles: Vec<Candle>) {
        if candles.len() > self.max_candles {
            candles.drain(..candles.len() - self.max_candles);
        }
        self.series.insert(
            symbol,
            CachedSeries {
                candles,
                fetched_at: Utc::now(),
            },
        );
    }

    /// Append one candle, dropping the oldest once capacity is reached
    pub fn append(&mut self, symbol: &Symbol, candle: Candle) {
        let entry = self
            .series
            .entry(symbol.clone())
            .or_insert_with(|| CachedSeries {
                candles: Vec::new(),
                fetched_at: Utc::now(),
            });
        entry.candles.push(candle);
        if entry.candles.len() > self.max_candles {
            let excess = entry.candles.len() - self.max_candles;
            entry.candles.drain(..excess);
        }
        entry.fetched_at = Utc::now();
    }

    pub fn needs_refresh(&self, symbol: &Symbol) -> bool {
        match self.series.get(symbol) {
            Some(series) => (Utc::now() - series.fetched_at).num_seconds() >= self.ttl_seconds,
            None => true,
        }
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Result of validating a candle series
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub candle_count: usize,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a candle series: per-candle OHLCV sanity plus feed ordering
pub fn validate_candles(candles: &[Candle]) -> ValidationResult {
    let mut result = ValidationResult {
        errors: Vec::new(),
        candle_count: candles.len(),
    };

    for (i, candle) in candles.iter().enumerate() {
        if let Err(e) = Candle::new(
            candle.datetime,
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle.volume,
        ) {
            result.errors.push(format!("candle {}: {}", i, e));
        }
    }

    if let Err(e) = ensure_strict_order(candles) {
        result.errors.push(e.to_string());
    }

    result
}

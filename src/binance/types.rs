//! Binance API types for klines (candlestick) data

/// Binance kline/candlestick data
/// API returns an array: [open_time, open, high, low, close, volume, close_time,
///                        quote_volume, trades, taker_buy_base, taker_buy_quote, ignore]
#[derive(Debug, Clone)]
pub struct BinanceKline {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
    pub quote_volume: f64,
    pub trades: u64,
    pub taker_buy_base: f64,
    pub taker_buy_quote: f64,
}

impl BinanceKline {
    /// Parse from raw JSON array returned by Binance API
    pub fn from_raw(raw: &[serde_json::Value]) -> Option<Self> {
        if raw.len() < 11 {
            return None;
        }

        Some(BinanceKline {
            open_time: raw[0].as_i64()?,
            open: raw[1].as_str()?.parse().ok()?,
            high: raw[2].as_str()?.parse().ok()?,
            low: raw[3].as_str()?.parse().ok()?,
            close: raw[4].as_str()?.parse().ok()?,
            volume: raw[5].as_str()?.parse().ok()?,
            close_time: raw[6].as_i64()?,
            quote_volume: raw[7].as_str()?.parse().ok()?,
            trades: raw[8].as_u64()?,
            taker_buy_base: raw[9].as_str()?.parse().ok()?,
            taker_buy_quote: raw[10].as_str()?.parse().ok()?,
        })
    }
}

/// Valid Binance intervals
pub const BINANCE_INTERVALS: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

/// Check if interval is valid for Binance
pub fn is_valid_interval(interval: &str) -> bool {
    BINANCE_INTERVALS.contains(&interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kline_from_raw() {
        let raw = vec![
            serde_json::json!(1700000000000i64),
            serde_json::json!("35000.0"),
            serde_json::json!("35500.0"),
            serde_json::json!("34800.0"),
            serde_json::json!("35200.0"),
            serde_json::json!("123.45"),
            serde_json::json!(1700014399999i64),
            serde_json::json!("4345678.9"),
            serde_json::json!(9876u64),
            serde_json::json!("60.0"),
            serde_json::json!("2112000.0"),
            serde_json::json!("0"),
        ];

        let kline = BinanceKline::from_raw(&raw).unwrap();
        assert_eq!(kline.open_time, 1700000000000);
        assert_eq!(kline.close, 35200.0);
        assert_eq!(kline.trades, 9876);
    }

    #[test]
    fn test_kline_from_raw_rejects_short_rows() {
        let raw = vec![serde_json::json!(1700000000000i64)];
        assert!(BinanceKline::from_raw(&raw).is_none());
    }

    #[test]
    fn test_valid_intervals() {
        assert!(is_valid_interval("1h"));
        assert!(is_valid_interval("4h"));
        assert!(is_valid_interval("1d"));
        assert!(!is_valid_interval("2d"));
    }
}

//! Technical indicators powered by the `ta` crate
//!
//! Bollinger Bands come from the battle-tested `ta` crate. The Ichimoku
//! components and the Chikou momentum series are implemented manually
//! (not in the ta crate), aligned bar-for-bar with the candle series.
//!
//! Every series is returned as `Vec<Option<f64>>` with `None` during the
//! warm-up window, so downstream code never sees a half-initialized value.

use chrono::{DateTime, Utc};
use ta::indicators::{BollingerBands as TaBB, SimpleMovingAverage};
use ta::Next;

use crate::strategy::ChikouBreakoutConfig;
use crate::Candle;

/// Type alias for band indicators (upper, middle, lower)
pub type BandOutput = (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>);

// =============================================================================
// Moving Averages
// =============================================================================

/// Calculate Simple Moving Average
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let mut indicator = match SimpleMovingAverage::new(period) {
        Ok(i) => i,
        Err(_) => return vec![None; values.len()],
    };

    let mut result = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        let sma_val = indicator.next(value);
        if i + 1 >= period {
            result.push(Some(sma_val));
        } else {
            result.push(None);
        }
    }

    result
}

// =============================================================================
// Volatility Indicators
// =============================================================================

/// Calculate Bollinger Bands using ta crate
pub fn bollinger_bands(values: &[f64], period: usize, num_std: f64) -> BandOutput {
    if values.is_empty() || period == 0 {
        return (vec![], vec![], vec![]);
    }

    let mut indicator = match TaBB::new(period, num_std) {
        Ok(i) => i,
        Err(_) => {
            return (
                vec![None; values.len()],
                vec![None; values.len()],
                vec![None; values.len()],
            )
        }
    };

    let mut upper = Vec::with_capacity(values.len());
    let mut middle = Vec::with_capacity(values.len());
    let mut lower = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        let bb = indicator.next(value);
        if i + 1 >= period {
            upper.push(Some(bb.upper));
            middle.push(Some(bb.average));
            lower.push(Some(bb.lower));
        } else {
            upper.push(None);
            middle.push(None);
            lower.push(None);
        }
    }

    (upper, middle, lower)
}

// =============================================================================
// Ichimoku Components (manual implementation - not in ta crate)
// =============================================================================

/// Rolling midpoint of the high-low range: (highest high + lowest low) / 2
pub fn midpoint(high: &[f64], low: &[f64], period: usize) -> Vec<Option<f64>> {
    if high.is_empty() || period == 0 || high.len() != low.len() {
        return vec![];
    }

    let mut result = Vec::with_capacity(high.len());

    for i in 0..high.len() {
        if i + 1 < period {
            result.push(None);
        } else {
            let window_high = high[i + 1 - period..=i]
                .iter()
                .fold(f64::MIN, |a, &b| a.max(b));
            let window_low = low[i + 1 - period..=i]
                .iter()
                .fold(f64::MAX, |a, &b| a.min(b));
            result.push(Some((window_high + window_low) / 2.0));
        }
    }

    result
}

/// Calculate Chikou momentum: percentage change of the close against the
/// close `period` bars earlier
pub fn chikou_momentum(close: &[f64], period: usize) -> Vec<Option<f64>> {
    if close.is_empty() || period == 0 {
        return vec![];
    }

    let mut result = Vec::with_capacity(close.len());

    for i in 0..close.len() {
        if i < period {
            result.push(None);
        } else {
            let historical = close[i - period];
            if historical != 0.0 {
                result.push(Some((close[i] - historical) / historical * 100.0));
            } else {
                result.push(None);
            }
        }
    }

    result
}

// =============================================================================
// Indicator Snapshot
// =============================================================================

/// All indicator values computed for a single bar
///
/// Fields are `None` while their warm-up window is still filling. The signal
/// engine consumes these as plain data, so tests can drive it with synthetic
/// snapshots without touching the indicator math.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub tenkan: Option<f64>,
    pub kijun: Option<f64>,
    pub senkou_a: Option<f64>,
    pub senkou_b: Option<f64>,
    pub momentum: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
}

impl IndicatorSnapshot {
    /// Cloud boundaries as (bottom, top), when both spans are defined
    pub fn cloud(&self) -> Option<(f64, f64)> {
        match (self.senkou_a, self.senkou_b) {
            (Some(a), Some(b)) => Some((a.min(b), a.max(b))),
            _ => None,
        }
    }

    /// True once every series has left its warm-up window
    pub fn is_ready(&self) -> bool {
        self.momentum.is_some()
            && self.bb_upper.is_some()
            && self.bb_lower.is_some()
            && self.senkou_a.is_some()
            && self.senkou_b.is_some()
    }
}

/// Compute the full snapshot series for a candle stream
///
/// Bollinger Bands run over the momentum series, not the price series, so
/// the bands only become defined once `bb_period` momentum values exist
/// (bar index `chikou_period + bb_period - 1` at the earliest).
pub fn compute_snapshots(candles: &[Candle], config: &ChikouBreakoutConfig) -> Vec<IndicatorSnapshot> {
    let high: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let low: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let close: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let tenkan = midpoint(&high, &low, config.tenkan_period);
    let kijun = midpoint(&high, &low, config.kijun_period);
    let senkou_b = midpoint(&high, &low, config.senkou_b_period);
    let momentum = chikou_momentum(&close, config.chikou_period);

    // Feed the band indicator only with defined momentum values, keeping
    // the output aligned to bar indices.
    let mut bb = TaBB::new(config.bb_period, config.bb_std_dev).ok();
    let mut fed = 0usize;
    let mut bb_upper = Vec::with_capacity(candles.len());
    let mut bb_lower = Vec::with_capacity(candles.len());

    for mom in &momentum {
        match (mom, bb.as_mut()) {
            (Some(value), Some(indicator)) => {
                let out = indicator.next(*value);
                fed += 1;
                if fed >= config.bb_period {
                    bb_upper.push(Some(out.upper));
                    bb_lower.push(Some(out.lower));
                } else {
                    bb_upper.push(None);
                    bb_lower.push(None);
                }
            }
            _ => {
                bb_upper.push(None);
                bb_lower.push(None);
            }
        }
    }

    candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            let senkou_a = match (tenkan[i], kijun[i]) {
                (Some(t), Some(k)) => Some((t + k) / 2.0),
                _ => None,
            };

            IndicatorSnapshot {
                timestamp: candle.datetime,
                tenkan: tenkan[i],
                kijun: kijun[i],
                senkou_a,
                senkou_b: senkou_b[i],
                momentum: momentum[i],
                bb_upper: bb_upper[i],
                bb_lower: bb_lower[i],
            }
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle {
                datetime: start + Duration::hours(4 * i as i64),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn test_sma() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&values, 3);

        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_relative_eq!(result[2].unwrap(), 2.0);
        assert_relative_eq!(result[3].unwrap(), 3.0);
        assert_relative_eq!(result[4].unwrap(), 4.0);
    }

    #[test]
    fn test_bollinger_bands() {
        let values = vec![20.0, 21.0, 22.0, 21.0, 20.0, 21.0, 22.0, 23.0, 22.0, 21.0];
        let (upper, middle, lower) = bollinger_bands(&values, 5, 2.0);

        assert!(upper[3].is_none());
        assert!(upper[4].is_some());

        // Upper > Middle > Lower
        assert!(upper[4].unwrap() > middle[4].unwrap());
        assert!(middle[4].unwrap() > lower[4].unwrap());
    }

    #[test]
    fn test_midpoint() {
        let high = vec![10.0, 12.0, 11.0, 14.0];
        let low = vec![8.0, 9.0, 7.0, 10.0];
        let result = midpoint(&high, &low, 3);

        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        // Bars 0..=2: highest 12, lowest 7
        assert_relative_eq!(result[2].unwrap(), 9.5);
        // Bars 1..=3: highest 14, lowest 7
        assert_relative_eq!(result[3].unwrap(), 10.5);
    }

    #[test]
    fn test_chikou_momentum() {
        let close = vec![100.0, 102.0, 104.0, 110.0];
        let result = chikou_momentum(&close, 2);

        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        // (104 - 100) / 100 * 100 = 4%
        assert_relative_eq!(result[2].unwrap(), 4.0);
        // (110 - 102) / 102 * 100
        assert_relative_eq!(result[3].unwrap(), 800.0 / 102.0, epsilon = 1e-10);
    }

    #[test]
    fn test_snapshot_warmup_alignment() {
        let config = ChikouBreakoutConfig {
            chikou_period: 3,
            tenkan_period: 2,
            kijun_period: 3,
            senkou_b_period: 4,
            bb_period: 2,
            ..Default::default()
        };

        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let candles = candles_from_closes(&closes);
        let snapshots = compute_snapshots(&candles, &config);

        assert_eq!(snapshots.len(), candles.len());

        // Momentum defined from index chikou_period onward
        assert!(snapshots[2].momentum.is_none());
        assert!(snapshots[3].momentum.is_some());

        // Bands need bb_period momentum values: first at index 3 + (2 - 1)
        assert!(snapshots[3].bb_upper.is_none());
        assert!(snapshots[4].bb_upper.is_some());

        // Senkou B defined from index senkou_b_period - 1
        assert!(snapshots[2].senkou_b.is_none());
        assert!(snapshots[3].senkou_b.is_some());

        assert!(snapshots[4].is_ready());
        assert!(!snapshots[3].is_ready());
    }

    #[test]
    fn test_snapshot_cloud_orientation() {
        let snapshot = IndicatorSnapshot {
            timestamp: Utc::now(),
            tenkan: Some(100.0),
            kijun: Some(100.0),
            senkou_a: Some(90.0),
            senkou_b: Some(100.0),
            momentum: Some(0.0),
            bb_upper: Some(1.0),
            bb_lower: Some(-1.0),
        };

        // Bottom/top ordering holds whichever span is higher
        assert_eq!(snapshot.cloud(), Some((90.0, 100.0)));
    }
}

//! Chikou Breakout Configuration

use serde::{Deserialize, Serialize};

/// Configuration for the Chikou Breakout Strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChikouBreakoutConfig {
    /// Lookback for the Chikou momentum comparison (default: 26)
    #[serde(default = "default_chikou_period")]
    pub chikou_period: usize,

    /// Tenkan-sen midpoint period (default: 9)
    #[serde(default = "default_tenkan_period")]
    pub tenkan_period: usize,

    /// Kijun-sen midpoint period (default: 26)
    #[serde(default = "default_kijun_period")]
    pub kijun_period: usize,

    /// Senkou span B midpoint period (default: 52)
    #[serde(default = "default_senkou_b_period")]
    pub senkou_b_period: usize,

    /// Bollinger Band period over the momentum series (default: 20)
    #[serde(default = "default_bb_period")]
    pub bb_period: usize,

    /// Bollinger Band standard deviation multiplier (default: 2.0)
    #[serde(default = "default_bb_std_dev")]
    pub bb_std_dev: f64,

    /// Fraction of available capital committed per entry (default: 0.8)
    #[serde(default = "default_position_size")]
    pub position_size: f64,

    /// Minimum elapsed time between emitted signals, in hours (default: 12)
    #[serde(default = "default_min_signal_interval_hours")]
    pub min_signal_interval_hours: i64,
}

fn default_chikou_period() -> usize {
    26
}
fn default_tenkan_period() -> usize {
    9
}
fn default_kijun_period() -> usize {
    26
}
fn default_senkou_b_period() -> usize {
    52
}
fn default_bb_period() -> usize {
    20
}
fn default_bb_std_dev() -> f64 {
    2.0
}
fn default_position_size() -> f64 {
    0.8
}
fn default_min_signal_interval_hours() -> i64 {
    12
}

impl Default for ChikouBreakoutConfig {
    fn default() -> Self {
        Self {
            chikou_period: default_chikou_period(),
            tenkan_period: default_tenkan_period(),
            kijun_period: default_kijun_period(),
            senkou_b_period: default_senkou_b_period(),
            bb_period: default_bb_period(),
            bb_std_dev: default_bb_std_dev(),
            position_size: default_position_size(),
            min_signal_interval_hours: default_min_signal_interval_hours(),
        }
    }
}

impl ChikouBreakoutConfig {
    /// Bars of history required before every indicator in the snapshot is defined
    pub fn warmup_bars(&self) -> usize {
        let momentum_ready = self.chikou_period + self.bb_period;
        momentum_ready.max(self.senkou_b_period)
    }
}

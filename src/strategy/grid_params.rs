//! Grid params for the Chikou Breakout optimizer

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Config;

/// Parameter grid over the band and cooldown settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridParams {
    pub bb_periods: Vec<usize>,
    pub bb_std_devs: Vec<f64>,
    pub cooldown_hours: Vec<i64>,
}

impl GridParams {
    /// Quick: 3x3x2 = 18 combinations
    pub fn quick() -> Self {
        Self {
            bb_periods: vec![14, 20, 26],
            bb_std_devs: vec![1.5, 2.0, 2.5],
            cooldown_hours: vec![8, 12],
        }
    }

    /// Full: 5x5x4 = 100 combinations
    pub fn full() -> Self {
        Self {
            bb_periods: vec![10, 14, 20, 26, 34],
            bb_std_devs: vec![1.0, 1.5, 2.0, 2.5, 3.0],
            cooldown_hours: vec![4, 8, 12, 24],
        }
    }

    /// Replace grid axes from the config's optional `grid` section
    pub fn apply_overrides(&mut self, grid: &HashMap<String, Vec<serde_json::Value>>) {
        if let Some(values) = grid.get("bb_period") {
            let parsed: Vec<usize> = values
                .iter()
                .filter_map(|v| v.as_u64().map(|n| n as usize))
                .collect();
            if !parsed.is_empty() {
                self.bb_periods = parsed;
            }
        }
        if let Some(values) = grid.get("bb_std_dev") {
            let parsed: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
            if !parsed.is_empty() {
                self.bb_std_devs = parsed;
            }
        }
        if let Some(values) = grid.get("min_signal_interval_hours") {
            let parsed: Vec<i64> = values.iter().filter_map(|v| v.as_i64()).collect();
            if !parsed.is_empty() {
                self.cooldown_hours = parsed;
            }
        }
    }

    pub fn generate_configs(&self, base: &Config) -> Vec<Config> {
        use itertools::iproduct;

        iproduct!(&self.bb_periods, &self.bb_std_devs, &self.cooldown_hours)
            .map(|(&period, &std_dev, &cooldown)| {
                let mut config = base.clone();
                config.strategy.bb_period = period;
                config.strategy.bb_std_dev = std_dev;
                config.strategy.min_signal_interval_hours = cooldown;
                config
            })
            .collect()
    }

    pub fn total_combinations(&self) -> usize {
        self.bb_periods.len() * self.bb_std_devs.len() * self.cooldown_hours.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_configs_covers_grid() {
        let grid = GridParams::quick();
        let configs = grid.generate_configs(&Config::default());

        assert_eq!(configs.len(), grid.total_combinations());
        assert!(configs
            .iter()
            .any(|c| c.strategy.bb_period == 14 && c.strategy.bb_std_dev == 2.5));
    }

    #[test]
    fn test_apply_overrides() {
        let mut grid = GridParams::quick();
        let mut overrides = HashMap::new();
        overrides.insert(
            "bb_period".to_string(),
            vec![serde_json::json!(10), serde_json::json!(30)],
        );

        grid.apply_overrides(&overrides);
        assert_eq!(grid.bb_periods, vec![10, 30]);
        // Untouched axes keep their preset
        assert_eq!(grid.bb_std_devs, vec![1.5, 2.0, 2.5]);
    }
}

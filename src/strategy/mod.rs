//! Chikou Breakout Strategy
//!
//! Entry on a Chikou-momentum Bollinger Band breakout confirmed by the
//! Ichimoku cloud, exit when price settles back inside the cloud.

pub mod config;
pub mod engine;
pub mod grid_params;

pub use config::ChikouBreakoutConfig;
pub use engine::{SignalEngine, SignalState};
pub use grid_params::GridParams;

//! Chikou Breakout Signal Engine
//!
//! The decision core of the strategy: one `evaluate` call per completed
//! 4-hour bar, combining three gates into an entry/exit decision:
//!
//! 1. Momentum crossing - the Chikou momentum closes outside its Bollinger
//!    Band after being inside it on the previous bar
//! 2. Trend gate - price must sit strictly beyond the Ichimoku cloud on the
//!    breakout side
//! 3. Cooldown gate - entries are suppressed until the minimum interval
//!    since the last emitted signal has elapsed
//!
//! Exits are checked before entries: an open position closes as soon as the
//! bar settles back inside the cloud. An exit claims the whole bar - at most
//! one order intent leaves the engine per bar, so an opposite-direction
//! entry has to wait for a later bar (and for the cooldown, since every
//! non-`None` decision stamps `last_signal_time`).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::indicators::IndicatorSnapshot;
use crate::{Candle, Decision, PositionSide};

use super::config::ChikouBreakoutConfig;

/// Rolling state owned by one strategy run
///
/// Explicitly passed into `evaluate` rather than held behind the engine, so
/// unit tests and parallel backtests over disjoint parameter sets each own
/// an independent instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalState {
    pub prev_momentum: Option<f64>,
    pub prev_bb_upper: Option<f64>,
    pub prev_bb_lower: Option<f64>,
    pub last_signal_time: Option<DateTime<Utc>>,
    pub position: PositionSide,
}

/// Signal engine for the Chikou Breakout strategy
pub struct SignalEngine {
    config: ChikouBreakoutConfig,
}

impl SignalEngine {
    pub fn new(config: ChikouBreakoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChikouBreakoutConfig {
        &self.config
    }

    fn min_signal_interval(&self) -> Duration {
        Duration::hours(self.config.min_signal_interval_hours)
    }

    /// Evaluate one bar and its indicator snapshot against the rolling state
    ///
    /// Bar and snapshot must carry the same timestamp. Missing indicator
    /// values (warm-up) yield `Decision::None`; the momentum/band history
    /// still advances so the first defined crossing is detected correctly.
    pub fn evaluate(
        &self,
        bar: &Candle,
        snapshot: &IndicatorSnapshot,
        state: &mut SignalState,
    ) -> Decision {
        let decision = self.decide(bar, snapshot, state);

        // History advances every bar, whatever was decided
        if snapshot.momentum.is_some() {
            state.prev_momentum = snapshot.momentum;
        }
        if snapshot.bb_upper.is_some() {
            state.prev_bb_upper = snapshot.bb_upper;
        }
        if snapshot.bb_lower.is_some() {
            state.prev_bb_lower = snapshot.bb_lower;
        }

        match decision {
            Decision::EnterLong => {
                state.position = PositionSide::Long;
                state.last_signal_time = Some(bar.datetime);
            }
            Decision::EnterShort => {
                state.position = PositionSide::Short;
                state.last_signal_time = Some(bar.datetime);
            }
            Decision::Exit => {
                state.position = PositionSide::Flat;
                state.last_signal_time = Some(bar.datetime);
            }
            Decision::None => {}
        }

        decision
    }

    fn decide(&self, bar: &Candle, snapshot: &IndicatorSnapshot, state: &SignalState) -> Decision {
        // Exit rule first: a close inside the cloud (boundaries inclusive)
        // ends whichever side is open.
        if let Some((bottom, top)) = snapshot.cloud() {
            if !state.position.is_flat() && bar.close >= bottom && bar.close <= top {
                return Decision::Exit;
            }
        }

        // An opposite signal while a position is open is ignored; only a
        // flat engine looks for entries.
        if !state.position.is_flat() {
            return Decision::None;
        }

        if !self.cooldown_elapsed(bar.datetime, state) {
            return Decision::None;
        }

        let (Some(momentum), Some(upper), Some(lower)) =
            (snapshot.momentum, snapshot.bb_upper, snapshot.bb_lower)
        else {
            return Decision::None;
        };
        let Some((bottom, top)) = snapshot.cloud() else {
            return Decision::None;
        };
        // No previous value yet: no crossing can fire
        let (Some(prev_momentum), Some(prev_upper), Some(prev_lower)) =
            (state.prev_momentum, state.prev_bb_upper, state.prev_bb_lower)
        else {
            return Decision::None;
        };

        if prev_momentum <= prev_upper && momentum > upper && bar.close > top {
            return Decision::EnterLong;
        }

        if prev_momentum >= prev_lower && momentum < lower && bar.close < bottom {
            return Decision::EnterShort;
        }

        Decision::None
    }

    /// Inclusive-exclusive: `elapsed < min_interval` suppresses
    fn cooldown_elapsed(&self, now: DateTime<Utc>, state: &SignalState) -> bool {
        match state.last_signal_time {
            Some(last) => now - last >= self.min_signal_interval(),
            None => true,
        }
    }
}

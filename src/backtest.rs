//! Backtesting engine
//!
//! Bar-by-bar host loop around the signal engine with commission and
//! slippage modeling. Uses T+1 execution: an intent emitted on bar T fills
//! at the open of bar T+1.

use anyhow::Result;
use chrono::{DateTime, Utc};
use statrs::statistics::Statistics;
use tracing::{debug, info};

use crate::data::ensure_strict_order;
use crate::indicators::compute_snapshots;
use crate::strategy::{SignalEngine, SignalState};
use crate::{Candle, Config, Decision, OrderIntent, PerformanceMetrics, Position, Side, Trade};

/// Bars per year on the 4-hour cadence, for annualizing return statistics
const BARS_PER_YEAR: f64 = 365.0 * 6.0;

/// Annual risk-free rate used in the Sharpe ratio
const RISK_FREE_RATE: f64 = 0.05;

/// Backtest engine
pub struct Backtester {
    config: Config,
    engine: SignalEngine,
}

impl Backtester {
    pub fn new(config: Config) -> Self {
        let engine = SignalEngine::new(config.strategy.clone());
        Backtester { config, engine }
    }

    /// Run the backtest over a single symbol's candle series
    ///
    /// The feed contract requires strictly increasing timestamps; violations
    /// are surfaced as errors rather than reordered.
    pub fn run(&mut self, candles: &[Candle]) -> Result<BacktestResult> {
        ensure_strict_order(candles)?;

        let symbol = self.config.symbol();
        let snapshots = compute_snapshots(candles, self.engine.config());

        let mut state = SignalState::default();
        let mut cash = self.config.trading.initial_capital;
        let mut position: Option<Position> = None;
        let mut pending: Option<OrderIntent> = None;
        let mut trades: Vec<Trade> = Vec::new();
        let mut equity_curve: Vec<(DateTime<Utc>, f64)> = Vec::with_capacity(candles.len());

        for (bar, snapshot) in candles.iter().zip(snapshots.iter()) {
            // ================================================================
            // PHASE 1: fill the intent from the previous bar at this open
            // ================================================================
            if let Some(intent) = pending.take() {
                match intent {
                    OrderIntent::OpenLong(fraction) if position.is_none() => {
                        let fill = bar.open * (1.0 + self.config.exchange.assumed_slippage);
                        let quantity = cash * fraction / fill;
                        let commission = quantity * fill * self.config.exchange.taker_fee;
                        cash -= quantity * fill + commission;
                        position = Some(Position {
                            symbol: symbol.clone(),
                            side: Side::Long,
                            entry_price: fill,
                            quantity,
                            entry_time: bar.datetime,
                        });
                        info!(
                            "{} LONG ENTRY for {}: Price={:.2}, Qty={:.6}",
                            bar.datetime.format("%Y-%m-%d %H:%M"),
                            symbol,
                            fill,
                            quantity
                        );
                    }
                    OrderIntent::OpenShort(fraction) if position.is_none() => {
                        let fill = bar.open * (1.0 - self.config.exchange.assumed_slippage);
                        let quantity = cash * fraction / fill;
                        let commission = quantity * fill * self.config.exchange.taker_fee;
                        cash += quantity * fill - commission;
                        position = Some(Position {
                            symbol: symbol.clone(),
                            side: Side::Short,
                            entry_price: fill,
                            quantity,
                            entry_time: bar.datetime,
                        });
                        info!(
                            "{} SHORT ENTRY for {}: Price={:.2}, Qty={:.6}",
                            bar.datetime.format("%Y-%m-%d %H:%M"),
                            symbol,
                            fill,
                            quantity
                        );
                    }
                    OrderIntent::Close => {
                        if let Some(pos) = position.take() {
                            let fill = match pos.side {
                                Side::Long => {
                                    bar.open * (1.0 - self.config.exchange.assumed_slippage)
                                }
                                Side::Short => {
                                    bar.open * (1.0 + self.config.exchange.assumed_slippage)
                                }
                            };
                            let trade = self.close_position(&pos, fill, bar.datetime);
                            match pos.side {
                                Side::Long => cash += pos.quantity * fill,
                                Side::Short => cash -= pos.quantity * fill,
                            }
                            cash -= pos.quantity * fill * self.config.exchange.taker_fee;
                            info!(
                                "{} EXIT for {}: Price={:.2}, PnL={:.2}",
                                bar.datetime.format("%Y-%m-%d %H:%M"),
                                symbol,
                                fill,
                                trade.net_pnl
                            );
                            trades.push(trade);
                        }
                    }
                    // Entry intent while already positioned: contract keeps
                    // at most one position, drop it
                    _ => {}
                }
            }

            // ================================================================
            // PHASE 2: evaluate the engine on this completed bar
            // ================================================================
            let decision = self.engine.evaluate(bar, snapshot, &mut state);

            if decision != Decision::None {
                debug!(
                    "{} decision {:?}: close={:.2}, momentum={:?}, bb_upper={:?}, bb_lower={:?}",
                    bar.datetime.format("%Y-%m-%d %H:%M"),
                    decision,
                    bar.close,
                    snapshot.momentum,
                    snapshot.bb_upper,
                    snapshot.bb_lower
                );
            }

            pending = decision.to_intent(self.config.strategy.position_size);

            let equity = match &position {
                Some(pos) => match pos.side {
                    Side::Long => cash + pos.quantity * bar.close,
                    Side::Short => cash - pos.quantity * bar.close,
                },
                None => cash,
            };
            equity_curve.push((bar.datetime, equity));
        }

        // Force-close anything still open at the final bar
        if let Some(pos) = position.take() {
            let last = candles.last().expect("non-empty candle series");
            let trade = self.close_position(&pos, last.close, last.datetime);
            match pos.side {
                Side::Long => cash += pos.quantity * last.close,
                Side::Short => cash -= pos.quantity * last.close,
            }
            cash -= pos.quantity * last.close * self.config.exchange.taker_fee;
            trades.push(trade);
            if let Some(point) = equity_curve.last_mut() {
                point.1 = cash;
            }
        }

        let metrics = self.calculate_metrics(&trades, &equity_curve);

        Ok(BacktestResult {
            trades,
            equity_curve,
            metrics,
        })
    }

    fn close_position(&self, pos: &Position, exit_price: f64, exit_time: DateTime<Utc>) -> Trade {
        let pnl = pos.unrealized_pnl(exit_price);
        // Taker fee on both entry and exit (round-trip cost)
        let commission = (pos.quantity * pos.entry_price * self.config.exchange.taker_fee)
            + (pos.quantity * exit_price * self.config.exchange.taker_fee);
        let net_pnl = pnl - commission;

        Trade {
            symbol: pos.symbol.clone(),
            side: pos.side,
            entry_price: pos.entry_price,
            exit_price,
            quantity: pos.quantity,
            entry_time: pos.entry_time,
            exit_time,
            pnl,
            commission,
            net_pnl,
        }
    }

    fn calculate_metrics(
        &self,
        trades: &[Trade],
        equity_curve: &[(DateTime<Utc>, f64)],
    ) -> PerformanceMetrics {
        if trades.is_empty() || equity_curve.is_empty() {
            return PerformanceMetrics::default();
        }

        let initial_capital = self.config.trading.initial_capital;
        let final_capital = equity_curve.last().expect("non-empty equity curve").1;
        let total_return = (final_capital - initial_capital) / initial_capital * 100.0;

        let total_commission: f64 = trades.iter().map(|t| t.commission).sum();

        let winning_trades: Vec<&Trade> = trades.iter().filter(|t| t.net_pnl > 0.0).collect();
        let losing_trades: Vec<&Trade> = trades.iter().filter(|t| t.net_pnl <= 0.0).collect();

        let win_rate = winning_trades.len() as f64 / trades.len() as f64 * 100.0;

        let gross_profits: f64 = winning_trades.iter().map(|t| t.net_pnl).sum();
        let gross_losses: f64 = losing_trades.iter().map(|t| t.net_pnl.abs()).sum();

        let profit_factor = if gross_losses > 0.0 {
            gross_profits / gross_losses
        } else if gross_profits > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if winning_trades.is_empty() {
            0.0
        } else {
            gross_profits / winning_trades.len() as f64
        };
        let avg_loss = if losing_trades.is_empty() {
            0.0
        } else {
            gross_losses / losing_trades.len() as f64
        };

        let largest_win = winning_trades.iter().map(|t| t.net_pnl).fold(0.0, f64::max);
        let largest_loss = losing_trades.iter().map(|t| t.net_pnl).fold(0.0, f64::min);

        // Max drawdown over the equity curve
        let mut peak = initial_capital;
        let mut max_dd = 0.0;
        for (_, equity) in equity_curve {
            if *equity > peak {
                peak = *equity;
            }
            let dd = (peak - equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }

        // Sharpe ratio: mean over all bar returns, volatility over active
        // (non-zero) returns only. Flat bars carry no market risk and would
        // deflate the measured volatility.
        let bar_risk_free = RISK_FREE_RATE / BARS_PER_YEAR;

        let all_returns: Vec<f64> = equity_curve
            .windows(2)
            .map(|w| (w[1].1 - w[0].1) / w[0].1)
            .collect();
        let active_returns: Vec<f64> = all_returns.iter().filter(|&&r| r != 0.0).copied().collect();

        let sharpe_ratio = if all_returns.is_empty() || active_returns.len() < 2 {
            0.0
        } else {
            let mean_return = all_returns.iter().mean();
            let std_dev = active_returns.iter().std_dev();
            if std_dev > 0.0 {
                (mean_return - bar_risk_free) / std_dev * BARS_PER_YEAR.sqrt()
            } else {
                0.0
            }
        };

        // Calmar ratio: annualized return over max drawdown
        let calmar_ratio = if max_dd > 0.0 && equity_curve.len() >= 2 {
            let start = equity_curve.first().expect("non-empty equity curve").0;
            let end = equity_curve.last().expect("non-empty equity curve").0;
            let duration_days = (end - start).num_days() as f64;
            if duration_days > 0.0 {
                let duration_years = duration_days / 365.0;
                let annualized =
                    (1.0 + total_return / 100.0).powf(1.0 / duration_years) - 1.0;
                annualized / max_dd
            } else {
                0.0
            }
        } else {
            0.0
        };

        PerformanceMetrics {
            total_return,
            sharpe_ratio,
            calmar_ratio,
            max_drawdown: max_dd * 100.0,
            win_rate,
            profit_factor,
            total_trades: trades.len(),
            winning_trades: winning_trades.len(),
            losing_trades: losing_trades.len(),
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            total_commission,
        }
    }
}

#[derive(Debug, Default)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<(DateTime<Utc>, f64)>,
    pub metrics: PerformanceMetrics,
}

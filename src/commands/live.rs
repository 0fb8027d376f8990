//! Paper Trading Command
//!
//! Host event loop around the signal engine:
//! - Periodic polling of Binance 4-hour klines (public endpoints)
//! - Engine evaluation on each newly completed bar
//! - Paper fills with the configured fee and slippage model
//! - Crash recovery from SQLite checkpoints
//! - Graceful shutdown on ctrl-c
//!
//! No real orders are ever placed; fills are simulated against the bar
//! close.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};

use chikou_breakout::binance::BinanceClient;
use chikou_breakout::indicators::compute_snapshots;
use chikou_breakout::state::{initial_checkpoint, Checkpoint, SqliteStateStore};
use chikou_breakout::strategy::{SignalEngine, SignalState};
use chikou_breakout::{
    data, Candle, Config, Decision, OrderIntent, Position, Side, Symbol, Trade,
};

/// Bars fetched per cycle; covers indicator warm-up plus downtime gaps
const FETCH_WINDOW: u32 = 200;

struct PaperTrader {
    config: Config,
    engine: SignalEngine,
    client: BinanceClient,
    store: SqliteStateStore,
    symbol: Symbol,
    state: SignalState,
    cash: f64,
    position: Option<Position>,
    cycle_count: u32,
    last_bar_time: Option<DateTime<Utc>>,
}

impl PaperTrader {
    fn new(config: Config, state_db: &str) -> Result<Self> {
        let store = SqliteStateStore::open(state_db)?;
        let engine = SignalEngine::new(config.strategy.clone());
        let symbol = config.symbol();

        let checkpoint = match store.load_checkpoint()? {
            Some(checkpoint) => {
                info!(
                    "Recovered checkpoint: cycle={}, cash={:.2}, position={}",
                    checkpoint.cycle_count,
                    checkpoint.cash,
                    checkpoint
                        .position
                        .as_ref()
                        .map(|p| format!("{:?}", p.side))
                        .unwrap_or_else(|| "none".to_string())
                );
                checkpoint
            }
            None => {
                info!("No previous checkpoint found, starting fresh");
                initial_checkpoint(config.trading.initial_capital)
            }
        };

        Ok(PaperTrader {
            client: BinanceClient::new(),
            engine,
            symbol,
            state: checkpoint.signal_state,
            cash: checkpoint.cash,
            position: checkpoint.position,
            cycle_count: checkpoint.cycle_count,
            last_bar_time: checkpoint.last_bar_time,
            config,
            store,
        })
    }

    async fn run_cycle(&mut self) -> Result<()> {
        self.cycle_count += 1;

        let klines = self
            .client
            .get_klines(
                self.symbol.as_str(),
                &self.config.trading.timeframe,
                None,
                None,
                Some(FETCH_WINDOW),
            )
            .await
            .context("Failed to fetch klines")?;

        // The newest kline is still forming; only completed bars are fed
        // to the engine.
        let mut candles: Vec<Candle> = Vec::with_capacity(klines.len().saturating_sub(1));
        for kline in klines.iter().take(klines.len().saturating_sub(1)) {
            match Candle::try_from(kline.clone()) {
                Ok(candle) => candles.push(candle),
                Err(e) => warn!("Rejected kline: {}", e),
            }
        }

        if candles.is_empty() {
            warn!("No completed bars returned this cycle");
            return Ok(());
        }
        data::ensure_strict_order(&candles).context("Feed returned unordered bars")?;

        let snapshots = compute_snapshots(&candles, self.engine.config());

        let mut new_bars = 0usize;
        for (bar, snapshot) in candles.iter().zip(snapshots.iter()) {
            if let Some(last) = self.last_bar_time {
                if bar.datetime <= last {
                    continue;
                }
            }

            new_bars += 1;
            let decision = self.engine.evaluate(bar, snapshot, &mut self.state);
            self.last_bar_time = Some(bar.datetime);

            if decision == Decision::None {
                continue;
            }

            info!(
                "{} decision {:?}: close={:.2}, momentum={:?}",
                bar.datetime.format("%Y-%m-%d %H:%M"),
                decision,
                bar.close,
                snapshot.momentum
            );

            if let Some(intent) = decision.to_intent(self.config.strategy.position_size) {
                self.execute_paper(intent, bar)?;
            }
        }

        let mark = candles.last().expect("non-empty candle series").close;
        let equity = match &self.position {
            Some(pos) => match pos.side {
                Side::Long => self.cash + pos.quantity * mark,
                Side::Short => self.cash - pos.quantity * mark,
            },
            None => self.cash,
        };
        debug!(
            "Cycle {} complete: {} new bars, equity={:.2}",
            self.cycle_count, new_bars, equity
        );

        self.save_checkpoint()?;
        Ok(())
    }

    /// Simulate a fill at the bar close with slippage and taker fee
    fn execute_paper(&mut self, intent: OrderIntent, bar: &Candle) -> Result<()> {
        let slippage = self.config.exchange.assumed_slippage;
        let fee = self.config.exchange.taker_fee;

        match intent {
            OrderIntent::OpenLong(fraction) if self.position.is_none() => {
                let fill = bar.close * (1.0 + slippage);
                let quantity = self.cash * fraction / fill;
                self.cash -= quantity * fill * (1.0 + fee);
                self.position = Some(Position {
                    symbol: self.symbol.clone(),
                    side: Side::Long,
                    entry_price: fill,
                    quantity,
                    entry_time: bar.datetime,
                });
                info!("PAPER LONG ENTRY: price={:.2}, qty={:.6}", fill, quantity);
            }
            OrderIntent::OpenShort(fraction) if self.position.is_none() => {
                let fill = bar.close * (1.0 - slippage);
                let quantity = self.cash * fraction / fill;
                self.cash += quantity * fill * (1.0 - fee);
                self.position = Some(Position {
                    symbol: self.symbol.clone(),
                    side: Side::Short,
                    entry_price: fill,
                    quantity,
                    entry_time: bar.datetime,
                });
                info!("PAPER SHORT ENTRY: price={:.2}, qty={:.6}", fill, quantity);
            }
            OrderIntent::Close => {
                if let Some(pos) = self.position.take() {
                    let fill = match pos.side {
                        Side::Long => bar.close * (1.0 - slippage),
                        Side::Short => bar.close * (1.0 + slippage),
                    };
                    let pnl = pos.unrealized_pnl(fill);
                    let commission = pos.quantity * (pos.entry_price + fill) * fee;
                    match pos.side {
                        Side::Long => self.cash += pos.quantity * fill,
                        Side::Short => self.cash -= pos.quantity * fill,
                    }
                    self.cash -= pos.quantity * fill * fee;

                    let trade = Trade {
                        symbol: pos.symbol.clone(),
                        side: pos.side,
                        entry_price: pos.entry_price,
                        exit_price: fill,
                        quantity: pos.quantity,
                        entry_time: pos.entry_time,
                        exit_time: bar.datetime,
                        pnl,
                        commission,
                        net_pnl: pnl - commission,
                    };
                    info!(
                        "PAPER EXIT: price={:.2}, pnl={:.2}, cash={:.2}",
                        fill, trade.net_pnl, self.cash
                    );
                    self.store.record_trade(&trade)?;
                }
            }
            // Entry intent while positioned: at most one position at a time
            _ => {}
        }

        Ok(())
    }

    fn save_checkpoint(&self) -> Result<()> {
        self.store.save_checkpoint(&Checkpoint {
            timestamp: Utc::now().to_rfc3339(),
            cycle_count: self.cycle_count,
            cash: self.cash,
            signal_state: self.state.clone(),
            position: self.position.clone(),
            last_bar_time: self.last_bar_time,
        })
    }

    fn shutdown(&self) -> Result<()> {
        self.save_checkpoint()?;
        info!(
            "Shutdown complete: {} cycles, cash={:.2}, {} recorded trades",
            self.cycle_count,
            self.cash,
            self.store.trade_count()?
        );
        Ok(())
    }
}

pub fn run(config_path: String, cycle_interval: u64, state_db: String) -> Result<()> {
    let config = Config::from_file(&config_path)?;
    info!("Loaded configuration from: {}", config_path);
    info!("Paper trading mode - no real orders are placed");

    let runtime = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
    runtime.block_on(run_async(config, cycle_interval, state_db))
}

async fn run_async(config: Config, cycle_interval: u64, state_db: String) -> Result<()> {
    let mut trader = PaperTrader::new(config, &state_db)?;

    let mut ticker = interval(Duration::from_secs(cycle_interval));

    info!(
        "Paper trader started: {} {}, cycle every {}s",
        trader.symbol, trader.config.trading.timeframe, cycle_interval
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = trader.run_cycle().await {
                    warn!("Cycle failed: {:#}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received ctrl-c, shutting down");
                break;
            }
        }
    }

    trader.shutdown()
}

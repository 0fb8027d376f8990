//! Checkpoint store for the paper-trading runner
//!
//! SQLite-backed persistence so a restarted runner resumes with the same
//! signal state, paper position, and cash instead of re-warming from flat.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::strategy::SignalState;
use crate::{Position, Trade};

/// One recoverable snapshot of the runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub timestamp: String,
    pub cycle_count: u32,
    pub cash: f64,
    pub signal_state: SignalState,
    pub position: Option<Position>,
    /// Newest completed bar already fed to the engine
    pub last_bar_time: Option<chrono::DateTime<Utc>>,
}

/// SQLite checkpoint and trade-audit store
pub struct SqliteStateStore {
    conn: Connection,
}

impl SqliteStateStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create state directory")?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")?;

        let store = Self { conn };
        store.create_tables()?;

        info!("State database ready at {}", db_path.display());
        Ok(store)
    }

    fn create_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                cycle_count INTEGER NOT NULL,
                cash REAL NOT NULL,
                signal_state TEXT NOT NULL,
                position TEXT,
                last_bar_time TEXT
            );
            CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                quantity REAL NOT NULL,
                entry_price REAL NOT NULL,
                exit_price REAL NOT NULL,
                entry_time TEXT NOT NULL,
                exit_time TEXT NOT NULL,
                pnl REAL NOT NULL,
                commission REAL NOT NULL,
                net_pnl REAL NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Persist the latest runner snapshot
    pub fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        let signal_state = serde_json::to_string(&checkpoint.signal_state)?;
        let position = checkpoint
            .position
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT INTO checkpoints (timestamp, cycle_count, cash, signal_state, position, last_bar_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                checkpoint.timestamp,
                checkpoint.cycle_count,
                checkpoint.cash,
                signal_state,
                position,
                checkpoint.last_bar_time.map(|t| t.to_rfc3339()),
            ],
        )?;

        debug!(
            "Checkpoint saved: cycle={}, cash={:.2}",
            checkpoint.cycle_count, checkpoint.cash
        );
        Ok(())
    }

    /// Load the most recent checkpoint, if any
    pub fn load_checkpoint(&self) -> Result<Option<Checkpoint>> {
        let row = self
            .conn
            .query_row(
                "SELECT timestamp, cycle_count, cash, signal_state, position, last_bar_time
                 FROM checkpoints ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((timestamp, cycle_count, cash, signal_state, position, last_bar_time)) = row
        else {
            return Ok(None);
        };

        Ok(Some(Checkpoint {
            timestamp,
            cycle_count,
            cash,
            signal_state: serde_json::from_str(&signal_state)
                .context("Corrupt signal_state in checkpoint")?,
            position: position
                .map(|p| serde_json::from_str(&p))
                .transpose()
                .context("Corrupt position in checkpoint")?,
            last_bar_time: last_bar_time
                .and_then(|t| chrono::DateTime::parse_from_rfc3339(&t).ok())
                .map(|t| t.with_timezone(&Utc)),
        }))
    }

    /// Append a completed paper trade to the audit trail
    pub fn record_trade(&self, trade: &Trade) -> Result<()> {
        self.conn.execute(
            "INSERT INTO trades (symbol, side, quantity, entry_price, exit_price,
                                 entry_time, exit_time, pnl, commission, net_pnl)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                trade.symbol.as_str(),
                format!("{:?}", trade.side),
                trade.quantity,
                trade.entry_price,
                trade.exit_price,
                trade.entry_time.to_rfc3339(),
                trade.exit_time.to_rfc3339(),
                trade.pnl,
                trade.commission,
                trade.net_pnl,
            ],
        )?;
        Ok(())
    }

    pub fn trade_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM trades", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Fresh checkpoint for a runner starting from scratch
pub fn initial_checkpoint(cash: f64) -> Checkpoint {
    Checkpoint {
        timestamp: Utc::now().to_rfc3339(),
        cycle_count: 0,
        cash,
        signal_state: SignalState::default(),
        position: None,
        last_bar_time: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PositionSide, Side, Symbol};
    use chrono::{TimeZone, Utc};

    fn temp_db(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join("chikou_breakout_state_test")
            .join(format!("{}.db", name))
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let path = temp_db("checkpoint");
        std::fs::remove_file(&path).ok();
        let store = SqliteStateStore::open(&path).unwrap();

        assert!(store.load_checkpoint().unwrap().is_none());

        let mut checkpoint = initial_checkpoint(100_000.0);
        checkpoint.cycle_count = 7;
        checkpoint.signal_state.position = PositionSide::Long;
        checkpoint.signal_state.prev_momentum = Some(1.25);
        checkpoint.position = Some(Position {
            symbol: Symbol::new("BTCUSDT"),
            side: Side::Long,
            entry_price: 50_000.0,
            quantity: 1.6,
            entry_time: Utc::now(),
        });
        let bar_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        checkpoint.last_bar_time = Some(bar_time);

        store.save_checkpoint(&checkpoint).unwrap();
        let loaded = store.load_checkpoint().unwrap().unwrap();

        assert_eq!(loaded.cycle_count, 7);
        assert_eq!(loaded.signal_state.position, PositionSide::Long);
        assert_eq!(loaded.signal_state.prev_momentum, Some(1.25));
        assert_eq!(loaded.position.unwrap().entry_price, 50_000.0);
        assert_eq!(loaded.last_bar_time, Some(bar_time));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_latest_checkpoint_wins() {
        let path = temp_db("latest");
        std::fs::remove_file(&path).ok();
        let store = SqliteStateStore::open(&path).unwrap();

        let mut first = initial_checkpoint(100_000.0);
        first.cycle_count = 1;
        store.save_checkpoint(&first).unwrap();

        let mut second = initial_checkpoint(98_000.0);
        second.cycle_count = 2;
        store.save_checkpoint(&second).unwrap();

        let loaded = store.load_checkpoint().unwrap().unwrap();
        assert_eq!(loaded.cycle_count, 2);
        assert_eq!(loaded.cash, 98_000.0);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_record_trade() {
        let path = temp_db("trades");
        std::fs::remove_file(&path).ok();
        let store = SqliteStateStore::open(&path).unwrap();

        let trade = Trade {
            symbol: Symbol::new("BTCUSDT"),
            side: Side::Short,
            entry_price: 50_000.0,
            exit_price: 48_000.0,
            quantity: 1.0,
            entry_time: Utc::now(),
            exit_time: Utc::now(),
            pnl: 2_000.0,
            commission: 98.0,
            net_pnl: 1_902.0,
        };

        store.record_trade(&trade).unwrap();
        assert_eq!(store.trade_count().unwrap(), 1);

        std::fs::remove_file(&path).ok();
    }
}

//! Performance benchmarks for chikou-breakout
//!
//! Run with: `cargo bench`
//! View results: `open target/criterion/report/index.html`

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chikou_breakout::backtest::Backtester;
use chikou_breakout::indicators::compute_snapshots;
use chikou_breakout::strategy::{ChikouBreakoutConfig, SignalEngine, SignalState};
use chikou_breakout::{Candle, Config};

/// Two years of synthetic 4-hour bars with a slow oscillation
fn synthetic_candles(count: usize) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let phase = i as f64 / 90.0;
            let close = 50_000.0 + 8_000.0 * phase.sin() + 50.0 * (i % 7) as f64;
            Candle {
                datetime: start + Duration::hours(4 * i as i64),
                open: close - 20.0,
                high: close + 120.0,
                low: close - 120.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

fn benchmark_snapshots(c: &mut Criterion) {
    let candles = synthetic_candles(4380);
    let config = ChikouBreakoutConfig::default();

    c.bench_function("compute_snapshots_2y", |b| {
        b.iter(|| compute_snapshots(black_box(&candles), &config))
    });
}

fn benchmark_engine(c: &mut Criterion) {
    let candles = synthetic_candles(4380);
    let config = ChikouBreakoutConfig::default();
    let snapshots = compute_snapshots(&candles, &config);
    let engine = SignalEngine::new(config);

    c.bench_function("engine_evaluate_2y", |b| {
        b.iter(|| {
            let mut state = SignalState::default();
            for (bar, snapshot) in candles.iter().zip(snapshots.iter()) {
                black_box(engine.evaluate(bar, snapshot, &mut state));
            }
        })
    });
}

fn benchmark_backtest(c: &mut Criterion) {
    let candles = synthetic_candles(4380);

    c.bench_function("backtest_2y", |b| {
        b.iter(|| {
            let mut backtester = Backtester::new(Config::default());
            black_box(backtester.run(black_box(&candles)).unwrap())
        })
    });
}

criterion_group!(benches, benchmark_snapshots, benchmark_engine, benchmark_backtest);
criterion_main!(benches);

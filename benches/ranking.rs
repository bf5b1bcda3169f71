// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! Ranking benchmarks: ledger merge sort, leaderboard heap sort, statistics.

use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use stocksim::ledger::sort_transactions;
use stocksim::ranking::{heap_sort_by, merge_sort_by, simple_returns, volatility};
use stocksim::{
    Leaderboard, Player, Price, RankMetric, RiskLevel, Side, SortKey, Symbol, Transaction,
    TransactionLedger,
};

const SYMBOLS: [&str; 8] = ["AAPL", "GOOGL", "MSFT", "TSLA", "AMZN", "META", "NVDA", "NFLX"];

/// A ledger of `n` trades with timestamps in a deterministic scrambled order.
fn build_ledger(n: usize) -> TransactionLedger {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut ledger = TransactionLedger::new();
    for i in 0..n {
        let minutes = (i * 7919 % n) as i64;
        let side = if i % 3 == 0 { Side::Sell } else { Side::Buy };
        let tx = Transaction::trade(
            side,
            Symbol::new(SYMBOLS[i % SYMBOLS.len()]),
            (i % 50 + 1) as u64,
            Price(100_00 + (i % 500) as i64),
            start + Duration::minutes(minutes),
        )
        .unwrap();
        ledger.append(tx);
    }
    ledger
}

fn user() -> Player {
    Player {
        id: "user".into(),
        name: "You".into(),
        portfolio_value: 10_000_00,
        daily_change: 0.0,
        total_gain: 0,
        trades: 0,
        risk_level: RiskLevel::Medium,
        strategy: None,
    }
}

fn bench_merge_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_sort");

    for n in [100, 1_000, 10_000] {
        let values: Vec<u64> = (0..n as u64).map(|i| i * 2_654_435_761 % 1_000_003).collect();
        group.bench_with_input(BenchmarkId::new("u64", n), &values, |b, values| {
            b.iter(|| merge_sort_by(black_box(values), |x, y| x.cmp(y)));
        });
    }

    let ledger = build_ledger(1_000);
    let view: Vec<&Transaction> = ledger.entries().iter().collect();
    for key in [SortKey::DateDesc, SortKey::Symbol, SortKey::AmountDesc] {
        group.bench_with_input(
            BenchmarkId::new("ledger_1000", format!("{key:?}")),
            &view,
            |b, view| b.iter(|| sort_transactions(black_box(view), key)),
        );
    }

    group.finish();
}

fn bench_heap_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("heap_sort");

    for n in [100, 1_000, 10_000] {
        let values: Vec<u64> = (0..n as u64).map(|i| i * 2_654_435_761 % 1_000_003).collect();
        group.bench_with_input(BenchmarkId::new("u64", n), &values, |b, values| {
            b.iter(|| {
                let mut v = values.clone();
                heap_sort_by(&mut v, |x, y| x.cmp(y));
                v
            });
        });
    }

    let mut rng = StdRng::seed_from_u64(42);
    let board = Leaderboard::with_simulated_rivals(user(), &mut rng);
    for metric in [RankMetric::TotalValue, RankMetric::RiskAdjusted] {
        group.bench_function(BenchmarkId::new("leaderboard", format!("{metric:?}")), |b| {
            b.iter(|| black_box(&board).rank(metric, None).len());
        });
    }

    group.finish();
}

fn bench_ledger_append(c: &mut Criterion) {
    c.bench_function("ledger_rebuild_1000", |b| {
        b.iter(|| build_ledger(black_box(1_000)).len());
    });
}

fn bench_volatility(c: &mut Criterion) {
    let values: Vec<f64> = (0..100)
        .map(|i| 10_000_00.0 * (1.0 + (i as f64 * 0.37).sin() * 0.02))
        .collect();
    c.bench_function("volatility_100_samples", |b| {
        b.iter(|| volatility(&simple_returns(black_box(&values))));
    });
}

criterion_group!(
    benches,
    bench_merge_sort,
    bench_heap_sort,
    bench_ledger_append,
    bench_volatility
);
criterion_main!(benches);

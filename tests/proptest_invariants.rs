// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! Property-based tests for desk, sort, and ring-buffer invariants.
//!
//! These tests use proptest to verify that key invariants hold
//! across randomly generated scenarios.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use stocksim::ranking::{heap_sort_by, is_sorted_by, merge_sort_by};
use stocksim::{BalanceHistory, BalanceSample, DeskConfig, PriceFeed, Side, Symbol, TradingDesk};

const SYMBOLS: [&str; 4] = ["AAPL", "MSFT", "NVDA", "TSLA"];

#[derive(Clone, Debug)]
enum Op {
    Trade(Side, usize, u64),
    Undo,
    Tick(u64),
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (side_strategy(), 0..SYMBOLS.len(), 1u64..=40).prop_map(|(s, i, q)| Op::Trade(s, i, q)),
        1 => (side_strategy(), 0..SYMBOLS.len(), any::<u64>()).prop_map(|(s, i, q)| Op::Trade(s, i, q)),
        2 => Just(Op::Undo),
        1 => any::<u64>().prop_map(Op::Tick),
    ]
}

fn desk() -> TradingDesk {
    TradingDesk::new(DeskConfig::default(), PriceFeed::default_universe())
}

fn assert_account_invariants(desk: &TradingDesk) -> Result<(), TestCaseError> {
    prop_assert!(desk.portfolio().cash() >= 0, "negative cash {}", desk.portfolio().cash());
    for h in desk.portfolio().holdings() {
        prop_assert!(h.quantity > 0, "empty holding for {}", h.symbol);
        prop_assert!(h.avg_cost > 0.0);
    }
    prop_assert_eq!(
        desk.total_value(),
        desk.portfolio().cash() + desk.market_value()
    );
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // ========================================================================
    // ACCOUNT INVARIANTS
    // ========================================================================

    /// Cash never goes negative and every holding stays non-empty, whatever
    /// mix of trades, undos and price moves is applied.
    #[test]
    fn account_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut d = desk();
        for op in ops {
            let before = d.portfolio().clone();
            let ledger_len = d.ledger().len();
            let result = match op {
                Op::Trade(side, i, qty) => d
                    .confirm(side, Symbol::new(SYMBOLS[i]), qty)
                    .and_then(|_| d.execute_all().map(|_| ())),
                Op::Undo => d.undo().map(|_| ()),
                Op::Tick(seed) => {
                    d.tick_prices(&mut StdRng::seed_from_u64(seed));
                    Ok(())
                }
            };
            if result.is_err() {
                prop_assert_eq!(d.portfolio(), &before);
                prop_assert_eq!(d.ledger().len(), ledger_len);
            }
            assert_account_invariants(&d)?;
        }
    }

    /// A buy followed by its undo leaves cash and holdings exactly as before.
    #[test]
    fn buy_then_undo_is_identity(
        setup in prop::collection::vec((0..SYMBOLS.len(), 1u64..=3), 0..5),
        i in 0..SYMBOLS.len(),
        qty in 1u64..=10,
    ) {
        let mut d = desk();
        for (j, q) in setup {
            d.confirm(Side::Buy, Symbol::new(SYMBOLS[j]), q).unwrap();
        }
        d.execute_all().unwrap();
        let before = d.portfolio().clone();

        d.confirm(Side::Buy, Symbol::new(SYMBOLS[i]), qty).unwrap();
        d.execute_all().unwrap();
        d.undo().unwrap();

        prop_assert_eq!(d.portfolio(), &before);
    }

    // ========================================================================
    // SORTING
    // ========================================================================

    /// Merge sort agrees with the standard library's stable sort.
    #[test]
    fn merge_sort_matches_std_stable_sort(items in prop::collection::vec((0u8..8, any::<u16>()), 0..200)) {
        let ours = merge_sort_by(&items, |a, b| a.0.cmp(&b.0));
        let mut expected = items.clone();
        expected.sort_by(|a, b| a.0.cmp(&b.0));
        prop_assert_eq!(ours, expected);
    }

    /// Sorting an already sorted list changes nothing.
    #[test]
    fn sorting_is_idempotent(items in prop::collection::vec((0u8..8, any::<u16>()), 0..200)) {
        let once = merge_sort_by(&items, |a, b| b.0.cmp(&a.0));
        let twice = merge_sort_by(&once, |a, b| b.0.cmp(&a.0));
        prop_assert_eq!(&once, &twice);

        let mut heap = items.clone();
        heap_sort_by(&mut heap, |a, b| a.cmp(b));
        let snapshot = heap.clone();
        heap_sort_by(&mut heap, |a, b| a.cmp(b));
        prop_assert_eq!(heap, snapshot);
    }

    /// Heap sort yields an ascending permutation of its input.
    #[test]
    fn heap_sort_sorts(mut items in prop::collection::vec(any::<i32>(), 0..300)) {
        let mut expected = items.clone();
        expected.sort_unstable();
        heap_sort_by(&mut items, |a, b| a.cmp(b));
        prop_assert!(is_sorted_by(&items, |a, b| a.cmp(b)));
        prop_assert_eq!(items, expected);
    }

    // ========================================================================
    // BALANCE HISTORY
    // ========================================================================

    /// After `cap + extra` inserts exactly `cap` samples remain: the newest
    /// ones, oldest first.
    #[test]
    fn ring_buffer_keeps_newest(cap in 1usize..64, extra in 0usize..64) {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let total = cap + extra;
        let mut history = BalanceHistory::with_capacity(cap);
        for i in 0..total {
            history.add_sample(BalanceSample {
                time: start + Duration::minutes(i as i64),
                value: i as i64,
            });
        }
        prop_assert_eq!(history.len(), cap);
        let values: Vec<i64> = history.samples().iter().map(|s| s.value).collect();
        let expected: Vec<i64> = (extra..total).map(|v| v as i64).collect();
        prop_assert_eq!(values, expected);
        prop_assert_eq!(history.latest().map(|s| s.value), Some(total as i64 - 1));
    }
}

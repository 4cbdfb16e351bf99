//! Property tests for rolling-window invariants.
//!
//! Uses proptest to verify:
//! 1. Dedup — a merged window never holds two records for one date
//! 2. Truncation — at most 20 records, exactly the 20 most recent distinct dates
//! 3. Averages — every ma field matches a brute-force recomputation over the union
//! 4. Idempotence — deriving twice changes nothing
//! 5. Overwrite — an incoming record replaces the stored one of its date
//! 6. Empty batch — merging nothing returns the window unchanged

use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use stockwatch_core::domain::{QuoteRecord, RollingWindow, WINDOW_CAPACITY};
use stockwatch_core::engine::{derive, merge, round_cents, WindowMerger};

const SYMBOL: &str = "005930";

// ── Strategies (proptest) ────────────────────────────────────────────

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
}

fn arb_close() -> impl Strategy<Value = f64> {
    (1.0..1000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

/// A fetched batch: possibly unordered, possibly duplicated dates, some rows
/// without a close.
fn arb_batch() -> impl Strategy<Value = Vec<QuoteRecord>> {
    prop::collection::vec(
        (0i64..60, prop::option::weighted(0.9, arb_close())),
        0..40,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(offset, close)| {
                let mut rec = QuoteRecord::new(SYMBOL, day(offset), 0.0);
                rec.close = close;
                rec
            })
            .collect()
    })
}

fn arb_window() -> impl Strategy<Value = RollingWindow> {
    arb_batch().prop_map(|batch| merge(RollingWindow::empty(SYMBOL), batch).unwrap())
}

/// Date → close after applying `incoming` over `existing`, last write wins.
fn union_closes(existing: &RollingWindow, incoming: &[QuoteRecord]) -> BTreeMap<NaiveDate, f64> {
    let mut union: BTreeMap<NaiveDate, f64> = existing
        .records()
        .iter()
        .filter_map(|r| r.close.map(|c| (r.date, c)))
        .collect();
    for r in incoming {
        if let Some(c) = r.close {
            union.insert(r.date, c);
        }
    }
    union
}

fn brute_force_ma(closes: &[f64], i: usize, period: usize) -> Option<f64> {
    if i + 1 < period {
        return None;
    }
    let tail = &closes[i + 1 - period..=i];
    Some(round_cents(tail.iter().sum::<f64>() / period as f64))
}

// ── 1–3. Merge invariants ────────────────────────────────────────────

proptest! {
    #[test]
    fn merged_dates_are_unique(existing in arb_window(), incoming in arb_batch()) {
        let window = merge(existing, incoming).unwrap();
        let dates: BTreeSet<_> = window.records().iter().map(|r| r.date).collect();
        prop_assert_eq!(dates.len(), window.len());
    }

    #[test]
    fn keeps_exactly_the_most_recent_dates(existing in arb_window(), incoming in arb_batch()) {
        let union = union_closes(&existing, &incoming);
        let window = merge(existing, incoming).unwrap();

        prop_assert!(window.len() <= WINDOW_CAPACITY);

        let expected: Vec<NaiveDate> = union.keys().rev().take(WINDOW_CAPACITY).copied().collect();
        let actual: Vec<NaiveDate> = window.records().iter().map(|r| r.date).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn averages_match_brute_force(existing in arb_window(), incoming in arb_batch()) {
        // a batch with no usable close leaves the stored averages alone
        prop_assume!(incoming.iter().any(|r| r.close.is_some()));
        let union = union_closes(&existing, &incoming);
        let closes: Vec<f64> = union.values().copied().collect();
        let index: BTreeMap<NaiveDate, usize> =
            union.keys().enumerate().map(|(i, d)| (*d, i)).collect();

        let window = merge(existing, incoming).unwrap();
        for rec in window.records() {
            let i = index[&rec.date];
            prop_assert_eq!(rec.close, Some(closes[i]));
            prop_assert_eq!(rec.ma5, brute_force_ma(&closes, i, 5));
            prop_assert_eq!(rec.ma10, brute_force_ma(&closes, i, 10));
            prop_assert_eq!(rec.ma20, brute_force_ma(&closes, i, 20));
        }
    }
}

// ── 4. Idempotence ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn derive_is_idempotent(window in arb_window()) {
        let once = derive(window.into_ascending());
        let twice = derive(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn derive_ignores_stale_averages(window in arb_window(), junk in arb_close()) {
        let clean = derive(window.clone().into_ascending());
        let mut dirty = window.into_ascending();
        for r in &mut dirty {
            r.ma5 = Some(junk);
            r.ma10 = None;
            r.ma20 = Some(-junk);
        }
        prop_assert_eq!(derive(dirty), clean);
    }
}

// ── 5–6. Overwrite and empty batches ─────────────────────────────────

proptest! {
    #[test]
    fn incoming_record_replaces_stored_one(
        existing in arb_window(),
        pick in any::<prop::sample::Index>(),
        close in arb_close(),
    ) {
        prop_assume!(!existing.is_empty());
        let target = existing.records()[pick.index(existing.len())].date;
        let replacement = QuoteRecord::new(SYMBOL, target, close).with_volume(42);

        let report = WindowMerger::default().merge(existing, vec![replacement]).unwrap();
        let rec = report.window.get(target).unwrap();
        prop_assert_eq!(rec.close, Some(close));
        prop_assert_eq!(rec.volume, Some(42));
        prop_assert_eq!(report.replaced, vec![target]);
    }

    #[test]
    fn empty_batch_is_identity(existing in arb_window()) {
        let window = merge(existing.clone(), Vec::new()).unwrap();
        prop_assert_eq!(window.fingerprint(), existing.fingerprint());
        prop_assert_eq!(window, existing);
    }

    #[test]
    fn remerging_own_records_settles(existing in arb_window()) {
        let settled = merge(existing.clone(), existing.into_ascending()).unwrap();
        let again = merge(settled.clone(), settled.clone().into_ascending()).unwrap();
        prop_assert_eq!(again, settled);
    }
}

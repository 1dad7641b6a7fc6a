//! Property tests for level pipeline and indicator invariants.
//!
//! Uses proptest to verify:
//! 1. Combination is idempotent, commutative and associative
//! 2. RSI stays within [0, 100] and saturates on one-sided moves
//! 3. Pivot arithmetic orders the derived levels
//! 4. Clustering is deterministic and returns a sorted, unique set
//! 5. RSI filtering keeps only one side of the reference price

use pivotlab_core::domain::PriceBar;
use pivotlab_core::indicators::{latest_rsi, wilder_rsi};
use pivotlab_core::levels::{combine_levels, filter_levels, pivot_point, LevelExtractor};
use pivotlab_core::AnalysisError;
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (0.5..2.0_f64).prop_map(|p| (p * 10_000.0).round() / 10_000.0)
}

fn arb_level_set() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_price(), 0..20)
}

fn arb_bar() -> impl Strategy<Value = PriceBar> {
    (arb_price(), 0.0..0.05_f64, 0.0..1.0_f64).prop_map(|(low, range, frac)| {
        let high = low + range;
        let close = low + range * frac;
        let timestamp = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        PriceBar::new(timestamp, close, high, low, close, 1000.0)
    })
}

// ── 1. Combination algebra ───────────────────────────────────────────

proptest! {
    #[test]
    fn combine_is_idempotent(a in arb_level_set()) {
        let once = combine_levels(&[a.clone()]);
        let twice = combine_levels(&[once.clone(), once.clone()]);
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(combine_levels(&[a.clone(), a]), once);
    }

    #[test]
    fn combine_is_commutative(a in arb_level_set(), b in arb_level_set()) {
        prop_assert_eq!(
            combine_levels(&[a.clone(), b.clone()]),
            combine_levels(&[b, a])
        );
    }

    #[test]
    fn combine_is_associative(a in arb_level_set(), b in arb_level_set(), c in arb_level_set()) {
        let left = combine_levels(&[combine_levels(&[a.clone(), b.clone()]), c.clone()]);
        let right = combine_levels(&[a, combine_levels(&[b, c])]);
        prop_assert_eq!(left, right);
    }

    #[test]
    fn combined_output_is_strictly_increasing(a in arb_level_set(), b in arb_level_set()) {
        let out = combine_levels(&[a, b]);
        prop_assert!(out.windows(2).all(|w| w[0] < w[1]));
    }
}

// ── 2. RSI bounds ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn rsi_is_bounded(closes in prop::collection::vec(arb_price(), 15..80)) {
        for v in wilder_rsi(&closes, 14).into_iter().filter(|v| !v.is_nan()) {
            prop_assert!((0.0..=100.0).contains(&v), "rsi {} out of bounds", v);
        }
    }

    #[test]
    fn rsi_saturates_on_one_sided_moves(start in arb_price(), step in 0.0001..0.01_f64, n in 15..60usize) {
        let up: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
        let down: Vec<f64> = (0..n).map(|i| start - step * i as f64).collect();
        prop_assert_eq!(latest_rsi(&up, 14).unwrap(), 100.0);
        prop_assert_eq!(latest_rsi(&down, 14).unwrap(), 0.0);
    }

    #[test]
    fn rsi_needs_window_plus_one(n in 0..15usize) {
        let closes = vec![1.0; n];
        let is_insufficient = matches!(
            latest_rsi(&closes, 14),
            Err(AnalysisError::InsufficientData { .. })
        );
        prop_assert!(is_insufficient);
    }
}

// ── 3. Pivot arithmetic ──────────────────────────────────────────────

proptest! {
    #[test]
    fn pivot_levels_are_ordered(bar in arb_bar()) {
        let p = pivot_point(&bar);
        let eps = 1e-12;
        prop_assert!(p.support2 <= p.support1 + eps);
        prop_assert!(p.support1 <= p.pivot + eps);
        prop_assert!(p.pivot <= p.resistance1 + eps);
        prop_assert!(p.resistance1 <= p.resistance2 + eps);
        prop_assert!(((p.resistance2 - p.support2) - 2.0 * (bar.high - bar.low)).abs() < 1e-9);
    }
}

// ── 4. Clustering determinism ────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn clustering_is_deterministic_and_sorted(
        obs in prop::collection::vec(arb_price(), 5..60),
        seed in 0..1000u64,
    ) {
        let extractor = LevelExtractor::new(5, seed);
        match extractor.extract(&obs) {
            Ok(levels) => {
                prop_assert!(!levels.is_empty() && levels.len() <= 5);
                prop_assert!(levels.windows(2).all(|w| w[0] < w[1]));
                let mut reversed = obs.clone();
                reversed.reverse();
                prop_assert_eq!(extractor.extract(&reversed).unwrap(), levels);
            }
            Err(AnalysisError::InsufficientData { required, available, .. }) => {
                prop_assert_eq!(required, 5);
                prop_assert!(available < 5);
            }
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }
    }
}

// ── 5. RSI filter sidedness ──────────────────────────────────────────

proptest! {
    #[test]
    fn filter_keeps_one_side(levels in arb_level_set(), price in arb_price(), rsi in 0.0..100.0_f64) {
        let out = filter_levels(&levels, rsi, price, 50.0);
        if rsi > 50.0 {
            prop_assert!(out.iter().all(|&l| l > price));
        } else if rsi < 50.0 {
            prop_assert!(out.iter().all(|&l| l < price));
        } else {
            prop_assert_eq!(&out, &levels);
        }
        prop_assert!(out.len() <= levels.len());
    }
}

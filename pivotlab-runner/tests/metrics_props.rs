//! Property tests for the performance metrics.

use pivotlab_runner::metrics::{max_drawdown, total_return};
use proptest::prelude::*;

fn equity_curve() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..1_000_000.0, 2..200)
}

// ── Drawdown ──

proptest! {
    #[test]
    fn drawdown_is_a_non_positive_fraction(eq in equity_curve()) {
        let dd = max_drawdown(&eq);
        prop_assert!(dd <= 0.0);
        prop_assert!(dd > -1.0);
    }

    #[test]
    fn sorted_curve_has_no_drawdown(mut eq in equity_curve()) {
        eq.sort_by(|a, b| a.total_cmp(b));
        prop_assert_eq!(max_drawdown(&eq), 0.0);
    }
}

// ── Return ──

proptest! {
    #[test]
    fn total_return_matches_endpoints(eq in equity_curve()) {
        let expected = eq[eq.len() - 1] / eq[0] - 1.0;
        prop_assert!((total_return(&eq) - expected).abs() < 1e-9 * expected.abs().max(1.0));
    }
}

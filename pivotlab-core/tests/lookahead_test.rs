//! Look-ahead contamination tests for every indicator.
//!
//! Invariant: no indicator value at bar t may depend on price data from bar
//! t+1 or later.
//!
//! Method: compute on truncated series (bars 0..100) and full series (bars
//! 0..200). Assert bars 0..100 are identical between both runs. Any
//! difference means the indicator is leaking future data into past values.

use chrono::NaiveDate;
use pivotlab_core::domain::PriceBar;
use pivotlab_core::engine::{run_strategy, StrategyConfig};
use pivotlab_core::indicators::*;

/// Generate N bars of synthetic OHLCV data with realistic variation.
fn make_test_bars(n: usize) -> Vec<PriceBar> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut bars = Vec::with_capacity(n);
    let mut price = 1.2;

    for i in 0..n {
        // Deterministic pseudo-random walk using a simple LCG
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
        let change = ((seed % 200) as f64 - 100.0) * 0.0001;
        price += change;
        price = price.max(0.5);

        let open = price - 0.0005;
        let close = price + 0.0003;
        bars.push(PriceBar {
            timestamp: base + chrono::Duration::hours(i as i64),
            open,
            high: open.max(close) + 0.002,
            low: open.min(close) - 0.002,
            close,
            volume: 1000.0 + i as f64 * 10.0,
        });
    }

    bars
}

fn assert_no_lookahead(indicator: &dyn Indicator, full_bars: &[PriceBar], truncated_len: usize) {
    let truncated = &full_bars[..truncated_len];
    let full_result = indicator.compute(full_bars);
    let truncated_result = indicator.compute(truncated);

    assert_eq!(truncated_result.len(), truncated_len, "{}: truncated length", indicator.name());
    assert_eq!(full_result.len(), full_bars.len(), "{}: full length", indicator.name());

    for i in 0..truncated_len {
        let t = truncated_result[i];
        let f = full_result[i];

        if t.is_nan() && f.is_nan() {
            continue;
        }

        assert!(
            !t.is_nan() && !f.is_nan(),
            "{}: NaN mismatch at bar {i} (truncated={t}, full={f})",
            indicator.name()
        );
        assert!(
            (t - f).abs() < 1e-10,
            "{}: look-ahead contamination at bar {i}: truncated={t}, full={f}",
            indicator.name()
        );
    }
}

#[test]
fn lookahead_sma() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Sma::new(10), &bars, 100);
    assert_no_lookahead(&Sma::new(50), &bars, 100);
}

#[test]
fn lookahead_atr() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Atr::new(14), &bars, 100);
    assert_no_lookahead(&Atr::new(5), &bars, 100);
}

#[test]
fn lookahead_rsi() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Rsi::new(14), &bars, 100);
    assert_no_lookahead(&Rsi::new(7), &bars, 100);
}

#[test]
fn lookahead_bollinger() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Bollinger::upper(50, 2.1), &bars, 100);
    assert_no_lookahead(&Bollinger::middle(50, 2.1), &bars, 100);
    assert_no_lookahead(&Bollinger::lower(50, 2.1), &bars, 100);
}

/// Decisions up to bar t are unchanged by appending later bars: every fill of
/// the truncated run also appears, identically, in the full run.
#[test]
fn strategy_fills_are_prefix_stable() {
    let bars = make_test_bars(400);
    let config = StrategyConfig {
        sma_short_period: 10,
        sma_long_period: 30,
        bb_period: 20,
        ..StrategyConfig::default()
    };
    let full = run_strategy(&bars, &config).unwrap();
    let truncated = run_strategy(&bars[..250], &config).unwrap();

    assert!(truncated.fills.len() <= full.fills.len());
    for (t, f) in truncated.fills.iter().zip(&full.fills) {
        assert_eq!(t, f);
    }
    for (t, f) in truncated.equity_curve.iter().zip(&full.equity_curve) {
        assert_eq!(t, f);
    }
}

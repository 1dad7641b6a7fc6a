//! Indicators: pure functions from bar history to a numeric series.
//!
//! Indicators are precomputed once before the bar loop and queried per bar
//! through `IndicatorValues`. No value at bar t may depend on bar t+1 or
//! later; `tests/lookahead_test.rs` checks this for every indicator.
//!
//! Multi-series indicators (Bollinger) are exposed as one instance per band.

pub mod atr;
pub mod bollinger;
pub mod rsi;
pub mod sma;
pub mod stats;

pub use atr::Atr;
pub use bollinger::{Bollinger, BollingerBand, DEFAULT_STDDEV_FLOOR};
pub use rsi::{latest_rsi, wilder_rsi, Rsi};
pub use sma::Sma;

use crate::domain::PriceBar;
use std::collections::HashMap;

/// Trait for indicators.
///
/// Takes a full bar series and produces an output series of the same length.
/// The first `lookback()` values are `f64::NAN` (warmup).
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_50", "atr_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[PriceBar]) -> Vec<f64>;
}

/// Container for precomputed indicator values.
///
/// Built once before the bar loop, then queried by bar index during the loop.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute every indicator over `bars` and collect the series by name.
    pub fn precompute(bars: &[PriceBar], indicators: &[Box<dyn Indicator>]) -> Self {
        let mut values = Self::new();
        for indicator in indicators {
            let series = indicator.compute(bars);
            debug_assert_eq!(
                series.len(),
                bars.len(),
                "indicator '{}' produced {} values for {} bars",
                indicator.name(),
                series.len(),
                bars.len()
            );
            values.insert(indicator.name(), series);
        }
        values
    }

    /// Insert a named indicator series.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Get the indicator value at a specific bar index.
    pub fn get(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.series
            .get(name)
            .and_then(|v| v.get(bar_index).copied())
    }

    /// Get the full series for a named indicator.
    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    /// Names of all stored series, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.series.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// The longest lookback among a set of indicators.
pub fn max_lookback(indicators: &[Box<dyn Indicator>]) -> usize {
    indicators.iter().map(|i| i.lookback()).max().unwrap_or(0)
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            PriceBar {
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_values_insert_and_get() {
        let mut iv = IndicatorValues::new();
        iv.insert(
            "sma_20",
            vec![f64::NAN; 19]
                .into_iter()
                .chain(vec![100.0, 101.0])
                .collect(),
        );
        assert!(iv.get("sma_20", 0).unwrap().is_nan());
        assert_eq!(iv.get("sma_20", 19), Some(100.0));
        assert_eq!(iv.get("sma_20", 21), None);
        assert_eq!(iv.get("missing", 0), None);
    }

    #[test]
    fn precompute_collects_by_name() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        let indicators: Vec<Box<dyn Indicator>> = vec![Box::new(Sma::new(2)), Box::new(Atr::new(2))];
        let iv = IndicatorValues::precompute(&bars, &indicators);
        assert_eq!(iv.len(), 2);
        assert_eq!(iv.names(), vec!["atr_2", "sma_2"]);
        assert_approx(iv.get("sma_2", 1).unwrap(), 10.5, DEFAULT_EPSILON);
        assert_eq!(max_lookback(&indicators), 2);
    }
}

//! Classic floor-trader pivots computed from a bar's own high, low and close.
//!
//! Only the current bar is used (not the prior period), so a pivot at bar t
//! describes bar t itself.

use crate::domain::{Interval, Level, LevelKind, PivotPoint, PriceBar};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Pivot point and derived levels for one bar.
pub fn pivot_point(bar: &PriceBar) -> PivotPoint {
    let (h, l, c) = (bar.high, bar.low, bar.close);
    let pivot = (h + l + c) / 3.0;
    let range = h - l;
    PivotPoint {
        timestamp: bar.timestamp,
        pivot,
        support1: 2.0 * pivot - h,
        resistance1: 2.0 * pivot - l,
        support2: pivot - range,
        resistance2: pivot + range,
    }
}

/// One pivot point per bar, in input order.
pub fn compute_pivots(bars: &[PriceBar]) -> Vec<PivotPoint> {
    bars.iter().map(pivot_point).collect()
}

/// Flatten pivot points into four levels each (S1, S2, R1, R2), stamped with
/// the pivot's timestamp.
pub fn flatten_pivots(symbol: &str, interval: Interval, pivots: &[PivotPoint]) -> Vec<Level> {
    pivots
        .iter()
        .flat_map(|p| {
            LevelKind::ALL.into_iter().map(move |kind| Level {
                timestamp: p.timestamp,
                symbol: symbol.to_string(),
                interval,
                value: p.level(kind),
                kind,
            })
        })
        .collect()
}

/// Scalar observations the clusterer consumes: every Support1 and every
/// Resistance1 value of the timeframe.
pub fn cluster_observations(pivots: &[PivotPoint]) -> Vec<f64> {
    pivots
        .iter()
        .map(|p| p.resistance1)
        .chain(pivots.iter().map(|p| p.support1))
        .collect()
}

/// Every bar high followed by every bar low.
pub fn high_low_observations(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter()
        .map(|b| b.high)
        .chain(bars.iter().map(|b| b.low))
        .collect()
}

/// Which values of a timeframe are clustered into bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationSource {
    /// Support1 and Resistance1 of every pivot.
    #[default]
    Pivots,
    /// Raw bar highs and lows.
    HighLow,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown observation source '{0}' (expected one of: pivots, high_low)")]
pub struct ParseObservationSourceError(pub String);

impl ObservationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationSource::Pivots => "pivots",
            ObservationSource::HighLow => "high_low",
        }
    }

    pub fn observations(&self, bars: &[PriceBar], pivots: &[PivotPoint]) -> Vec<f64> {
        match self {
            ObservationSource::Pivots => cluster_observations(pivots),
            ObservationSource::HighLow => high_low_observations(bars),
        }
    }
}

impl fmt::Display for ObservationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObservationSource {
    type Err = ParseObservationSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pivots" => Ok(ObservationSource::Pivots),
            "high_low" => Ok(ObservationSource::HighLow),
            _ => Err(ParseObservationSourceError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(h: f64, l: f64, c: f64, day: u32) -> PriceBar {
        PriceBar::new(
            NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            c,
            h,
            l,
            c,
            1000.0,
        )
    }

    fn close_to(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn reference_bar_levels() {
        let p = pivot_point(&bar(1.2050, 1.1950, 1.2000, 1));
        assert!(close_to(p.pivot, 1.2000));
        assert!(close_to(p.support1, 1.1950));
        assert!(close_to(p.resistance1, 1.2050));
        assert!(close_to(p.support2, 1.1900));
        assert!(close_to(p.resistance2, 1.2100));
    }

    #[test]
    fn levels_are_ordered_around_pivot() {
        let p = pivot_point(&bar(110.0, 90.0, 105.0, 1));
        assert!(p.support2 <= p.support1);
        assert!(p.support1 <= p.pivot);
        assert!(p.pivot <= p.resistance1);
        assert!(p.resistance1 <= p.resistance2);
    }

    #[test]
    fn compute_preserves_order_and_uses_only_own_bar() {
        let bars = vec![bar(2.0, 1.0, 1.5, 1), bar(20.0, 10.0, 15.0, 2)];
        let pivots = compute_pivots(&bars);
        assert_eq!(pivots.len(), 2);
        assert_eq!(pivots[0].timestamp, bars[0].timestamp);
        assert!(close_to(pivots[0].pivot, 1.5));
        assert!(close_to(pivots[1].pivot, 15.0));
        assert_eq!(pivot_point(&bars[1]), pivots[1]);
    }

    #[test]
    fn flatten_emits_four_levels_per_pivot() {
        let pivots = compute_pivots(&[bar(1.2050, 1.1950, 1.2000, 1), bar(1.21, 1.19, 1.20, 2)]);
        let levels = flatten_pivots("EURUSD", Interval::Daily, &pivots);
        assert_eq!(levels.len(), 8);
        assert_eq!(levels[0].kind, LevelKind::Support1);
        assert!(close_to(levels[0].value, 1.1950));
        assert_eq!(levels[3].kind, LevelKind::Resistance2);
        assert!(levels.iter().all(|l| l.symbol == "EURUSD" && l.interval == Interval::Daily));
        assert_eq!(levels[4].timestamp, pivots[1].timestamp);
    }

    #[test]
    fn observations_are_r1_then_s1() {
        let pivots = compute_pivots(&[bar(1.2050, 1.1950, 1.2000, 1)]);
        let obs = cluster_observations(&pivots);
        assert_eq!(obs.len(), 2);
        assert!(close_to(obs[0], 1.2050));
        assert!(close_to(obs[1], 1.1950));
    }

    #[test]
    fn high_low_observations_are_highs_then_lows() {
        let bars = [bar(2.0, 1.0, 1.5, 1), bar(3.0, 0.5, 2.0, 2)];
        assert_eq!(high_low_observations(&bars), vec![2.0, 3.0, 1.0, 0.5]);
    }

    #[test]
    fn source_selects_observations() {
        let bars = [bar(1.2050, 1.1950, 1.2000, 1)];
        let pivots = compute_pivots(&bars);
        assert_eq!(
            ObservationSource::HighLow.observations(&bars, &pivots),
            vec![1.2050, 1.1950]
        );
        assert_eq!(
            ObservationSource::Pivots.observations(&bars, &pivots),
            cluster_observations(&pivots)
        );
    }

    #[test]
    fn source_parses_from_text() {
        assert_eq!("high-low".parse::<ObservationSource>(), Ok(ObservationSource::HighLow));
        assert_eq!("Pivots".parse::<ObservationSource>(), Ok(ObservationSource::Pivots));
        assert!("closes".parse::<ObservationSource>().is_err());
        assert_eq!(ObservationSource::HighLow.to_string(), "high_low");
    }
}

//! Bar cleaning: gap filling, duplicate and noise removal, outlier rejection.
//!
//! Typical order: `forward_fill` → `clean_bars` → `filter_outliers`.

use crate::domain::PriceBar;
use crate::error::AnalysisError;
use crate::indicators::stats::zscores;
use serde::{Deserialize, Serialize};

pub const DEFAULT_OUTLIER_Z: f64 = 3.0;

/// Row counts removed by `clean_bars`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReport {
    pub input: usize,
    pub duplicates: usize,
    pub noise: usize,
    /// Bars still carrying a non-finite field (nothing to fill from).
    pub void: usize,
    pub output: usize,
}

/// Replace non-finite OHLCV fields with the previous bar's value.
///
/// Returns the number of fields filled. Leading gaps stay non-finite.
pub fn forward_fill(bars: &mut [PriceBar]) -> usize {
    let mut filled = 0;
    for i in 1..bars.len() {
        let prev = bars[i - 1];
        let bar = &mut bars[i];
        for (field, prev_value) in [
            (&mut bar.open, prev.open),
            (&mut bar.high, prev.high),
            (&mut bar.low, prev.low),
            (&mut bar.close, prev.close),
            (&mut bar.volume, prev.volume),
        ] {
            if !field.is_finite() && prev_value.is_finite() {
                *field = prev_value;
                filled += 1;
            }
        }
    }
    filled
}

/// Sort by timestamp, keep the first bar per timestamp, and drop noise and
/// void bars.
pub fn clean_bars(mut bars: Vec<PriceBar>) -> (Vec<PriceBar>, CleanReport) {
    let mut report = CleanReport {
        input: bars.len(),
        ..CleanReport::default()
    };

    // Stable sort: among equal timestamps the earliest input row survives.
    bars.sort_by_key(|b| b.timestamp);
    let before = bars.len();
    bars.dedup_by_key(|b| b.timestamp);
    report.duplicates = before - bars.len();

    let mut kept = Vec::with_capacity(bars.len());
    for bar in bars {
        if bar.is_void() {
            report.void += 1;
        } else if bar.is_noise() {
            report.noise += 1;
        } else {
            kept.push(bar);
        }
    }
    report.output = kept.len();

    if report.output != report.input {
        tracing::debug!(
            input = report.input,
            duplicates = report.duplicates,
            noise = report.noise,
            void = report.void,
            "bars cleaned"
        );
    }
    (kept, report)
}

/// Drop bars where any OHLCV field has a population |z| ≥ `threshold`.
///
/// Columns with zero variance have no z-score and never reject a bar.
/// Returns the kept bars and the number rejected.
pub fn filter_outliers(
    bars: Vec<PriceBar>,
    threshold: f64,
) -> Result<(Vec<PriceBar>, usize), AnalysisError> {
    if !(threshold.is_finite() && threshold > 0.0) {
        return Err(AnalysisError::invalid("outlier_z", format!("{threshold} must be a positive number")));
    }
    if bars.is_empty() {
        return Ok((bars, 0));
    }

    let columns: [fn(&PriceBar) -> f64; 5] = [
        |b| b.open,
        |b| b.high,
        |b| b.low,
        |b| b.close,
        |b| b.volume,
    ];
    let mut reject = vec![false; bars.len()];
    for column in columns {
        let values: Vec<f64> = bars.iter().map(column).collect();
        match zscores(&values) {
            Ok(z) => {
                for (flag, score) in reject.iter_mut().zip(z) {
                    if score.abs() >= threshold {
                        *flag = true;
                    }
                }
            }
            Err(AnalysisError::DegenerateInput { .. }) => continue,
            Err(e) => return Err(e),
        }
    }

    let rejected = reject.iter().filter(|r| **r).count();
    let kept = bars
        .into_iter()
        .zip(reject)
        .filter_map(|(bar, r)| (!r).then_some(bar))
        .collect();
    Ok((kept, rejected))
}

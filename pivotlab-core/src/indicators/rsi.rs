//! Relative Strength Index (RSI) with Wilder smoothing.
//!
//! Seed: simple average gain and loss over the first `period` changes, then
//! avg = alpha * x + (1 - alpha) * avg with alpha = 1/period.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! Lookback: period.
//! Edge cases: avg_loss == 0 → 100; avg_gain == 0 → 0; both zero → 50.

use super::Indicator;
use crate::domain::PriceBar;
use crate::error::AnalysisError;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        wilder_rsi(&closes, self.period)
    }
}

/// RSI series over closing prices. Same length as `closes`; NaN during warmup.
pub fn wilder_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period + 1 {
        return result;
    }

    let changes: Vec<f64> = (0..n)
        .map(|i| {
            if i == 0 {
                f64::NAN
            } else {
                closes[i] - closes[i - 1]
            }
        })
        .collect();

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for &ch in &changes[1..=period] {
        if ch.is_nan() {
            return result;
        }
        if ch > 0.0 {
            avg_gain += ch;
        } else {
            avg_loss -= ch;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    result[period] = rsi_from_averages(avg_gain, avg_loss);

    let alpha = 1.0 / period as f64;
    for i in (period + 1)..n {
        let ch = changes[i];
        if ch.is_nan() {
            for val in result.iter_mut().skip(i) {
                *val = f64::NAN;
            }
            return result;
        }

        let gain = ch.max(0.0);
        let loss = (-ch).max(0.0);
        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;

        result[i] = rsi_from_averages(avg_gain, avg_loss);
    }

    result
}

/// Most recent RSI value of a close series.
///
/// Needs at least `period + 1` closes; a NaN in the series is reported as a
/// shortage of usable data rather than returned as a value.
pub fn latest_rsi(closes: &[f64], period: usize) -> Result<f64, AnalysisError> {
    if period == 0 {
        return Err(AnalysisError::invalid("rsi_window", "must be >= 1"));
    }
    if closes.len() < period + 1 {
        return Err(AnalysisError::InsufficientData {
            what: "rsi",
            required: period + 1,
            available: closes.len(),
        });
    }
    let series = wilder_rsi(closes, period);
    match series.last() {
        Some(v) if !v.is_nan() => Ok(*v),
        _ => Err(AnalysisError::InsufficientData {
            what: "rsi (finite closes)",
            required: period + 1,
            available: closes.iter().filter(|c| c.is_finite()).count(),
        }),
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

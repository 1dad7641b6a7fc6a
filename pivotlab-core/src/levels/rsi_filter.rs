//! Momentum filter: keep only the levels on the side of price that the
//! current RSI bias points to.

use crate::error::AnalysisError;
use crate::indicators::latest_rsi;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RSI_WINDOW: usize = 14;
pub const DEFAULT_RSI_THRESHOLD: f64 = 50.0;

/// Which side of the reference price the filter retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MomentumBias {
    /// RSI above threshold: levels strictly above price.
    Resistance,
    /// RSI below threshold: levels strictly below price.
    Support,
    /// RSI exactly at threshold: everything.
    Neutral,
}

impl MomentumBias {
    pub fn from_rsi(rsi: f64, threshold: f64) -> Self {
        if rsi > threshold {
            MomentumBias::Resistance
        } else if rsi < threshold {
            MomentumBias::Support
        } else {
            MomentumBias::Neutral
        }
    }
}

/// Narrow `levels` by momentum bias relative to `reference_price`.
///
/// Input order is preserved.
pub fn filter_levels(levels: &[f64], rsi: f64, reference_price: f64, threshold: f64) -> Vec<f64> {
    match MomentumBias::from_rsi(rsi, threshold) {
        MomentumBias::Resistance => levels.iter().copied().filter(|&l| l > reference_price).collect(),
        MomentumBias::Support => levels.iter().copied().filter(|&l| l < reference_price).collect(),
        MomentumBias::Neutral => levels.to_vec(),
    }
}

/// RSI filter configured with a window and threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct RsiFilter {
    pub window: usize,
    pub threshold: f64,
}

/// Outcome of one filter application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOutcome {
    pub rsi: f64,
    pub reference_price: f64,
    pub bias: MomentumBias,
    pub levels: Vec<f64>,
}

impl Default for RsiFilter {
    fn default() -> Self {
        Self {
            window: DEFAULT_RSI_WINDOW,
            threshold: DEFAULT_RSI_THRESHOLD,
        }
    }
}

impl RsiFilter {
    pub fn new(window: usize, threshold: f64) -> Result<Self, AnalysisError> {
        if window == 0 {
            return Err(AnalysisError::invalid("rsi_window", "must be >= 1"));
        }
        if !(0.0..=100.0).contains(&threshold) {
            return Err(AnalysisError::invalid(
                "rsi_threshold",
                format!("{threshold} is outside [0, 100]"),
            ));
        }
        Ok(Self { window, threshold })
    }

    /// Compute RSI over `closes` and filter `levels` against the explicit
    /// `reference_price`.
    pub fn apply(
        &self,
        closes: &[f64],
        levels: &[f64],
        reference_price: f64,
    ) -> Result<FilterOutcome, AnalysisError> {
        let rsi = latest_rsi(closes, self.window)?;
        Ok(FilterOutcome {
            rsi,
            reference_price,
            bias: MomentumBias::from_rsi(rsi, self.threshold),
            levels: filter_levels(levels, rsi, reference_price, self.threshold),
        })
    }
}

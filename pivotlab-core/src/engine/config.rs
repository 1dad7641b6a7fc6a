//! Strategy engine parameters.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};

/// Parameters of the SMA-crossover / Bollinger-exit strategy.
///
/// `atr_period` and `risk_percent` are carried for a future position sizer:
/// ATR is computed and exposed in the run result, risk percent is validated,
/// but neither gates any transition. Orders are always `stake` units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub sma_short_period: usize,
    pub sma_long_period: usize,
    pub atr_period: usize,
    pub risk_percent: f64,
    pub bb_period: usize,
    pub bb_devfactor: f64,
    /// Smallest stddev used for the Bollinger exit bands.
    pub bb_stddev_floor: f64,
    /// Fixed order size in units.
    pub stake: f64,
    pub initial_cash: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            sma_short_period: 50,
            sma_long_period: 200,
            atr_period: 14,
            risk_percent: 0.01,
            bb_period: 50,
            bb_devfactor: 2.1,
            bb_stddev_floor: crate::indicators::DEFAULT_STDDEV_FLOOR,
            stake: 1.0,
            initial_cash: 100_000.0,
        }
    }
}

impl StrategyConfig {
    /// Minimum number of bars a run needs: the longest indicator window.
    pub fn required_history(&self) -> usize {
        self.sma_short_period
            .max(self.sma_long_period)
            .max(self.bb_period)
            .max(self.atr_period)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        for (name, period) in [
            ("sma_short_period", self.sma_short_period),
            ("sma_long_period", self.sma_long_period),
            ("atr_period", self.atr_period),
            ("bb_period", self.bb_period),
        ] {
            if period == 0 {
                return Err(AnalysisError::invalid(name, "must be >= 1"));
            }
        }
        if self.sma_short_period >= self.sma_long_period {
            return Err(AnalysisError::invalid(
                "sma_short_period",
                format!(
                    "{} must be shorter than sma_long_period {}",
                    self.sma_short_period, self.sma_long_period
                ),
            ));
        }
        if !(self.bb_devfactor.is_finite() && self.bb_devfactor > 0.0) {
            return Err(AnalysisError::invalid("bb_devfactor", "must be a positive number"));
        }
        if !(self.bb_stddev_floor.is_finite() && self.bb_stddev_floor > 0.0) {
            return Err(AnalysisError::invalid("bb_stddev_floor", "must be a positive number"));
        }
        if !(0.0..=1.0).contains(&self.risk_percent) {
            return Err(AnalysisError::invalid("risk_percent", "must be within [0, 1]"));
        }
        if !(self.stake.is_finite() && self.stake > 0.0) {
            return Err(AnalysisError::invalid("stake", "must be a positive number"));
        }
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(AnalysisError::invalid("initial_cash", "must be a positive number"));
        }
        Ok(())
    }
}

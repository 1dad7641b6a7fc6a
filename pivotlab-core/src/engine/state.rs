//! Run result types.

use crate::domain::{Fill, Order, StrategyState, TradeRecord};
use crate::indicators::IndicatorValues;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One mark-to-market sample, taken at each bar close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub cash: f64,
    pub position: f64,
    pub close: f64,
    /// cash + position × close
    pub equity: f64,
}

/// Result of a completed strategy run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub initial_cash: f64,
    /// Append-only, in fill order.
    pub fills: Vec<Fill>,
    pub trades: Vec<TradeRecord>,
    /// One sample per bar.
    pub equity_curve: Vec<EquityPoint>,
    pub indicators: IndicatorValues,
    pub final_state: StrategyState,
    pub final_cash: f64,
    pub final_position: f64,
    /// An order submitted on the last bar has no next open to fill at.
    pub unfilled_order: Option<Order>,
    pub commission_paid: f64,
    /// Index of the first bar on which every indicator is defined.
    pub warmup_bars: usize,
}

impl RunResult {
    pub fn bar_count(&self) -> usize {
        self.equity_curve.len()
    }

    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_cash)
    }

    /// Equity values only, in bar order.
    pub fn equity_values(&self) -> Vec<f64> {
        self.equity_curve.iter().map(|p| p.equity).collect()
    }
}

//! Cost models: slippage and commission applied at fill time.
//!
//! The reference strategy is frictionless. `BpsCostModel` adds fixed basis
//! point friction: slippage is directional (buyers pay more, sellers receive
//! less) and commission is charged per side on the fill notional.

use crate::domain::OrderSide;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Cost applied to one fill.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FillCost {
    /// Price after slippage.
    pub price: f64,
    /// Slippage in currency.
    pub slippage: f64,
    /// Commission in currency.
    pub commission: f64,
}

/// Pluggable friction applied to every simulated fill.
pub trait CostModel: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn fill_cost(&self, raw_price: f64, side: OrderSide, quantity: f64) -> FillCost;
}

/// No slippage, no commission.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frictionless;

impl CostModel for Frictionless {
    fn name(&self) -> &str {
        "frictionless"
    }

    fn fill_cost(&self, raw_price: f64, _side: OrderSide, _quantity: f64) -> FillCost {
        FillCost {
            price: raw_price,
            slippage: 0.0,
            commission: 0.0,
        }
    }
}

/// Fixed basis-point slippage and commission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BpsCostModel {
    pub slippage_bps: f64,
    pub commission_bps: f64,
}

impl BpsCostModel {
    pub fn new(slippage_bps: f64, commission_bps: f64) -> Self {
        Self {
            slippage_bps,
            commission_bps,
        }
    }
}

impl CostModel for BpsCostModel {
    fn name(&self) -> &str {
        "bps"
    }

    fn fill_cost(&self, raw_price: f64, side: OrderSide, quantity: f64) -> FillCost {
        let slip_fraction = self.slippage_bps / 10_000.0;
        let price = match side {
            OrderSide::Buy => raw_price * (1.0 + slip_fraction),
            OrderSide::Sell => raw_price * (1.0 - slip_fraction),
        };
        FillCost {
            price,
            slippage: (price - raw_price).abs() * quantity,
            commission: price * quantity * self.commission_bps / 10_000.0,
        }
    }
}

//! Orders and fills of the simulated broker.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// +1 for buys, -1 for sells.
    pub fn sign(&self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }
}

/// Whether an order opens a new position or closes the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderAction {
    Open,
    Close,
}

/// A market order submitted at a bar close, filled at the next bar's open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub side: OrderSide,
    pub action: OrderAction,
    pub quantity: f64,
    pub submitted_bar: usize,
    pub submitted_at: NaiveDateTime,
}

/// Execution record for one order. Exactly one per filled order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: u64,
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub side: OrderSide,
    pub action: OrderAction,
    pub price: f64,
    pub quantity: f64,
    pub commission: f64,
    pub slippage: f64,
}

impl Fill {
    /// Signed quantity: positive for buys.
    pub fn signed_quantity(&self) -> f64 {
        self.side.sign() * self.quantity
    }
}

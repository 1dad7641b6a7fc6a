//! Simulated broker: cash, signed position and at most one pending order.
//!
//! Market orders are submitted at a bar close and filled at the open of a
//! later bar. The fill clears the pending slot so the next decision can run.

use super::cost_model::CostModel;
use crate::domain::{Fill, Order, OrderAction, OrderSide, PriceBar, StrategyState};
use chrono::NaiveDateTime;

#[derive(Debug)]
pub struct Broker<'a> {
    cash: f64,
    position: f64,
    pending: Option<Order>,
    next_order_id: u64,
    commission_paid: f64,
    cost_model: &'a dyn CostModel,
}

impl<'a> Broker<'a> {
    pub fn new(initial_cash: f64, cost_model: &'a dyn CostModel) -> Self {
        Self {
            cash: initial_cash,
            position: 0.0,
            pending: None,
            next_order_id: 1,
            commission_paid: 0.0,
            cost_model,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Signed position size: positive long, negative short.
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn state(&self) -> StrategyState {
        StrategyState::from_position(self.position)
    }

    pub fn pending(&self) -> Option<&Order> {
        self.pending.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn commission_paid(&self) -> f64 {
        self.commission_paid
    }

    /// Mark-to-market equity at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.position * price
    }

    /// Queue a market order. Returns `None` if an order is already pending.
    pub fn submit(
        &mut self,
        side: OrderSide,
        action: OrderAction,
        quantity: f64,
        bar_index: usize,
        timestamp: NaiveDateTime,
    ) -> Option<u64> {
        if self.pending.is_some() {
            return None;
        }
        let id = self.next_order_id;
        self.next_order_id += 1;
        self.pending = Some(Order {
            id,
            side,
            action,
            quantity,
            submitted_bar: bar_index,
            submitted_at: timestamp,
        });
        Some(id)
    }

    /// Fill the pending order at `bar`'s open if it was submitted on an
    /// earlier bar. Orders never fill on the bar that produced them.
    pub fn fill_pending(&mut self, bar_index: usize, bar: &PriceBar) -> Option<Fill> {
        let ready = matches!(&self.pending, Some(o) if o.submitted_bar < bar_index);
        if !ready {
            return None;
        }
        let order = self.pending.take()?;

        let cost = self.cost_model.fill_cost(bar.open, order.side, order.quantity);
        let notional = cost.price * order.quantity;
        match order.side {
            OrderSide::Buy => self.cash -= notional,
            OrderSide::Sell => self.cash += notional,
        }
        self.cash -= cost.commission;
        self.commission_paid += cost.commission;
        self.position += order.side.sign() * order.quantity;
        // Closing fills flatten exactly; avoid float residue on the position.
        if order.action == OrderAction::Close && self.position.abs() < 1e-12 {
            self.position = 0.0;
        }

        Some(Fill {
            order_id: order.id,
            bar_index,
            timestamp: bar.timestamp,
            side: order.side,
            action: order.action,
            price: cost.price,
            quantity: order.quantity,
            commission: cost.commission,
            slippage: cost.slippage,
        })
    }

    /// Remove and return the pending order without executing it.
    pub fn cancel_pending(&mut self) -> Option<Order> {
        self.pending.take()
    }
}

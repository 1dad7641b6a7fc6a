//! Trade extraction: converts raw fills into round-trip TradeRecord entries.
//!
//! Post-processes fills after the bar loop completes. Pure function:
//! fills → trade records. An opening fill without a matching close is an
//! open position, not a trade, and is left out.

use crate::domain::{Direction, Fill, OrderAction, OrderSide, TradeRecord};

/// Pair every opening fill with the closing fill that follows it.
pub fn extract_trades(fills: &[Fill]) -> Vec<TradeRecord> {
    let mut trades = Vec::new();
    let mut open: Option<&Fill> = None;

    for fill in fills {
        match (fill.action, open) {
            (OrderAction::Open, None) => open = Some(fill),
            (OrderAction::Close, Some(entry)) => {
                trades.push(build_trade_record(entry, fill));
                open = None;
            }
            // The broker never produces these sequences; skip rather than guess.
            (OrderAction::Open, Some(_)) | (OrderAction::Close, None) => {
                tracing::warn!(order_id = fill.order_id, "unpaired fill skipped during trade extraction");
            }
        }
    }

    trades
}

fn build_trade_record(entry: &Fill, exit: &Fill) -> TradeRecord {
    let side = match entry.side {
        OrderSide::Buy => Direction::Long,
        OrderSide::Sell => Direction::Short,
    };
    let quantity = entry.quantity;
    let gross_pnl = match side {
        Direction::Long => (exit.price - entry.price) * quantity,
        Direction::Short => (entry.price - exit.price) * quantity,
    };
    // Fill prices already include slippage; only commission is deducted here.
    let costs = entry.commission + exit.commission;

    TradeRecord {
        side,
        entry_bar: entry.bar_index,
        entry_time: entry.timestamp,
        entry_price: entry.price,
        exit_bar: exit.bar_index,
        exit_time: exit.timestamp,
        exit_price: exit.price,
        quantity,
        gross_pnl,
        costs,
        net_pnl: gross_pnl - costs,
        bars_held: exit.bar_index.saturating_sub(entry.bar_index),
    }
}

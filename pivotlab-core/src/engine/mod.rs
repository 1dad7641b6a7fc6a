//! Strategy engine: bar-by-bar replay with a simulated broker.
//!
//! Decisions are taken at each bar close from precomputed indicators;
//! orders fill at the next bar's open. Trades are extracted from the fill
//! log after the loop completes.

pub mod broker;
pub mod config;
pub mod cost_model;
pub mod state;
pub mod strategy;
pub mod trade_extraction;

pub use broker::Broker;
pub use config::StrategyConfig;
pub use cost_model::{BpsCostModel, CostModel, FillCost, Frictionless};
pub use state::{EquityPoint, RunResult};
pub use strategy::{decide, run_strategy, BarSignals, Decision, StrategyEngine};
pub use trade_extraction::extract_trades;

//! PivotLab Core: domain types, indicators, level detection, strategy engine, storage.
//!
//! This crate contains the computational heart of PivotLab:
//! - Domain types (bars, intervals, pivot points, levels, orders, fills, trades)
//! - Indicators (SMA, Bollinger, ATR, RSI) precomputed over bar sequences
//! - Level pipeline stages: pivots, clustering, RSI filtering, combination
//! - Bar-by-bar strategy engine with a simulated next-open broker
//! - Bar cleaning and synthetic data
//! - The `MarketStore` repository with SQLite and in-memory implementations

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod levels;
pub mod rng;
pub mod store;

pub use error::AnalysisError;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed across rayon workers are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::PriceBar>();
        require_sync::<domain::PriceBar>();
        require_send::<domain::Level>();
        require_sync::<domain::Level>();
        require_send::<domain::Fill>();
        require_sync::<domain::Fill>();
        require_send::<domain::TradeRecord>();
        require_sync::<domain::TradeRecord>();

        require_send::<indicators::IndicatorValues>();
        require_sync::<indicators::IndicatorValues>();
        require_send::<levels::LevelExtractor>();
        require_sync::<levels::LevelExtractor>();

        require_send::<engine::StrategyConfig>();
        require_sync::<engine::StrategyConfig>();
        require_send::<engine::StrategyEngine>();
        require_sync::<engine::StrategyEngine>();
        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();

        require_send::<rng::RngHierarchy>();
        require_sync::<rng::RngHierarchy>();
        require_send::<store::MemoryStore>();
        require_send::<store::SqliteStore>();
    }

    /// The strategy decision rule sees only the current bar's readings and
    /// the position state; broker cash never feeds a decision.
    #[test]
    fn decision_rule_has_no_broker_parameter() {
        fn _check(state: domain::StrategyState, s: &engine::BarSignals) -> Option<engine::Decision> {
            engine::decide(state, s)
        }
    }
}

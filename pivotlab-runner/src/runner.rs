//! Backtest runner: wires together store, cleaning, engine, and metrics.
//!
//! Three entry points:
//! - `run_backtest()`: loads bars from a store, then runs. Used by the CLI.
//! - `run_backtest_from_bars()`: takes pre-loaded bars, no I/O.
//! - `run_backtests_parallel()`: loads every instrument sequentially, then
//!   runs the backtests across rayon workers.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pivotlab_core::domain::{Fill, Interval, Order, PriceBar, StrategyState, TradeRecord, TIMESTAMP_FORMAT};
use pivotlab_core::engine::{EquityPoint, StrategyConfig, StrategyEngine};
use pivotlab_core::store::{MarketStore, StoreError};
use pivotlab_core::AnalysisError;

use crate::config::{BacktestConfig, ConfigError};
use crate::metrics::PerformanceMetrics;
use crate::prepare::{load_prepared, PrepareError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("no bars stored for {symbol} {interval}")]
    NoData { symbol: String, interval: Interval },
}

impl From<PrepareError> for RunError {
    fn from(e: PrepareError) -> Self {
        match e {
            PrepareError::Store(e) => RunError::Store(e),
            PrepareError::Analysis(e) => RunError::Analysis(e),
        }
    }
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub interval: Interval,
    pub start: String,
    pub end: String,
    pub config: StrategyConfig,
    pub config_hash: String,
    pub dataset_hash: String,
    pub cost_model: String,
    pub bar_count: usize,
    pub warmup_bars: usize,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<TradeRecord>,
    pub fills: Vec<Fill>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_state: StrategyState,
    pub final_cash: f64,
    pub final_position: f64,
    pub commission_paid: f64,
    /// Order submitted on the last bar, never filled.
    pub unfilled_order: Option<Order>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn initial_cash(&self) -> f64 {
        self.config.initial_cash
    }

    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.config.initial_cash)
    }

    pub fn equity_values(&self) -> Vec<f64> {
        self.equity_curve.iter().map(|p| p.equity).collect()
    }
}

/// Load the configured sequence from `store`, clean it, and run.
pub fn run_backtest<S: MarketStore + ?Sized>(store: &S, config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let bars = load_for(store, config)?;
    run_backtest_from_bars(config, &bars)
}

/// Run a backtest on pre-loaded, already-cleaned bars: no I/O.
pub fn run_backtest_from_bars(config: &BacktestConfig, bars: &[PriceBar]) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let engine = StrategyEngine::new(config.strategy.clone())?.with_cost_model(config.costs.build());
    let run = engine.run(bars)?;

    let equity = run.equity_values();
    let metrics = PerformanceMetrics::compute(&equity, &run.trades);
    let (start, end) = match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => (
            first.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            last.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        ),
        _ => (String::new(), String::new()),
    };

    tracing::info!(
        symbol = %config.symbol,
        interval = %config.interval,
        trades = metrics.trade_count,
        total_return = metrics.total_return,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        symbol: config.symbol.clone(),
        interval: config.interval,
        start,
        end,
        config: config.strategy.clone(),
        config_hash: config.config_hash(),
        dataset_hash: compute_dataset_hash(bars),
        cost_model: engine.cost_model().name().to_string(),
        bar_count: run.bar_count(),
        warmup_bars: run.warmup_bars,
        metrics,
        trades: run.trades,
        fills: run.fills,
        equity_curve: run.equity_curve,
        final_state: run.final_state,
        final_cash: run.final_cash,
        final_position: run.final_position,
        commission_paid: run.commission_paid,
        unfilled_order: run.unfilled_order,
    })
}

/// Run several independent backtests.
///
/// Bars are read from the store on the calling thread; the runs themselves
/// share nothing and execute in parallel. Results keep the input order.
pub fn run_backtests_parallel<S: MarketStore + ?Sized>(
    store: &S,
    configs: &[BacktestConfig],
) -> Vec<(String, Result<BacktestResult, RunError>)> {
    let loaded: Vec<(&BacktestConfig, Result<Vec<PriceBar>, RunError>)> = configs
        .iter()
        .map(|config| (config, config.validate().map_err(RunError::from).and_then(|()| load_for(store, config))))
        .collect();

    loaded
        .into_par_iter()
        .map(|(config, bars)| {
            let result = bars.and_then(|bars| run_backtest_from_bars(config, &bars));
            if let Err(e) = &result {
                tracing::warn!(symbol = %config.symbol, error = %e, "backtest failed");
            }
            (config.symbol.clone(), result)
        })
        .collect()
}

fn load_for<S: MarketStore + ?Sized>(store: &S, config: &BacktestConfig) -> Result<Vec<PriceBar>, RunError> {
    let (bars, _) = load_prepared(store, &config.symbol, config.interval, &config.cleaning)?;
    if bars.is_empty() {
        return Err(RunError::NoData {
            symbol: config.symbol.clone(),
            interval: config.interval,
        });
    }
    Ok(bars)
}

/// Deterministic BLAKE3 hash over timestamps and OHLCV values.
pub fn compute_dataset_hash(bars: &[PriceBar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.timestamp.format(TIMESTAMP_FORMAT).to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

//! PivotLab Runner: level pipeline and backtest orchestration.
//!
//! This crate builds on `pivotlab-core` to provide:
//! - TOML configuration with validation
//! - Bar loading and cleaning from any `MarketStore`
//! - Multi-timeframe level pipeline with per-timeframe failure isolation
//! - Single and parallel (per-instrument) backtests with metrics
//! - CSV import and JSON/CSV/Markdown export

pub mod config;
pub mod export;
pub mod import;
pub mod metrics;
pub mod pipeline;
pub mod prepare;
pub mod runner;

pub use config::{
    BacktestConfig, CleaningConfig, ClusteringConfig, ConfigError, CostModelConfig, PipelineConfig, RsiConfig,
};
pub use export::{
    export_equity_csv, export_fills_csv, export_json, export_trades_csv, generate_report, import_json, load_artifacts,
    save_artifacts,
};
pub use import::{import_csv, read_bars_csv, ImportReport};
pub use metrics::PerformanceMetrics;
pub use pipeline::{run_level_pipeline, PipelineReport, StageError, TimeframeFailure, TimeframeReport};
pub use prepare::{load_prepared, prepare_bars, PrepareError, PrepareSummary};
pub use runner::{
    compute_dataset_hash, run_backtest, run_backtest_from_bars, run_backtests_parallel, BacktestResult, RunError,
    SCHEMA_VERSION,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn performance_metrics_is_send_sync() {
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
    }

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
    }

    #[test]
    fn run_error_crosses_threads() {
        assert_send::<RunError>();
    }

    #[test]
    fn pipeline_report_is_send_sync() {
        assert_send::<PipelineReport>();
        assert_sync::<PipelineReport>();
    }
}

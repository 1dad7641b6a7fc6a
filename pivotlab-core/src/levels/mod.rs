//! Technical level detection stages.
//!
//! Bars → pivot points → clustered bands (per timeframe) → RSI-filtered
//! bands (per timeframe) → combined set (across timeframes). Each stage is a
//! pure function; orchestration and persistence live in the runner.

pub mod combine;
pub mod extract;
pub mod pivot;
pub mod rsi_filter;

pub use combine::{combine_levels, to_combined};
pub use extract::{extract_levels, LevelExtractor, RangeBands, DEFAULT_CLUSTER_COUNT, DEFAULT_SEED};
pub use pivot::{
    cluster_observations, compute_pivots, flatten_pivots, high_low_observations, pivot_point, ObservationSource,
    ParseObservationSourceError,
};
pub use rsi_filter::{
    filter_levels, FilterOutcome, MomentumBias, RsiFilter, DEFAULT_RSI_THRESHOLD,
    DEFAULT_RSI_WINDOW,
};

//! Load bars from the store and apply the configured cleaning steps.

use crate::config::CleaningConfig;
use pivotlab_core::data::{clean_bars, filter_outliers, forward_fill, CleanReport};
use pivotlab_core::domain::{Interval, PriceBar};
use pivotlab_core::store::{MarketStore, StoreError};
use pivotlab_core::AnalysisError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// What cleaning did to a loaded sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PrepareSummary {
    pub loaded: usize,
    pub filled_fields: usize,
    pub clean: CleanReport,
    pub outliers: usize,
}

/// Clean an in-memory sequence: forward fill, dedup/noise removal, outliers.
pub fn prepare_bars(
    mut bars: Vec<PriceBar>,
    cleaning: &CleaningConfig,
) -> Result<(Vec<PriceBar>, PrepareSummary), AnalysisError> {
    let mut summary = PrepareSummary {
        loaded: bars.len(),
        ..PrepareSummary::default()
    };
    if cleaning.forward_fill {
        summary.filled_fields = forward_fill(&mut bars);
    }
    let (bars, clean) = clean_bars(bars);
    summary.clean = clean;
    let bars = match cleaning.outlier_z {
        Some(z) => {
            let (kept, rejected) = filter_outliers(bars, z)?;
            summary.outliers = rejected;
            kept
        }
        None => bars,
    };
    Ok((bars, summary))
}

/// Read one `(symbol, interval)` sequence and clean it.
pub fn load_prepared<S: MarketStore + ?Sized>(
    store: &S,
    symbol: &str,
    interval: Interval,
    cleaning: &CleaningConfig,
) -> Result<(Vec<PriceBar>, PrepareSummary), PrepareError> {
    let raw = store.price_bars(symbol, interval)?;
    let prepared = prepare_bars(raw, cleaning)?;
    tracing::debug!(
        symbol,
        interval = %interval,
        loaded = prepared.1.loaded,
        kept = prepared.0.len(),
        "bars prepared"
    );
    Ok(prepared)
}

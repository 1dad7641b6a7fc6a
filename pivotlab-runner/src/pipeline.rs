//! Level pipeline orchestration across timeframes.
//!
//! Per timeframe: load + clean bars → pivots (replaced) → flattened levels
//! (replaced) → clustered bands → RSI filter → filtered levels (replaced).
//! Bands come from pivot S1/R1 values or raw highs and lows, per
//! `clustering.source`.
//! Then the filtered sets of every configured timeframe are combined and
//! the symbol's combined levels are replaced.
//!
//! A failing timeframe is recorded in the report and skipped; the others
//! still run. Single-row write failures are counted, never fatal.

use crate::config::PipelineConfig;
use crate::prepare::{load_prepared, PrepareError, PrepareSummary};
use crate::runner::RunError;
use pivotlab_core::domain::Interval;
use pivotlab_core::levels::{
    combine_levels, compute_pivots, flatten_pivots, FilterOutcome, LevelExtractor, ObservationSource, RangeBands,
    RsiFilter,
};
use pivotlab_core::rng::RngHierarchy;
use pivotlab_core::store::{
    replace_combined_levels, replace_filtered_levels, replace_levels, replace_pivots, MarketStore, StoreError,
    UpsertReport,
};
use pivotlab_core::AnalysisError;
use serde::Serialize;
use thiserror::Error;

/// Why a single timeframe was abandoned.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("momentum source {interval} unavailable: {reason}")]
    Momentum { interval: Interval, reason: String },
}

impl From<PrepareError> for StageError {
    fn from(e: PrepareError) -> Self {
        match e {
            PrepareError::Store(e) => StageError::Store(e),
            PrepareError::Analysis(e) => StageError::Analysis(e),
        }
    }
}

/// Output of one successful timeframe.
#[derive(Debug, Clone, Serialize)]
pub struct TimeframeReport {
    pub interval: Interval,
    pub prepare: PrepareSummary,
    pub pivots: usize,
    pub levels: usize,
    pub seed: u64,
    pub source: ObservationSource,
    pub bands: Vec<f64>,
    /// Extreme high and low centroids; only for the high/low source.
    pub range: Option<RangeBands>,
    pub filter: FilterOutcome,
    pub writes: UpsertReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeframeFailure {
    pub interval: Interval,
    pub error: String,
}

/// Outcome of a full pipeline run for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub symbol: String,
    pub timeframes: Vec<TimeframeReport>,
    pub failures: Vec<TimeframeFailure>,
    pub combined: Vec<f64>,
    pub combined_writes: UpsertReport,
}

impl PipelineReport {
    /// Total single-row write failures across all stages.
    pub fn row_failures(&self) -> usize {
        self.timeframes.iter().map(|t| t.writes.failed()).sum::<usize>() + self.combined_writes.failed()
    }
}

struct Momentum {
    interval: Interval,
    closes: Result<Vec<f64>, String>,
}

/// Run the level pipeline for `config.symbol` against `store`.
///
/// Only a configuration error or a failure to replace the combined set is
/// returned as `Err`; per-timeframe failures are in the report.
pub fn run_level_pipeline<S: MarketStore + ?Sized>(
    store: &mut S,
    config: &PipelineConfig,
) -> Result<PipelineReport, RunError> {
    config.validate()?;
    let symbol = config.symbol.as_str();
    let filter = RsiFilter::new(config.rsi.window, config.rsi.threshold)?;
    let seeds = RngHierarchy::new(config.clustering.seed);

    let momentum = config.rsi.momentum_interval.map(|interval| Momentum {
        interval,
        closes: load_prepared(&*store, symbol, interval, &config.cleaning)
            .map(|(bars, _)| bars.iter().map(|b| b.close).collect())
            .map_err(|e| e.to_string()),
    });

    let mut report = PipelineReport {
        symbol: symbol.to_string(),
        timeframes: Vec::new(),
        failures: Vec::new(),
        combined: Vec::new(),
        combined_writes: UpsertReport::default(),
    };

    for &interval in &config.timeframes {
        let seed = seeds.sub_seed(symbol, interval);
        match run_timeframe(store, config, interval, seed, &filter, momentum.as_ref()) {
            Ok(tf) => {
                tracing::info!(
                    symbol,
                    interval = %interval,
                    bands = tf.bands.len(),
                    kept = tf.filter.levels.len(),
                    rsi = tf.filter.rsi,
                    "timeframe complete"
                );
                report.timeframes.push(tf);
            }
            Err(e) => {
                tracing::warn!(symbol, interval = %interval, error = %e, "timeframe aborted");
                report.failures.push(TimeframeFailure {
                    interval,
                    error: e.to_string(),
                });
            }
        }
    }

    let sets = config
        .timeframes
        .iter()
        .map(|&interval| store.filtered_levels(symbol, interval))
        .collect::<Result<Vec<_>, _>>()?;
    let combined = combine_levels(&sets);
    report.combined_writes = replace_combined_levels(store, symbol, &combined)?;
    report.combined = combined;

    tracing::info!(
        symbol,
        combined = report.combined.len(),
        failed_timeframes = report.failures.len(),
        row_failures = report.row_failures(),
        "level pipeline complete"
    );
    Ok(report)
}

fn run_timeframe<S: MarketStore + ?Sized>(
    store: &mut S,
    config: &PipelineConfig,
    interval: Interval,
    seed: u64,
    filter: &RsiFilter,
    momentum: Option<&Momentum>,
) -> Result<TimeframeReport, StageError> {
    let symbol = config.symbol.as_str();
    let (bars, prepare) = load_prepared(&*store, symbol, interval, &config.cleaning)?;

    let pivots = compute_pivots(&bars);
    let mut writes = replace_pivots(store, symbol, interval, &pivots)?;
    let levels = flatten_pivots(symbol, interval, &pivots);
    writes.absorb(replace_levels(store, symbol, interval, &levels)?);

    let source = config.clustering.source;
    let extractor = LevelExtractor::new(config.clustering.k, seed);
    let bands = extractor.extract(&source.observations(&bars, &pivots))?;
    let range = match source {
        ObservationSource::HighLow => Some(extractor.range_bands(&bars)?),
        ObservationSource::Pivots => None,
    };

    let own_closes: Vec<f64>;
    let closes: &[f64] = match momentum {
        Some(m) => m.closes.as_deref().map_err(|reason| StageError::Momentum {
            interval: m.interval,
            reason: reason.clone(),
        })?,
        None => {
            own_closes = bars.iter().map(|b| b.close).collect();
            &own_closes
        }
    };
    let Some(&reference_price) = closes.last() else {
        return Err(AnalysisError::InsufficientData {
            what: "reference price (closes)",
            required: 1,
            available: 0,
        }
        .into());
    };
    let outcome = filter.apply(closes, &bands, reference_price)?;

    writes.absorb(replace_filtered_levels(store, symbol, interval, &outcome.levels)?);

    Ok(TimeframeReport {
        interval,
        prepare,
        pivots: pivots.len(),
        levels: levels.len(),
        seed,
        source,
        bands,
        range,
        filter: outcome,
        writes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pivotlab_core::data::random_walk;
    use pivotlab_core::store::{upsert_price_bars, MemoryStore};

    fn seeded_store(intervals: &[(Interval, usize)]) -> MemoryStore {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut store = MemoryStore::new();
        for &(interval, n) in intervals {
            let bars = random_walk(&format!("EURUSD-{interval}"), start, n, interval);
            upsert_price_bars(&mut store, "EURUSD", interval, &bars);
        }
        store
    }

    fn config(timeframes: &[Interval]) -> PipelineConfig {
        let mut config = PipelineConfig::new("EURUSD");
        config.timeframes = timeframes.to_vec();
        config.cleaning.outlier_z = None;
        config
    }

    #[test]
    fn all_timeframes_produce_combined_levels() {
        let mut store = seeded_store(&[(Interval::Daily, 120), (Interval::Hourly, 300)]);
        let config = config(&[Interval::Daily, Interval::Hourly]);

        let report = run_level_pipeline(&mut store, &config).unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(report.timeframes.len(), 2);
        assert_eq!(report.row_failures(), 0);

        let mut expected: Vec<f64> = report
            .timeframes
            .iter()
            .flat_map(|t| t.filter.levels.iter().copied())
            .collect();
        expected.sort_by(|a, b| a.total_cmp(b));
        expected.dedup();
        assert_eq!(report.combined, expected);

        let stored: Vec<f64> = store
            .combined_levels("EURUSD")
            .unwrap()
            .into_iter()
            .map(|c| c.value)
            .collect();
        assert_eq!(stored, report.combined);
        assert_eq!(store.pivots("EURUSD", Interval::Daily).unwrap().len(), 120);
        assert_eq!(store.levels("EURUSD", Interval::Daily).unwrap().len(), 480);
    }

    #[test]
    fn same_inputs_same_levels() {
        let config = config(&[Interval::Daily]);
        let mut a = seeded_store(&[(Interval::Daily, 100)]);
        let mut b = seeded_store(&[(Interval::Daily, 100)]);
        let ra = run_level_pipeline(&mut a, &config).unwrap();
        let rb = run_level_pipeline(&mut b, &config).unwrap();
        assert_eq!(ra.timeframes[0].bands, rb.timeframes[0].bands);
        assert_eq!(ra.combined, rb.combined);
    }

    #[test]
    fn missing_momentum_source_fails_each_timeframe() {
        let mut store = seeded_store(&[(Interval::Daily, 100)]);
        let mut config = config(&[Interval::Daily]);
        // No 15m bars stored: no closes, so no reference price.
        config.rsi.momentum_interval = Some(Interval::FifteenMinutes);

        let report = run_level_pipeline(&mut store, &config).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].error.contains("reference price"), "{}", report.failures[0].error);
        assert!(report.combined.is_empty());
        // Pivots were still persisted before the filter stage failed.
        assert_eq!(store.pivots("EURUSD", Interval::Daily).unwrap().len(), 100);
    }

    #[test]
    fn high_low_source_clusters_bar_extremes() {
        let mut store = seeded_store(&[(Interval::Daily, 120)]);
        let mut high_low = config(&[Interval::Daily]);
        high_low.clustering.source = ObservationSource::HighLow;

        let report = run_level_pipeline(&mut store, &high_low).unwrap();
        assert!(report.failures.is_empty());
        let tf = &report.timeframes[0];
        assert_eq!(tf.source, ObservationSource::HighLow);
        assert_eq!(tf.bands.len(), 5);

        let bars = store.price_bars("EURUSD", Interval::Daily).unwrap();
        let max_high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let min_low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        assert!(tf.bands.iter().all(|&b| b >= min_low - 1e-9 && b <= max_high + 1e-9));

        let range = tf.range.unwrap();
        assert!(range.support >= min_low - 1e-9);
        assert!(range.resistance <= max_high + 1e-9);
        assert!(range.support < range.resistance);

        // Pivots and levels are persisted whatever the source.
        assert_eq!(store.levels("EURUSD", Interval::Daily).unwrap().len(), 480);

        let pivots = run_level_pipeline(&mut store, &config(&[Interval::Daily])).unwrap();
        assert!(pivots.timeframes[0].range.is_none());
        assert_ne!(pivots.timeframes[0].bands, tf.bands);
    }

    #[test]
    fn invalid_config_is_rejected_before_running() {
        let mut store = MemoryStore::new();
        let mut config = PipelineConfig::new("EURUSD");
        config.clustering.k = 0;
        assert!(matches!(
            run_level_pipeline(&mut store, &config),
            Err(RunError::Config(_))
        ));
    }
}

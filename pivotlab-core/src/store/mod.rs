//! Market data repository.
//!
//! `MarketStore` exposes single-row idempotent upserts plus reads keyed by
//! symbol and interval. Batch writes go through the helpers in this module,
//! which isolate per-row failures: a failing row is logged, recorded in the
//! `UpsertReport` and skipped, and the rest of the batch is still written.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::domain::{CombinedLevel, Interval, Level, PivotPoint, PriceBar};
use serde::Serialize;
use thiserror::Error;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be decoded into a domain type.
    #[error("cannot decode {column} '{value}' in {table}: {reason}")]
    Decode {
        table: &'static str,
        column: &'static str,
        value: String,
        reason: String,
    },

    /// A row was refused before reaching storage.
    #[error("invalid row for {table}: {reason}")]
    InvalidRow { table: &'static str, reason: String },
}

/// One failed single-row write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    pub table: &'static str,
    pub key: String,
    pub reason: String,
}

/// Outcome of a batch of single-row writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpsertReport {
    pub attempted: usize,
    pub written: usize,
    pub failures: Vec<RowFailure>,
}

impl UpsertReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold another report into this one.
    pub fn absorb(&mut self, other: UpsertReport) {
        self.attempted += other.attempted;
        self.written += other.written;
        self.failures.extend(other.failures);
    }

    fn record(&mut self, table: &'static str, key: impl FnOnce() -> String, result: Result<(), StoreError>) {
        self.attempted += 1;
        match result {
            Ok(()) => self.written += 1,
            Err(e) => {
                let key = key();
                tracing::warn!(table, key = %key, error = %e, "row write failed; skipping");
                self.failures.push(RowFailure {
                    table,
                    key,
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Repository of bars, pivots and levels.
pub trait MarketStore {
    fn upsert_price_bar(&mut self, symbol: &str, interval: Interval, bar: &PriceBar) -> Result<(), StoreError>;

    /// Bars for one symbol and interval, ascending by timestamp.
    fn price_bars(&self, symbol: &str, interval: Interval) -> Result<Vec<PriceBar>, StoreError>;

    /// Distinct intervals stored for `symbol`, ascending.
    fn intervals(&self, symbol: &str) -> Result<Vec<Interval>, StoreError>;

    fn upsert_pivot(&mut self, symbol: &str, interval: Interval, pivot: &PivotPoint) -> Result<(), StoreError>;

    fn pivots(&self, symbol: &str, interval: Interval) -> Result<Vec<PivotPoint>, StoreError>;

    fn clear_pivots(&mut self, symbol: &str, interval: Interval) -> Result<(), StoreError>;

    fn upsert_level(&mut self, level: &Level) -> Result<(), StoreError>;

    fn levels(&self, symbol: &str, interval: Interval) -> Result<Vec<Level>, StoreError>;

    fn clear_levels(&mut self, symbol: &str, interval: Interval) -> Result<(), StoreError>;

    fn clear_filtered_levels(&mut self, symbol: &str, interval: Interval) -> Result<(), StoreError>;

    fn insert_filtered_level(&mut self, symbol: &str, interval: Interval, value: f64) -> Result<(), StoreError>;

    /// Filtered levels for one timeframe, ascending.
    fn filtered_levels(&self, symbol: &str, interval: Interval) -> Result<Vec<f64>, StoreError>;

    fn clear_combined_levels(&mut self, symbol: &str) -> Result<(), StoreError>;

    fn insert_combined_level(&mut self, symbol: &str, value: f64) -> Result<(), StoreError>;

    /// Combined levels for `symbol`, ascending.
    fn combined_levels(&self, symbol: &str) -> Result<Vec<CombinedLevel>, StoreError>;
}

pub(crate) fn ensure_finite(table: &'static str, fields: &[(&str, f64)]) -> Result<(), StoreError> {
    match fields.iter().find(|(_, v)| !v.is_finite()) {
        Some((name, v)) => Err(StoreError::InvalidRow {
            table,
            reason: format!("{name} is {v}"),
        }),
        None => Ok(()),
    }
}

pub fn upsert_price_bars<S: MarketStore + ?Sized>(
    store: &mut S,
    symbol: &str,
    interval: Interval,
    bars: &[PriceBar],
) -> UpsertReport {
    let mut report = UpsertReport::default();
    for bar in bars {
        let result = store.upsert_price_bar(symbol, interval, bar);
        report.record("price_data", || format!("{symbol}/{interval}/{}", bar.timestamp), result);
    }
    report
}

pub fn upsert_pivots<S: MarketStore + ?Sized>(
    store: &mut S,
    symbol: &str,
    interval: Interval,
    pivots: &[PivotPoint],
) -> UpsertReport {
    let mut report = UpsertReport::default();
    for pivot in pivots {
        let result = store.upsert_pivot(symbol, interval, pivot);
        report.record("pivot_points", || format!("{symbol}/{interval}/{}", pivot.timestamp), result);
    }
    report
}

pub fn upsert_levels<S: MarketStore + ?Sized>(store: &mut S, levels: &[Level]) -> UpsertReport {
    let mut report = UpsertReport::default();
    for level in levels {
        let result = store.upsert_level(level);
        report.record(
            "price_levels",
            || format!("{}/{}/{}/{}", level.symbol, level.interval, level.timestamp, level.kind),
            result,
        );
    }
    report
}

/// Replace one timeframe's pivots wholesale, so rows of bars that are no
/// longer in the input do not survive a recomputation.
pub fn replace_pivots<S: MarketStore + ?Sized>(
    store: &mut S,
    symbol: &str,
    interval: Interval,
    pivots: &[PivotPoint],
) -> Result<UpsertReport, StoreError> {
    store.clear_pivots(symbol, interval)?;
    Ok(upsert_pivots(store, symbol, interval, pivots))
}

/// Replace one timeframe's flattened levels wholesale. Level rows are keyed
/// by value, so a corrected bar would otherwise leave its old rows behind.
pub fn replace_levels<S: MarketStore + ?Sized>(
    store: &mut S,
    symbol: &str,
    interval: Interval,
    levels: &[Level],
) -> Result<UpsertReport, StoreError> {
    store.clear_levels(symbol, interval)?;
    Ok(upsert_levels(store, levels))
}

/// Replace one timeframe's filtered levels. Failing to clear is fatal;
/// failing rows are counted.
pub fn replace_filtered_levels<S: MarketStore + ?Sized>(
    store: &mut S,
    symbol: &str,
    interval: Interval,
    levels: &[f64],
) -> Result<UpsertReport, StoreError> {
    store.clear_filtered_levels(symbol, interval)?;
    let mut report = UpsertReport::default();
    for &value in levels {
        let result = store.insert_filtered_level(symbol, interval, value);
        report.record("filtered_price_levels", || format!("{symbol}/{interval}/{value}"), result);
    }
    Ok(report)
}

/// Replace a symbol's combined levels wholesale.
pub fn replace_combined_levels<S: MarketStore + ?Sized>(
    store: &mut S,
    symbol: &str,
    levels: &[f64],
) -> Result<UpsertReport, StoreError> {
    store.clear_combined_levels(symbol)?;
    let mut report = UpsertReport::default();
    for &value in levels {
        let result = store.insert_combined_level(symbol, value);
        report.record("combined_price_levels", || format!("{symbol}/{value}"), result);
    }
    Ok(report)
}

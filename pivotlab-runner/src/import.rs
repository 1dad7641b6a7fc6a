//! CSV import of OHLCV bars into a store.
//!
//! Expected header: `timestamp,open,high,low,close,volume`. Timestamps are
//! `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, or a bare date (midnight).
//! Empty numeric cells become gaps for forward filling; rows that cannot be
//! parsed at all are skipped and counted.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use pivotlab_core::domain::{Interval, PriceBar, TIMESTAMP_FORMAT};
use pivotlab_core::store::{upsert_price_bars, MarketStore, UpsertReport};

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub rows: usize,
    pub parsed: usize,
    pub skipped: usize,
    pub writes: UpsertReport,
}

pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0))
}

/// Parse bars from any CSV source. Returns the bars and the number of
/// skipped rows.
pub fn read_bars_csv<R: Read>(reader: R) -> Result<(Vec<PriceBar>, usize)> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(line = line + 2, error = %e, "unparseable CSV row; skipping");
                skipped += 1;
                continue;
            }
        };
        let Some(timestamp) = parse_timestamp(&row.timestamp) else {
            tracing::warn!(line = line + 2, timestamp = %row.timestamp, "bad timestamp; skipping");
            skipped += 1;
            continue;
        };
        let gap = |v: Option<f64>| v.unwrap_or(f64::NAN);
        bars.push(PriceBar::new(
            timestamp,
            gap(row.open),
            gap(row.high),
            gap(row.low),
            gap(row.close),
            gap(row.volume),
        ));
    }
    Ok((bars, skipped))
}

/// Import a CSV file into `price_data` for one symbol and interval.
///
/// Gap cells are stored only if forward filling can complete them;
/// bars still non-finite afterwards are refused by the store and counted.
pub fn import_csv<S: MarketStore + ?Sized>(
    store: &mut S,
    path: &Path,
    symbol: &str,
    interval: Interval,
) -> Result<ImportReport> {
    let file = std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let (mut bars, skipped) =
        read_bars_csv(file).with_context(|| format!("failed to read bars from {}", path.display()))?;
    bars.sort_by_key(|b| b.timestamp);
    pivotlab_core::data::forward_fill(&mut bars);

    let writes = upsert_price_bars(store, symbol, interval, &bars);
    let report = ImportReport {
        rows: bars.len() + skipped,
        parsed: bars.len(),
        skipped,
        writes,
    };
    tracing::info!(
        symbol,
        interval = %interval,
        parsed = report.parsed,
        skipped = report.skipped,
        written = report.writes.written,
        "CSV import complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pivotlab_core::store::MemoryStore;

    const SAMPLE: &str = "\
timestamp,open,high,low,close,volume
2024-01-01 00:00:00,1.2000,1.2050,1.1950,1.2010,1000
2024-01-01T01:00:00,1.2010,1.2060,1.1960,1.2020,1100
not-a-date,1,1,1,1,1
2024-01-01 02:00:00,1.2020,,1.1970,1.2030,1200
";

    #[test]
    fn timestamp_formats() {
        assert!(parse_timestamp("2024-01-01 13:45:00").is_some());
        assert!(parse_timestamp("2024-01-01T13:45:00").is_some());
        assert_eq!(
            parse_timestamp("2024-01-02"),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(0, 0, 0)
        );
        assert!(parse_timestamp("01/02/2024").is_none());
    }

    #[test]
    fn bad_rows_are_skipped_and_gaps_kept() {
        let (bars, skipped) = read_bars_csv(SAMPLE.as_bytes()).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(skipped, 1);
        assert!(bars[2].high.is_nan());
        assert_eq!(bars[1].close, 1.2020);
    }

    #[test]
    fn import_fills_gaps_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let mut store = MemoryStore::new();
        let report = import_csv(&mut store, &path, "EURUSD", Interval::Hourly).unwrap();
        assert_eq!(report.rows, 4);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.writes.written, 3);

        let stored = store.price_bars("EURUSD", Interval::Hourly).unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[2].high, 1.2060);
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut store = MemoryStore::new();
        assert!(import_csv(&mut store, Path::new("/nonexistent/bars.csv"), "X", Interval::Daily).is_err());
    }
}

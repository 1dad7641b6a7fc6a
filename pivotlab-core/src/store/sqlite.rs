//! SQLite-backed store (rusqlite, bundled SQLite).
//!
//! Every statement uses bound parameters. Timestamps are stored as TEXT in
//! `TIMESTAMP_FORMAT`, intervals and level kinds as their display strings.

use super::{ensure_finite, MarketStore, StoreError};
use crate::domain::{CombinedLevel, Interval, Level, LevelKind, PivotPoint, PriceBar, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::path::Path;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS price_data (
    timestamp TEXT NOT NULL,
    symbol    TEXT NOT NULL,
    open      REAL NOT NULL,
    high      REAL NOT NULL,
    low       REAL NOT NULL,
    close     REAL NOT NULL,
    volume    REAL NOT NULL,
    interval  TEXT NOT NULL,
    PRIMARY KEY (symbol, timestamp, interval)
);

CREATE TABLE IF NOT EXISTS pivot_points (
    timestamp   TEXT NOT NULL,
    pivot       REAL NOT NULL,
    support1    REAL NOT NULL,
    resistance1 REAL NOT NULL,
    support2    REAL NOT NULL,
    resistance2 REAL NOT NULL,
    symbol      TEXT NOT NULL,
    interval    TEXT NOT NULL,
    PRIMARY KEY (symbol, timestamp, interval)
);

CREATE TABLE IF NOT EXISTS price_levels (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    symbol    TEXT NOT NULL,
    interval  TEXT NOT NULL,
    level     REAL NOT NULL,
    type      TEXT NOT NULL,
    UNIQUE (timestamp, symbol, interval, level, type)
);

CREATE TABLE IF NOT EXISTS filtered_price_levels (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol   TEXT NOT NULL,
    interval TEXT NOT NULL,
    level    REAL NOT NULL,
    UNIQUE (symbol, interval, level)
);

CREATE TABLE IF NOT EXISTS combined_price_levels (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    level  REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_price_levels_symbol ON price_levels(symbol, interval);
CREATE INDEX IF NOT EXISTS idx_combined_symbol ON combined_price_levels(symbol);
"#;

/// Store over a single SQLite connection.
pub struct SqliteStore {
    conn: Connection,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl SqliteStore {
    /// Open or create the database at `path` and ensure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = Self {
            conn: Connection::open(path)?,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create all tables if missing. Idempotent.
    pub fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        tracing::debug!("database schema initialized");
        Ok(())
    }
}

fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(table: &'static str, raw: &str) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|e| StoreError::Decode {
        table,
        column: "timestamp",
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_interval(table: &'static str, raw: &str) -> Result<Interval, StoreError> {
    raw.parse().map_err(|e: crate::domain::ParseIntervalError| StoreError::Decode {
        table,
        column: "interval",
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

impl MarketStore for SqliteStore {
    fn upsert_price_bar(&mut self, symbol: &str, interval: Interval, bar: &PriceBar) -> Result<(), StoreError> {
        ensure_finite(
            "price_data",
            &[
                ("open", bar.open),
                ("high", bar.high),
                ("low", bar.low),
                ("close", bar.close),
                ("volume", bar.volume),
            ],
        )?;
        self.conn.execute(
            "INSERT OR REPLACE INTO price_data
             (timestamp, symbol, open, high, low, close, volume, interval)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                format_timestamp(&bar.timestamp),
                symbol,
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume,
                interval.as_str(),
            ],
        )?;
        Ok(())
    }

    fn price_bars(&self, symbol: &str, interval: Interval) -> Result<Vec<PriceBar>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, open, high, low, close, volume FROM price_data
             WHERE symbol = ?1 AND interval = ?2 ORDER BY timestamp",
        )?;
        let rows = stmt.query_map(params![symbol, interval.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
            ))
        })?;

        let mut bars = Vec::new();
        for row in rows {
            let (ts, open, high, low, close, volume) = row?;
            bars.push(PriceBar::new(parse_timestamp("price_data", &ts)?, open, high, low, close, volume));
        }
        Ok(bars)
    }

    fn intervals(&self, symbol: &str) -> Result<Vec<Interval>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT interval FROM price_data WHERE symbol = ?1")?;
        let rows = stmt.query_map(params![symbol], |row| row.get::<_, String>(0))?;
        let mut intervals = Vec::new();
        for row in rows {
            intervals.push(parse_interval("price_data", &row?)?);
        }
        intervals.sort();
        Ok(intervals)
    }

    fn upsert_pivot(&mut self, symbol: &str, interval: Interval, pivot: &PivotPoint) -> Result<(), StoreError> {
        ensure_finite(
            "pivot_points",
            &[
                ("pivot", pivot.pivot),
                ("support1", pivot.support1),
                ("resistance1", pivot.resistance1),
                ("support2", pivot.support2),
                ("resistance2", pivot.resistance2),
            ],
        )?;
        self.conn.execute(
            "INSERT OR REPLACE INTO pivot_points
             (timestamp, pivot, support1, resistance1, support2, resistance2, symbol, interval)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                format_timestamp(&pivot.timestamp),
                pivot.pivot,
                pivot.support1,
                pivot.resistance1,
                pivot.support2,
                pivot.resistance2,
                symbol,
                interval.as_str(),
            ],
        )?;
        Ok(())
    }

    fn pivots(&self, symbol: &str, interval: Interval) -> Result<Vec<PivotPoint>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, pivot, support1, resistance1, support2, resistance2 FROM pivot_points
             WHERE symbol = ?1 AND interval = ?2 ORDER BY timestamp",
        )?;
        let rows = stmt.query_map(params![symbol, interval.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
            ))
        })?;

        let mut pivots = Vec::new();
        for row in rows {
            let (ts, pivot, support1, resistance1, support2, resistance2) = row?;
            pivots.push(PivotPoint {
                timestamp: parse_timestamp("pivot_points", &ts)?,
                pivot,
                support1,
                resistance1,
                support2,
                resistance2,
            });
        }
        Ok(pivots)
    }

    fn clear_pivots(&mut self, symbol: &str, interval: Interval) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM pivot_points WHERE symbol = ?1 AND interval = ?2",
            params![symbol, interval.as_str()],
        )?;
        Ok(())
    }

    fn upsert_level(&mut self, level: &Level) -> Result<(), StoreError> {
        ensure_finite("price_levels", &[("level", level.value)])?;
        self.conn.execute(
            "INSERT OR REPLACE INTO price_levels (timestamp, symbol, interval, level, type)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                format_timestamp(&level.timestamp),
                level.symbol,
                level.interval.as_str(),
                level.value,
                level.kind.as_str(),
            ],
        )?;
        Ok(())
    }

    fn levels(&self, symbol: &str, interval: Interval) -> Result<Vec<Level>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, level, type FROM price_levels
             WHERE symbol = ?1 AND interval = ?2",
        )?;
        let rows = stmt.query_map(params![symbol, interval.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut levels = Vec::new();
        for row in rows {
            let (ts, value, kind) = row?;
            let kind: LevelKind = kind.parse().map_err(|e: crate::domain::ParseLevelKindError| {
                StoreError::Decode {
                    table: "price_levels",
                    column: "type",
                    value: kind.clone(),
                    reason: e.to_string(),
                }
            })?;
            levels.push(Level {
                timestamp: parse_timestamp("price_levels", &ts)?,
                symbol: symbol.to_string(),
                interval,
                value,
                kind,
            });
        }
        levels.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.kind.cmp(&b.kind))
                .then(a.value.total_cmp(&b.value))
        });
        Ok(levels)
    }

    fn clear_levels(&mut self, symbol: &str, interval: Interval) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM price_levels WHERE symbol = ?1 AND interval = ?2",
            params![symbol, interval.as_str()],
        )?;
        Ok(())
    }

    fn clear_filtered_levels(&mut self, symbol: &str, interval: Interval) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM filtered_price_levels WHERE symbol = ?1 AND interval = ?2",
            params![symbol, interval.as_str()],
        )?;
        Ok(())
    }

    fn insert_filtered_level(&mut self, symbol: &str, interval: Interval, value: f64) -> Result<(), StoreError> {
        ensure_finite("filtered_price_levels", &[("level", value)])?;
        self.conn.execute(
            "INSERT OR REPLACE INTO filtered_price_levels (symbol, interval, level) VALUES (?1, ?2, ?3)",
            params![symbol, interval.as_str(), value],
        )?;
        Ok(())
    }

    fn filtered_levels(&self, symbol: &str, interval: Interval) -> Result<Vec<f64>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT level FROM filtered_price_levels WHERE symbol = ?1 AND interval = ?2 ORDER BY level",
        )?;
        let rows = stmt.query_map(params![symbol, interval.as_str()], |row| row.get::<_, f64>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn clear_combined_levels(&mut self, symbol: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM combined_price_levels WHERE symbol = ?1",
            params![symbol],
        )?;
        Ok(())
    }

    fn insert_combined_level(&mut self, symbol: &str, value: f64) -> Result<(), StoreError> {
        ensure_finite("combined_price_levels", &[("level", value)])?;
        self.conn.execute(
            "INSERT INTO combined_price_levels (symbol, level) VALUES (?1, ?2)",
            params![symbol, value],
        )?;
        Ok(())
    }

    fn combined_levels(&self, symbol: &str) -> Result<Vec<CombinedLevel>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT level FROM combined_price_levels WHERE symbol = ?1 ORDER BY level")?;
        let rows = stmt.query_map(params![symbol], |row| row.get::<_, f64>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(CombinedLevel {
                symbol: symbol.to_string(),
                value: row?,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;
    use crate::levels::{compute_pivots, flatten_pivots};
    use crate::store::{
        replace_filtered_levels, replace_levels, replace_pivots, upsert_levels, upsert_pivots, upsert_price_bars,
    };

    #[test]
    fn schema_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        store.init_schema().unwrap();
    }

    #[test]
    fn bars_round_trip_through_text_timestamps() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let bars = make_bars(&[1.20, 1.21, 1.19]);
        let report = upsert_price_bars(&mut store, "EURUSD", Interval::Hourly, &bars);
        assert!(report.is_clean());
        assert_eq!(store.price_bars("EURUSD", Interval::Hourly).unwrap(), bars);
        assert_eq!(store.intervals("EURUSD").unwrap(), vec![Interval::Hourly]);
        assert!(store.intervals("GBPUSD").unwrap().is_empty());
    }

    #[test]
    fn upsert_overwrites_by_natural_key() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut bars = make_bars(&[1.0, 2.0]);
        upsert_price_bars(&mut store, "EURUSD", Interval::Daily, &bars);
        bars[1].close = 2.5;
        upsert_price_bars(&mut store, "EURUSD", Interval::Daily, &bars[1..]);
        let stored = store.price_bars("EURUSD", Interval::Daily).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].close, 2.5);
    }

    #[test]
    fn pivots_and_levels_persist() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let pivots = compute_pivots(&bars);
        assert!(upsert_pivots(&mut store, "EURUSD", Interval::Daily, &pivots).is_clean());
        assert_eq!(store.pivots("EURUSD", Interval::Daily).unwrap(), pivots);

        let levels = flatten_pivots("EURUSD", Interval::Daily, &pivots);
        let report = upsert_levels(&mut store, &levels);
        assert_eq!(report.written, 12);
        // Same rows again: unique key, no duplicates.
        upsert_levels(&mut store, &levels);
        assert_eq!(store.levels("EURUSD", Interval::Daily).unwrap().len(), 12);
    }

    #[test]
    fn pivot_replace_removes_dropped_bars() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let pivots = compute_pivots(&bars);
        replace_pivots(&mut store, "EURUSD", Interval::Daily, &pivots).unwrap();
        replace_pivots(&mut store, "GBPUSD", Interval::Daily, &pivots).unwrap();

        let report = replace_pivots(&mut store, "EURUSD", Interval::Daily, &pivots[..2]).unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(store.pivots("EURUSD", Interval::Daily).unwrap(), pivots[..2].to_vec());
        assert_eq!(store.pivots("GBPUSD", Interval::Daily).unwrap().len(), 3);

        let mut moved = bars.clone();
        moved[0].low -= 0.25;
        let levels = flatten_pivots("EURUSD", Interval::Daily, &compute_pivots(&bars));
        let corrected = flatten_pivots("EURUSD", Interval::Daily, &compute_pivots(&moved));
        upsert_levels(&mut store, &levels);
        replace_levels(&mut store, "EURUSD", Interval::Daily, &corrected).unwrap();
        assert_eq!(store.levels("EURUSD", Interval::Daily).unwrap(), sorted_levels(corrected));
    }

    fn sorted_levels(mut levels: Vec<Level>) -> Vec<Level> {
        levels.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.kind.cmp(&b.kind))
                .then(a.value.total_cmp(&b.value))
        });
        levels
    }

    #[test]
    fn failing_row_does_not_abort_batch() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let report =
            replace_filtered_levels(&mut store, "EURUSD", Interval::Daily, &[1.1, f64::NAN, 1.3]).unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.written, 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].table, "filtered_price_levels");
        assert_eq!(store.filtered_levels("EURUSD", Interval::Daily).unwrap(), vec![1.1, 1.3]);
    }
}

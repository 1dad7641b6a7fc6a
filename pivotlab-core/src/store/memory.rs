//! In-memory store with the same keys and ordering as the SQLite schema.

use super::{ensure_finite, MarketStore, StoreError};
use crate::domain::{CombinedLevel, Interval, Level, LevelKind, PivotPoint, PriceBar};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};

type SeriesKey = (String, Interval, NaiveDateTime);
type LevelKey = (String, Interval, NaiveDateTime, LevelKind, u64);

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    bars: BTreeMap<SeriesKey, PriceBar>,
    pivots: BTreeMap<SeriesKey, PivotPoint>,
    levels: BTreeMap<LevelKey, Level>,
    filtered: BTreeMap<(String, Interval), Vec<f64>>,
    combined: BTreeMap<String, Vec<f64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

impl MarketStore for MemoryStore {
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
        self.bars.insert((symbol.to_string(), interval, bar.timestamp), *bar);
        Ok(())
    }

    fn price_bars(&self, symbol: &str, interval: Interval) -> Result<Vec<PriceBar>, StoreError> {
        Ok(self
            .bars
            .iter()
            .filter(|((s, i, _), _)| s == symbol && *i == interval)
            .map(|(_, bar)| *bar)
            .collect())
    }

    fn intervals(&self, symbol: &str) -> Result<Vec<Interval>, StoreError> {
        let set: BTreeSet<Interval> = self
            .bars
            .keys()
            .filter(|(s, _, _)| s == symbol)
            .map(|(_, i, _)| *i)
            .collect();
        Ok(set.into_iter().collect())
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
        self.pivots.insert((symbol.to_string(), interval, pivot.timestamp), *pivot);
        Ok(())
    }

    fn pivots(&self, symbol: &str, interval: Interval) -> Result<Vec<PivotPoint>, StoreError> {
        Ok(self
            .pivots
            .iter()
            .filter(|((s, i, _), _)| s == symbol && *i == interval)
            .map(|(_, p)| *p)
            .collect())
    }

    fn clear_pivots(&mut self, symbol: &str, interval: Interval) -> Result<(), StoreError> {
        self.pivots.retain(|(s, i, _), _| !(s == symbol && *i == interval));
        Ok(())
    }

    fn upsert_level(&mut self, level: &Level) -> Result<(), StoreError> {
        ensure_finite("price_levels", &[("level", level.value)])?;
        let key = (
            level.symbol.clone(),
            level.interval,
            level.timestamp,
            level.kind,
            level.value.to_bits(),
        );
        self.levels.insert(key, level.clone());
        Ok(())
    }

    fn levels(&self, symbol: &str, interval: Interval) -> Result<Vec<Level>, StoreError> {
        let mut out: Vec<Level> = self
            .levels
            .iter()
            .filter(|((s, i, ..), _)| s == symbol && *i == interval)
            .map(|(_, l)| l.clone())
            .collect();
        out.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.kind.cmp(&b.kind))
                .then(a.value.total_cmp(&b.value))
        });
        Ok(out)
    }

    fn clear_levels(&mut self, symbol: &str, interval: Interval) -> Result<(), StoreError> {
        self.levels.retain(|(s, i, ..), _| !(s == symbol && *i == interval));
        Ok(())
    }

    fn clear_filtered_levels(&mut self, symbol: &str, interval: Interval) -> Result<(), StoreError> {
        self.filtered.remove(&(symbol.to_string(), interval));
        Ok(())
    }

    fn insert_filtered_level(&mut self, symbol: &str, interval: Interval, value: f64) -> Result<(), StoreError> {
        ensure_finite("filtered_price_levels", &[("level", value)])?;
        let set = self.filtered.entry((symbol.to_string(), interval)).or_default();
        if !set.contains(&value) {
            set.push(value);
        }
        Ok(())
    }

    fn filtered_levels(&self, symbol: &str, interval: Interval) -> Result<Vec<f64>, StoreError> {
        Ok(sorted(
            self.filtered
                .get(&(symbol.to_string(), interval))
                .cloned()
                .unwrap_or_default(),
        ))
    }

    fn clear_combined_levels(&mut self, symbol: &str) -> Result<(), StoreError> {
        self.combined.remove(symbol);
        Ok(())
    }

    fn insert_combined_level(&mut self, symbol: &str, value: f64) -> Result<(), StoreError> {
        ensure_finite("combined_price_levels", &[("level", value)])?;
        self.combined.entry(symbol.to_string()).or_default().push(value);
        Ok(())
    }

    fn combined_levels(&self, symbol: &str) -> Result<Vec<CombinedLevel>, StoreError> {
        let values = sorted(self.combined.get(symbol).cloned().unwrap_or_default());
        Ok(values
            .into_iter()
            .map(|value| CombinedLevel {
                symbol: symbol.to_string(),
                value,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;
    use crate::levels::{compute_pivots, flatten_pivots};
    use crate::store::{replace_combined_levels, replace_levels, upsert_price_bars};

    #[test]
    fn bars_are_keyed_and_ordered() {
        let mut store = MemoryStore::new();
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let mut reversed = bars.clone();
        reversed.reverse();
        let report = upsert_price_bars(&mut store, "EURUSD", Interval::Daily, &reversed);
        assert_eq!(report.written, 3);

        // Re-upserting overwrites instead of duplicating.
        upsert_price_bars(&mut store, "EURUSD", Interval::Daily, &bars);
        assert_eq!(store.price_bars("EURUSD", Interval::Daily).unwrap(), bars);
        assert!(store.price_bars("EURUSD", Interval::Weekly).unwrap().is_empty());
        assert_eq!(store.intervals("EURUSD").unwrap(), vec![Interval::Daily]);
    }

    #[test]
    fn level_replace_drops_stale_values() {
        let mut store = MemoryStore::new();
        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        let levels = flatten_pivots("EURUSD", Interval::Daily, &compute_pivots(&bars));
        replace_levels(&mut store, "EURUSD", Interval::Daily, &levels).unwrap();
        replace_levels(&mut store, "EURUSD", Interval::Weekly, &levels).unwrap();

        bars[1].high += 0.5;
        let corrected = flatten_pivots("EURUSD", Interval::Daily, &compute_pivots(&bars[1..]));
        replace_levels(&mut store, "EURUSD", Interval::Daily, &corrected).unwrap();

        let stored = store.levels("EURUSD", Interval::Daily).unwrap();
        assert_eq!(stored.len(), 8);
        assert!(stored.iter().all(|l| l.timestamp != bars[0].timestamp));
        // Other timeframes are untouched.
        assert_eq!(store.levels("EURUSD", Interval::Weekly).unwrap().len(), 12);
    }

    #[test]
    fn combined_replace_is_wholesale() {
        let mut store = MemoryStore::new();
        replace_combined_levels(&mut store, "EURUSD", &[1.3, 1.1]).unwrap();
        replace_combined_levels(&mut store, "EURUSD", &[1.2]).unwrap();
        let values: Vec<f64> = store
            .combined_levels("EURUSD")
            .unwrap()
            .into_iter()
            .map(|c| c.value)
            .collect();
        assert_eq!(values, vec![1.2]);
    }
}

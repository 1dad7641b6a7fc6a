//! Pivot points and support/resistance levels.

use super::interval::Interval;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Pivot point and the four levels derived from a single bar.
///
/// Keyed by `(timestamp, interval)` in storage; recomputation overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotPoint {
    pub timestamp: NaiveDateTime,
    pub pivot: f64,
    pub support1: f64,
    pub resistance1: f64,
    pub support2: f64,
    pub resistance2: f64,
}

impl PivotPoint {
    /// Value of one derived level.
    pub fn level(&self, kind: LevelKind) -> f64 {
        match kind {
            LevelKind::Support1 => self.support1,
            LevelKind::Support2 => self.support2,
            LevelKind::Resistance1 => self.resistance1,
            LevelKind::Resistance2 => self.resistance2,
        }
    }
}

/// Which derived level a value represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LevelKind {
    Support1,
    Support2,
    Resistance1,
    Resistance2,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown level type '{0}'")]
pub struct ParseLevelKindError(pub String);

impl LevelKind {
    pub const ALL: [LevelKind; 4] = [
        LevelKind::Support1,
        LevelKind::Support2,
        LevelKind::Resistance1,
        LevelKind::Resistance2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LevelKind::Support1 => "Support1",
            LevelKind::Support2 => "Support2",
            LevelKind::Resistance1 => "Resistance1",
            LevelKind::Resistance2 => "Resistance2",
        }
    }

    pub fn is_support(&self) -> bool {
        matches!(self, LevelKind::Support1 | LevelKind::Support2)
    }
}

impl fmt::Display for LevelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LevelKind {
    type Err = ParseLevelKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LevelKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ParseLevelKindError(s.to_string()))
    }
}

/// A support or resistance level for one symbol and interval.
///
/// Not tied to a single bar: a level flattened from a pivot point carries the
/// pivot's timestamp, a clustered band carries the timestamp of the latest
/// bar it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub interval: Interval,
    pub value: f64,
    pub kind: LevelKind,
}

/// A level merged across timeframes. Owns no interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedLevel {
    pub symbol: String,
    pub value: f64,
}

//! Bar interval (timeframe) identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Timeframe of a bar sequence.
///
/// Rendered as the string stored in the `interval` column of every table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    Hourly,
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "weekly")]
    Weekly,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown interval '{0}' (expected one of: 15m, 1h, daily, weekly)")]
pub struct ParseIntervalError(pub String);

impl Interval {
    pub const ALL: [Interval; 4] = [
        Interval::FifteenMinutes,
        Interval::Hourly,
        Interval::Daily,
        Interval::Weekly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::FifteenMinutes => "15m",
            Interval::Hourly => "1h",
            Interval::Daily => "daily",
            Interval::Weekly => "weekly",
        }
    }

    /// Nominal bar spacing.
    pub fn duration(&self) -> chrono::Duration {
        match self {
            Interval::FifteenMinutes => chrono::Duration::minutes(15),
            Interval::Hourly => chrono::Duration::hours(1),
            Interval::Daily => chrono::Duration::days(1),
            Interval::Weekly => chrono::Duration::weeks(1),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ParseIntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "15m" => Ok(Interval::FifteenMinutes),
            "1h" | "hourly" => Ok(Interval::Hourly),
            "daily" | "1d" => Ok(Interval::Daily),
            "weekly" | "1w" => Ok(Interval::Weekly),
            _ => Err(ParseIntervalError(s.to_string())),
        }
    }
}

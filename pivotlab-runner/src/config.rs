//! Serializable pipeline and backtest configuration.
//!
//! Both configs are read from TOML and validated before anything runs.
//! Every section except the symbol has defaults, so a minimal file is
//!
//! ```toml
//! symbol = "EURUSD"
//! ```

use pivotlab_core::domain::Interval;
use pivotlab_core::engine::{BpsCostModel, CostModel, Frictionless, StrategyConfig};
use pivotlab_core::levels::{
    ObservationSource, DEFAULT_CLUSTER_COUNT, DEFAULT_RSI_THRESHOLD, DEFAULT_RSI_WINDOW, DEFAULT_SEED,
};
use pivotlab_core::AnalysisError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("invalid strategy parameters: {0}")]
    Strategy(#[from] AnalysisError),
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn validate_symbol(symbol: &str) -> Result<(), ConfigError> {
    if symbol.trim().is_empty() {
        return Err(ConfigError::invalid("symbol", "must not be empty"));
    }
    Ok(())
}

// ── Shared sections ──────────────────────────────────────────────────

/// Bar preparation applied after loading from the store.
///
/// The plain default only dedups, drops noise bars and forward-fills. A
/// `[cleaning]` section in TOML starts from that default, so outlier
/// rejection is on only where `outlier_z` is given or the pipeline default
/// applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub forward_fill: bool,
    /// z-score cut-off; `None` disables outlier rejection.
    pub outlier_z: Option<f64>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            forward_fill: true,
            outlier_z: None,
        }
    }
}

impl CleaningConfig {
    pub fn with_outlier_z(z: f64) -> Self {
        Self {
            outlier_z: Some(z),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(z) = self.outlier_z {
            if !(z.is_finite() && z > 0.0) {
                return Err(ConfigError::invalid("cleaning.outlier_z", format!("{z} must be a positive number")));
            }
        }
        Ok(())
    }
}

// ── Level pipeline ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub k: usize,
    /// Master seed; each (symbol, interval) gets a derived sub-seed.
    pub seed: u64,
    pub source: ObservationSource,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_CLUSTER_COUNT,
            seed: DEFAULT_SEED,
            source: ObservationSource::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiConfig {
    pub window: usize,
    pub threshold: f64,
    /// Take RSI and the reference price from this timeframe for every
    /// timeframe. Unset: each timeframe uses its own bars.
    pub momentum_interval: Option<Interval>,
}

impl Default for RsiConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_RSI_WINDOW,
            threshold: DEFAULT_RSI_THRESHOLD,
            momentum_interval: None,
        }
    }
}

fn default_pipeline_cleaning() -> CleaningConfig {
    CleaningConfig::with_outlier_z(pivotlab_core::data::DEFAULT_OUTLIER_Z)
}

fn default_timeframes() -> Vec<Interval> {
    vec![Interval::Daily, Interval::Weekly, Interval::Hourly, Interval::FifteenMinutes]
}

/// Configuration of one level-pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub symbol: String,
    #[serde(default = "default_timeframes")]
    pub timeframes: Vec<Interval>,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub rsi: RsiConfig,
    #[serde(default = "default_pipeline_cleaning")]
    pub cleaning: CleaningConfig,
}

impl PipelineConfig {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframes: default_timeframes(),
            clustering: ClusteringConfig::default(),
            rsi: RsiConfig::default(),
            cleaning: default_pipeline_cleaning(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read_file(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_symbol(&self.symbol)?;
        if self.timeframes.is_empty() {
            return Err(ConfigError::invalid("timeframes", "at least one timeframe is required"));
        }
        for (i, tf) in self.timeframes.iter().enumerate() {
            if self.timeframes[..i].contains(tf) {
                return Err(ConfigError::invalid("timeframes", format!("'{tf}' is listed twice")));
            }
        }
        if self.clustering.k == 0 {
            return Err(ConfigError::invalid("clustering.k", "must be >= 1"));
        }
        if self.rsi.window == 0 {
            return Err(ConfigError::invalid("rsi.window", "must be >= 1"));
        }
        if !(0.0..=100.0).contains(&self.rsi.threshold) {
            return Err(ConfigError::invalid(
                "rsi.threshold",
                format!("{} is outside [0, 100]", self.rsi.threshold),
            ));
        }
        self.cleaning.validate()
    }
}

// ── Backtest ─────────────────────────────────────────────────────────

/// Trading cost model selection.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CostModelConfig {
    #[default]
    Frictionless,
    Bps { slippage_bps: f64, commission_bps: f64 },
}

impl CostModelConfig {
    pub fn build(&self) -> Box<dyn CostModel> {
        match *self {
            CostModelConfig::Frictionless => Box::new(Frictionless),
            CostModelConfig::Bps {
                slippage_bps,
                commission_bps,
            } => Box::new(BpsCostModel::new(slippage_bps, commission_bps)),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let CostModelConfig::Bps {
            slippage_bps,
            commission_bps,
        } = *self
        {
            for (field, v) in [("costs.slippage_bps", slippage_bps), ("costs.commission_bps", commission_bps)] {
                if !(v.is_finite() && v >= 0.0) {
                    return Err(ConfigError::invalid(field, format!("{v} must be a non-negative number")));
                }
            }
        }
        Ok(())
    }
}

fn default_backtest_interval() -> Interval {
    Interval::Hourly
}



/// Configuration of one single-instrument backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub symbol: String,
    #[serde(default = "default_backtest_interval")]
    pub interval: Interval,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub costs: CostModelConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
}

impl BacktestConfig {
    pub fn new(symbol: impl Into<String>, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            strategy: StrategyConfig::default(),
            costs: CostModelConfig::default(),
            cleaning: CleaningConfig::default(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read_file(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_symbol(&self.symbol)?;
        self.strategy.validate()?;
        self.costs.validate()?;
        self.cleaning.validate()
    }

    /// Deterministic content hash of this configuration.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_pipeline_config_uses_defaults() {
        let config = PipelineConfig::from_toml_str(r#"symbol = "EURUSD""#).unwrap();
        assert_eq!(config.clustering.k, 5);
        assert_eq!(config.clustering.seed, 0);
        assert_eq!(config.rsi.window, 14);
        assert_eq!(config.rsi.threshold, 50.0);
        assert_eq!(config.timeframes.len(), 4);
        assert!(config.rsi.momentum_interval.is_none());
        assert_eq!(config.clustering.source, ObservationSource::Pivots);
        assert_eq!(config.cleaning.outlier_z, Some(3.0));
    }

    #[test]
    fn full_pipeline_config() {
        let toml = r#"
            symbol = "EURUSD"
            timeframes = ["daily", "1h"]

            [clustering]
            k = 3
            seed = 42
            source = "high_low"

            [rsi]
            window = 10
            threshold = 55.0
            momentum_interval = "1h"

            [cleaning]
            forward_fill = false
            outlier_z = 2.5
        "#;
        let config = PipelineConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.timeframes, vec![Interval::Daily, Interval::Hourly]);
        assert_eq!(config.clustering.k, 3);
        assert_eq!(config.clustering.source, ObservationSource::HighLow);
        assert_eq!(config.rsi.momentum_interval, Some(Interval::Hourly));
        assert!(!config.cleaning.forward_fill);
        assert_eq!(config.cleaning.outlier_z, Some(2.5));
    }

    #[test]
    fn invalid_pipeline_values_are_rejected() {
        for toml in [
            "symbol = \"\"",
            "symbol = \"EURUSD\"\ntimeframes = []",
            "symbol = \"EURUSD\"\ntimeframes = [\"daily\", \"daily\"]",
            "symbol = \"EURUSD\"\n[clustering]\nk = 0",
            "symbol = \"EURUSD\"\n[rsi]\nthreshold = 120.0",
            "symbol = \"EURUSD\"\n[rsi]\nwindow = 0",
            "symbol = \"EURUSD\"\n[cleaning]\noutlier_z = -1.0",
        ] {
            assert!(
                matches!(PipelineConfig::from_toml_str(toml), Err(ConfigError::Invalid { .. })),
                "accepted: {toml}"
            );
        }
    }

    #[test]
    fn unknown_interval_is_a_parse_error() {
        let err = PipelineConfig::from_toml_str("symbol = \"X\"\ntimeframes = [\"4h\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn backtest_config_with_costs() {
        let toml = r#"
            symbol = "EURUSD"
            interval = "daily"

            [strategy]
            sma_short_period = 20
            sma_long_period = 100
            initial_cash = 50000.0

            [costs]
            type = "bps"
            slippage_bps = 1.0
            commission_bps = 2.0
        "#;
        let config = BacktestConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.interval, Interval::Daily);
        assert_eq!(config.strategy.sma_long_period, 100);
        assert_eq!(config.strategy.bb_period, 50);
        assert_eq!(
            config.costs,
            CostModelConfig::Bps {
                slippage_bps: 1.0,
                commission_bps: 2.0
            }
        );
        assert_eq!(config.costs.build().name(), "bps");
    }

    #[test]
    fn backtest_cleaning_keeps_valid_bars_by_default() {
        assert_eq!(BacktestConfig::new("EURUSD", Interval::Hourly).cleaning.outlier_z, None);
        let config = BacktestConfig::from_toml_str(r#"symbol = "EURUSD""#).unwrap();
        assert_eq!(config.cleaning, CleaningConfig::default());
        assert!(config.cleaning.forward_fill);

        let partial = BacktestConfig::from_toml_str("symbol = \"EURUSD\"\n[cleaning]\nforward_fill = false").unwrap();
        assert_eq!(partial.cleaning.outlier_z, None);

        let opted_in = BacktestConfig::from_toml_str("symbol = \"EURUSD\"\n[cleaning]\noutlier_z = 4.0").unwrap();
        assert_eq!(opted_in.cleaning.outlier_z, Some(4.0));
    }

    #[test]
    fn backtest_strategy_errors_surface() {
        let toml = "symbol = \"EURUSD\"\n[strategy]\nsma_short_period = 300";
        assert!(matches!(
            BacktestConfig::from_toml_str(toml),
            Err(ConfigError::Strategy(AnalysisError::InvalidParameter { .. }))
        ));
    }

    #[test]
    fn config_hash_is_stable() {
        let a = BacktestConfig::new("EURUSD", Interval::Hourly);
        let b = BacktestConfig::new("EURUSD", Interval::Hourly);
        let c = BacktestConfig::new("GBPUSD", Interval::Hourly);
        assert_eq!(a.config_hash(), b.config_hash());
        assert_ne!(a.config_hash(), c.config_hash());
    }
}

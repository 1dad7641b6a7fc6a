//! Errors raised by the computational stages (indicators, level pipeline,
//! strategy engine).
//!
//! Every variant carries the conditions that caused it so the caller can
//! report them without guessing.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Too few observations for a windowed or clustered computation.
    #[error("insufficient data for {what}: need {required}, have {available}")]
    InsufficientData {
        what: &'static str,
        required: usize,
        available: usize,
    },

    /// A backtest was started below the longest indicator lookback.
    #[error("insufficient history: backtest needs at least {required} bars, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    /// Zero-variance input to a statistical routine with no fallback.
    #[error("degenerate input: {what}")]
    DegenerateInput { what: String },

    /// Invalid window, threshold, or cluster count passed to a routine.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl AnalysisError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        AnalysisError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

//! Small statistics helpers shared by indicators and data cleaning.

use crate::error::AnalysisError;

/// Arithmetic mean. NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by N). NaN for an empty slice.
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let variance = values
        .iter()
        .map(|v| {
            let d = v - m;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Population z-scores of a series.
///
/// A series with zero spread has no defined z-score and is reported as
/// `DegenerateInput`; callers decide on the fallback.
pub fn zscores(values: &[f64]) -> Result<Vec<f64>, AnalysisError> {
    if values.is_empty() {
        return Err(AnalysisError::InsufficientData {
            what: "z-score",
            required: 1,
            available: 0,
        });
    }
    let m = mean(values);
    let sd = population_std(values);
    if !sd.is_finite() || sd == 0.0 {
        return Err(AnalysisError::DegenerateInput {
            what: format!("z-score of {} values with zero variance", values.len()),
        });
    }
    Ok(values.iter().map(|v| (v - m) / sd).collect())
}

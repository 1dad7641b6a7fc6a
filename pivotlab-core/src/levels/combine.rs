//! Cross-timeframe merge: sorted, deduplicated union of level sets.

use crate::domain::CombinedLevel;

/// `sorted(unique(union(sets)))`. Non-finite values are dropped.
///
/// Idempotent, commutative and associative over its inputs.
pub fn combine_levels<S: AsRef<[f64]>>(sets: &[S]) -> Vec<f64> {
    let mut all: Vec<f64> = sets
        .iter()
        .flat_map(|s| s.as_ref().iter().copied())
        .filter(|v| v.is_finite())
        .collect();
    all.sort_by(|a, b| a.total_cmp(b));
    // -0.0 and 0.0 compare equal but sort apart; dedup by value equality.
    all.dedup_by(|a, b| a == b);
    all
}

/// Attach a symbol to a combined set.
pub fn to_combined(symbol: &str, levels: &[f64]) -> Vec<CombinedLevel> {
    levels
        .iter()
        .map(|&value| CombinedLevel {
            symbol: symbol.to_string(),
            value,
        })
        .collect()
}

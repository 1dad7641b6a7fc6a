//! Level extraction: seeded 1-D k-means over scalar price observations.
//!
//! Observations (typically every Support1 and Resistance1 of a timeframe) are
//! partitioned into k clusters minimising within-cluster variance. The
//! centroids, sorted ascending, are the representative support/resistance
//! bands.
//!
//! Determinism: observations are sorted before clustering and all randomness
//! comes from one `StdRng` seeded with `seed`, so identical input (in any
//! order) and seed give bit-identical centroids.

use crate::domain::PriceBar;
use crate::error::AnalysisError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_CLUSTER_COUNT: usize = 5;
pub const DEFAULT_SEED: u64 = 0;

/// Clustering parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelExtractor {
    /// Number of bands to produce.
    pub k: usize,
    /// Seed of the k-means++ initialisation.
    pub seed: u64,
    /// Independent initialisations; the lowest-inertia result wins.
    pub n_init: usize,
    pub max_iter: usize,
    /// Convergence tolerance relative to the observation variance.
    pub tolerance: f64,
}

impl Default for LevelExtractor {
    fn default() -> Self {
        Self {
            k: DEFAULT_CLUSTER_COUNT,
            seed: DEFAULT_SEED,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
        }
    }
}

struct Clustering {
    centroids: Vec<f64>,
    inertia: f64,
}

impl LevelExtractor {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            seed,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        if self.k == 0 {
            return Err(AnalysisError::invalid("k", "cluster count must be >= 1"));
        }
        if self.n_init == 0 {
            return Err(AnalysisError::invalid("n_init", "must be >= 1"));
        }
        if self.max_iter == 0 {
            return Err(AnalysisError::invalid("max_iter", "must be >= 1"));
        }
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(AnalysisError::invalid("tolerance", "must be >= 0"));
        }
        Ok(())
    }

    /// Cluster `observations` into `k` bands.
    ///
    /// Non-finite observations are ignored. Fewer than `k` distinct finite
    /// observations is `InsufficientData`; k is never reduced silently.
    pub fn extract(&self, observations: &[f64]) -> Result<Vec<f64>, AnalysisError> {
        self.validate()?;

        let mut points: Vec<f64> = observations.iter().copied().filter(|v| v.is_finite()).collect();
        points.sort_by(|a, b| a.total_cmp(b));

        let distinct = count_distinct_sorted(&points);
        if distinct < self.k {
            return Err(AnalysisError::InsufficientData {
                what: "level clustering (distinct observations)",
                required: self.k,
                available: distinct,
            });
        }

        let variance = {
            let m = points.iter().sum::<f64>() / points.len() as f64;
            points.iter().map(|p| (p - m) * (p - m)).sum::<f64>() / points.len() as f64
        };
        let tol = self.tolerance * variance;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<Clustering> = None;
        for _ in 0..self.n_init {
            let init = kmeans_plus_plus(&points, self.k, &mut rng);
            let run = lloyd(&points, init, self.max_iter, tol);
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }

        // n_init >= 1 was validated, so a clustering exists.
        let mut centroids = best.map(|b| b.centroids).unwrap_or_default();
        centroids.sort_by(|a, b| a.total_cmp(b));
        centroids.dedup();
        debug!(
            observations = points.len(),
            distinct,
            k = self.k,
            bands = centroids.len(),
            "clustered levels"
        );
        Ok(centroids)
    }
}

/// Outermost bands of a bar range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeBands {
    /// Lowest centroid of the clustered lows.
    pub support: f64,
    /// Highest centroid of the clustered highs.
    pub resistance: f64,
}

impl LevelExtractor {
    /// Cluster highs and lows separately and keep the extreme centroid of
    /// each side.
    pub fn range_bands(&self, bars: &[PriceBar]) -> Result<RangeBands, AnalysisError> {
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let resistance = self.extract(&highs)?.last().copied();
        let support = self.extract(&lows)?.first().copied();
        match (support, resistance) {
            (Some(support), Some(resistance)) => Ok(RangeBands { support, resistance }),
            _ => Err(AnalysisError::InsufficientData {
                what: "range bands",
                required: self.k,
                available: 0,
            }),
        }
    }
}

/// Convenience wrapper with default restarts and iterations.
pub fn extract_levels(observations: &[f64], k: usize, seed: u64) -> Result<Vec<f64>, AnalysisError> {
    LevelExtractor::new(k, seed).extract(observations)
}

fn count_distinct_sorted(sorted: &[f64]) -> usize {
    let mut count = 0;
    let mut prev: Option<f64> = None;
    for &v in sorted {
        if prev != Some(v) {
            count += 1;
            prev = Some(v);
        }
    }
    count
}

/// k-means++ seeding: the first centre uniformly, each next one with
/// probability proportional to its squared distance from the nearest centre.
fn kmeans_plus_plus(points: &[f64], k: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    let mut dist2: Vec<f64> = points.iter().map(|p| (p - centroids[0]).powi(2)).collect();
    while centroids.len() < k {
        let total: f64 = dist2.iter().sum();
        let target = rng.gen::<f64>() * total;

        let mut chosen = None;
        let mut cumulative = 0.0;
        for (i, &d) in dist2.iter().enumerate() {
            if d <= 0.0 {
                continue;
            }
            cumulative += d;
            chosen = Some(i);
            if cumulative >= target {
                break;
            }
        }
        // Distinct count >= k guarantees some point is away from every centre.
        let Some(idx) = chosen else { break };
        let c = points[idx];
        centroids.push(c);
        for (d, p) in dist2.iter_mut().zip(points) {
            *d = d.min((p - c).powi(2));
        }
    }
    centroids
}

fn nearest(centroids: &[f64], p: f64) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (j, &c) in centroids.iter().enumerate() {
        let d = (p - c).abs();
        if d < best_d {
            best = j;
            best_d = d;
        }
    }
    best
}

fn lloyd(points: &[f64], mut centroids: Vec<f64>, max_iter: usize, tol: f64) -> Clustering {
    let k = centroids.len();
    let mut labels = vec![0usize; points.len()];

    for _ in 0..max_iter {
        for (label, &p) in labels.iter_mut().zip(points) {
            *label = nearest(&centroids, p);
        }

        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for (&label, &p) in labels.iter().zip(points) {
            sums[label] += p;
            counts[label] += 1;
        }

        let mut updated: Vec<f64> = (0..k)
            .map(|j| {
                if counts[j] > 0 {
                    sums[j] / counts[j] as f64
                } else {
                    centroids[j]
                }
            })
            .collect();

        // Empty cluster: move it onto the point farthest from its centre.
        for j in 0..k {
            if counts[j] > 0 {
                continue;
            }
            let far = points
                .iter()
                .zip(&labels)
                .enumerate()
                .max_by(|(_, (pa, la)), (_, (pb, lb))| {
                    let da = (*pa - updated[**la]).abs();
                    let db = (*pb - updated[**lb]).abs();
                    da.total_cmp(&db)
                })
                .map(|(i, _)| i);
            if let Some(i) = far {
                updated[j] = points[i];
                labels[i] = j;
            }
        }

        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        centroids = updated;
        if shift <= tol {
            break;
        }
    }

    let inertia = points
        .iter()
        .map(|&p| {
            let c = centroids[nearest(&centroids, p)];
            (p - c) * (p - c)
        })
        .sum();

    Clustering { centroids, inertia }
}

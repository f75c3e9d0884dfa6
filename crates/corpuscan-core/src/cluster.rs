//! Seeded k-means clustering over RGB points.
//!
//! Used in two places: a 3-cluster partition of all pixels of one image
//! (dominant colors) and a 5-cluster partition of per-record dominant colors
//! (corpus palette). The RNG is seeded so a fixed seed gives reproducible
//! centroids; centroid *order* is unspecified and callers must not rely on it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors that can occur during clustering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// No points to cluster.
    EmptyInput,
    /// `k` must be at least 1.
    ZeroClusters,
}

impl fmt::Display for ClusterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "no points to cluster"),
            Self::ZeroClusters => write!(f, "cluster count must be at least 1"),
        }
    }
}

impl std::error::Error for ClusterError {}

// ── Configuration ──────────────────────────────────────────────────────────

/// Configuration for [`kmeans`].
#[derive(Debug, Clone, Copy)]
pub struct KMeansConfig {
    /// Number of centroids.
    pub k: usize,
    /// Maximum Lloyd iterations before giving up on convergence.
    pub max_iters: usize,
    /// RNG seed for k-means++ initialization.
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 3,
            max_iters: 100,
            seed: 0,
        }
    }
}

// ── Algorithm ──────────────────────────────────────────────────────────────

/// Cluster `points` into `config.k` centroids (k-means++ init, Lloyd updates).
///
/// Fewer distinct points than `k` yields duplicated centroids rather than an
/// error. Iteration stops when assignments stabilize or `max_iters` is hit.
pub fn kmeans(points: &[[f64; 3]], config: &KMeansConfig) -> Result<Vec<[f64; 3]>, ClusterError> {
    if points.is_empty() {
        return Err(ClusterError::EmptyInput);
    }
    if config.k == 0 {
        return Err(ClusterError::ZeroClusters);
    }

    let k = config.k;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut centroids = init_plus_plus(points, k, &mut rng);
    let mut assignment = vec![usize::MAX; points.len()];

    for _ in 0..config.max_iters {
        // Assignment step.
        let mut changed = false;
        for (i, p) in points.iter().enumerate() {
            let nearest = nearest_centroid(p, &centroids);
            if assignment[i] != nearest {
                assignment[i] = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        // Update step. An emptied cluster keeps its previous centroid.
        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (p, &c) in points.iter().zip(&assignment) {
            sums[c][0] += p[0];
            sums[c][1] += p[1];
            sums[c][2] += p[2];
            counts[c] += 1;
        }
        for c in 0..k {
            if counts[c] > 0 {
                let n = counts[c] as f64;
                centroids[c] = [sums[c][0] / n, sums[c][1] / n, sums[c][2] / n];
            }
        }
    }

    Ok(centroids)
}

/// k-means++ seeding: later centroids are drawn with probability
/// proportional to squared distance from the nearest chosen centroid.
fn init_plus_plus(points: &[[f64; 3]], k: usize, rng: &mut StdRng) -> Vec<[f64; 3]> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    let mut d2: Vec<f64> = points.iter().map(|p| dist2(p, &centroids[0])).collect();
    while centroids.len() < k {
        let total: f64 = d2.iter().sum();
        let next = if total <= f64::EPSILON {
            // All points coincide with a chosen centroid; duplicate one.
            points[rng.gen_range(0..points.len())]
        } else {
            let mut target = rng.gen::<f64>() * total;
            let mut pick = points.len() - 1;
            for (i, &d) in d2.iter().enumerate() {
                if target < d {
                    pick = i;
                    break;
                }
                target -= d;
            }
            points[pick]
        };
        for (i, p) in points.iter().enumerate() {
            d2[i] = d2[i].min(dist2(p, &next));
        }
        centroids.push(next);
    }
    centroids
}

fn nearest_centroid(p: &[f64; 3], centroids: &[[f64; 3]]) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let d = dist2(p, centroid);
        if d < best_d {
            best_d = d;
            best = c;
        }
    }
    best
}

fn dist2(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Three tight blobs around well-separated RGB corners.
    fn make_blobs() -> Vec<[f64; 3]> {
        let mut rng = StdRng::seed_from_u64(42);
        let anchors = [[10.0, 10.0, 10.0], [240.0, 20.0, 20.0], [30.0, 30.0, 230.0]];
        let mut points = Vec::new();
        for anchor in &anchors {
            for _ in 0..50 {
                points.push([
                    anchor[0] + rng.gen::<f64>() * 4.0 - 2.0,
                    anchor[1] + rng.gen::<f64>() * 4.0 - 2.0,
                    anchor[2] + rng.gen::<f64>() * 4.0 - 2.0,
                ]);
            }
        }
        points
    }

    #[test]
    fn test_recovers_separated_blobs() {
        let points = make_blobs();
        let config = KMeansConfig {
            k: 3,
            ..Default::default()
        };
        let centroids = kmeans(&points, &config).unwrap();
        assert_eq!(centroids.len(), 3);

        // Every anchor has a centroid within the blob spread; order-free check.
        let anchors = [[10.0, 10.0, 10.0], [240.0, 20.0, 20.0], [30.0, 30.0, 230.0]];
        for anchor in &anchors {
            let nearest = centroids
                .iter()
                .map(|c| dist2(anchor, c).sqrt())
                .fold(f64::INFINITY, f64::min);
            assert!(nearest < 5.0, "no centroid near {:?}: {}", anchor, nearest);
        }
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let points = make_blobs();
        let config = KMeansConfig {
            k: 3,
            seed: 7,
            ..Default::default()
        };
        let a = kmeans(&points, &config).unwrap();
        let b = kmeans(&points, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fewer_distinct_points_than_k() {
        let points = vec![[5.0, 5.0, 5.0]; 10];
        let config = KMeansConfig {
            k: 5,
            ..Default::default()
        };
        let centroids = kmeans(&points, &config).unwrap();
        assert_eq!(centroids.len(), 5);
        for c in &centroids {
            assert_eq!(*c, [5.0, 5.0, 5.0]);
        }
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let config = KMeansConfig::default();
        assert_eq!(kmeans(&[], &config), Err(ClusterError::EmptyInput));
    }

    #[test]
    fn test_zero_clusters_is_an_error() {
        let config = KMeansConfig {
            k: 0,
            ..Default::default()
        };
        assert_eq!(
            kmeans(&[[0.0; 3]], &config),
            Err(ClusterError::ZeroClusters)
        );
    }
}

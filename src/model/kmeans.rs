//! K-means baseline clustering (diagnostic only)

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::pipeline::{FeatureMatrix, LabelSet, PipelineError};

/// Default iteration cap for Lloyd's algorithm
pub const DEFAULT_MAX_ITER: usize = 100;

/// Settings for one k-means run
#[derive(Debug, Clone, Copy, Serialize)]
pub struct KMeansConfig {
    pub k: usize,
    pub max_iter: usize,
    pub seed: u64,
}

impl KMeansConfig {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            max_iter: DEFAULT_MAX_ITER,
            seed,
        }
    }
}

/// Outcome of a k-means run
#[derive(Debug, Clone, Serialize)]
pub struct KMeansResult {
    /// Cluster index per row
    pub assignments: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    pub iterations: usize,
    /// Within-cluster sum of squared distances
    pub inertia: f64,
    /// False when the iteration cap was hit before assignments settled
    pub converged: bool,
}

impl KMeansResult {
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &c in &self.assignments {
            sizes[c] += 1;
        }
        sizes
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(centroids: &[Vec<f64>], row: &[f64]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(c, row)))
        .fold((0, f64::INFINITY), |best, cand| if cand.1 < best.1 { cand } else { best })
}

/// k-means++ seeding: first centroid uniform, the rest sampled with
/// probability proportional to squared distance from the nearest chosen one.
fn init_centroids(x: &FeatureMatrix, k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = x.n_rows();
    let mut centroids = vec![x.row(rng.gen_range(0..n)).to_vec()];
    let mut distances: Vec<f64> = x.rows().map(|r| squared_distance(&centroids[0], r)).collect();

    while centroids.len() < k {
        let total: f64 = distances.iter().sum();
        let next = if total <= 0.0 {
            // All remaining rows coincide with a centroid
            rng.gen_range(0..n)
        } else {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = n - 1;
            for (i, &d) in distances.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        };

        let centroid = x.row(next).to_vec();
        for (d, row) in distances.iter_mut().zip(x.rows()) {
            *d = d.min(squared_distance(&centroid, row));
        }
        centroids.push(centroid);
    }

    centroids
}

/// Partition rows into `k` clusters with Lloyd's algorithm.
///
/// Stops when no assignment changes or after `max_iter` iterations. A cluster
/// that loses all rows keeps its previous centroid.
pub fn fit_kmeans(x: &FeatureMatrix, config: KMeansConfig) -> Result<KMeansResult, PipelineError> {
    let n = x.n_rows();
    let k = config.k;
    if k == 0 || k > n {
        return Err(PipelineError::InvalidClusterCount { k, rows: n });
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut centroids = init_centroids(x, k, &mut rng);
    let mut assignments = vec![usize::MAX; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;

        let mut changed = false;
        for (i, row) in x.rows().enumerate() {
            let (cluster, _) = nearest(&centroids, row);
            if assignments[i] != cluster {
                assignments[i] = cluster;
                changed = true;
            }
        }

        if !changed {
            converged = true;
            break;
        }

        let mut sums = vec![vec![0.0; x.n_cols()]; k];
        let mut counts = vec![0usize; k];
        for (row, &c) in x.rows().zip(&assignments) {
            counts[c] += 1;
            for (s, v) in sums[c].iter_mut().zip(row) {
                *s += v;
            }
        }
        for c in 0..k {
            if counts[c] > 0 {
                centroids[c] = sums[c].iter().map(|s| s / counts[c] as f64).collect();
            }
        }
    }

    let inertia = x
        .rows()
        .zip(&assignments)
        .map(|(row, &c)| squared_distance(&centroids[c], row))
        .sum();

    log::debug!(
        "k-means (k={}): {} iterations, inertia {:.3}, converged={}",
        k,
        iterations,
        inertia,
        converged
    );

    Ok(KMeansResult {
        assignments,
        centroids,
        iterations,
        inertia,
        converged,
    })
}

/// Counts of rows per (cluster, label category)
#[derive(Debug, Clone, Serialize)]
pub struct ClusterCrossTab {
    pub categories: Vec<String>,
    /// `counts[cluster][category]`
    pub counts: Vec<Vec<usize>>,
}

impl ClusterCrossTab {
    pub fn new(assignments: &[usize], k: usize, labels: &[usize], label_set: &LabelSet) -> Self {
        let mut counts = vec![vec![0; label_set.len()]; k];
        for (&c, &y) in assignments.iter().zip(labels) {
            counts[c][y] += 1;
        }
        Self {
            categories: label_set.categories().to_vec(),
            counts,
        }
    }

    pub fn n_clusters(&self) -> usize {
        self.counts.len()
    }

    pub fn cluster_total(&self, cluster: usize) -> usize {
        self.counts[cluster].iter().sum()
    }

    pub fn category_total(&self, category: usize) -> usize {
        self.counts.iter().map(|row| row[category]).sum()
    }

    /// Share of rows whose cluster's majority label matches their own label.
    pub fn purity(&self) -> f64 {
        let total: usize = self.counts.iter().flatten().sum();
        if total == 0 {
            return 0.0;
        }
        let majority: usize = self
            .counts
            .iter()
            .map(|row| row.iter().copied().max().unwrap_or(0))
            .sum();
        majority as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> FeatureMatrix {
        let mut rows = Vec::new();
        for i in 0..10 {
            rows.push(vec![0.0 + i as f64 * 0.01, 0.0]);
            rows.push(vec![10.0 + i as f64 * 0.01, 10.0]);
        }
        FeatureMatrix::from_rows(vec!["x".into(), "y".into()], &rows)
    }

    #[test]
    fn test_separates_two_blobs() {
        let x = blobs();
        let result = fit_kmeans(&x, KMeansConfig::new(2, 7)).unwrap();

        assert!(result.converged);
        assert_eq!(result.cluster_sizes(), vec![10, 10]);
        for pair in result.assignments.chunks(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_same_seed_same_assignments() {
        let x = blobs();
        let a = fit_kmeans(&x, KMeansConfig::new(3, 11)).unwrap();
        let b = fit_kmeans(&x, KMeansConfig::new(3, 11)).unwrap();
        assert_eq!(a.assignments, b.assignments);
    }

    #[test]
    fn test_rejects_invalid_k() {
        let x = blobs();
        assert_eq!(
            fit_kmeans(&x, KMeansConfig::new(0, 1)).unwrap_err(),
            PipelineError::InvalidClusterCount { k: 0, rows: 20 }
        );
        assert!(fit_kmeans(&x, KMeansConfig::new(21, 1)).is_err());
    }

    #[test]
    fn test_cross_tab_purity() {
        let set = LabelSet::from_values(&["A".to_string(), "B".to_string()]);
        let tab = ClusterCrossTab::new(&[0, 0, 1, 1], 2, &[0, 0, 1, 0], &set);
        assert_eq!(tab.counts, vec![vec![2, 0], vec![1, 1]]);
        assert_eq!(tab.category_total(0), 3);
        assert!((tab.purity() - 0.75).abs() < 1e-12);
    }
}

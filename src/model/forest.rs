//! Random forest classifier: bootstrap-resampled Gini trees with a random
//! predictor subset per split, combined by majority vote.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

use super::tree::{
    fit_classification_tree, majority_class, BinnedMatrix, ClassificationTreeParams, DecisionTree,
    MAX_BINS,
};
use super::Classifier;
use crate::pipeline::FeatureMatrix;

/// Default number of trees per forest
pub const DEFAULT_FOREST_TREES: usize = 100;

/// Tunable settings for a random forest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForestParams {
    pub n_trees: usize,
    /// Predictors sampled at each split
    pub mtry: usize,
}

impl std::fmt::Display for ForestParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mtry={}, trees={}", self.mtry, self.n_trees)
    }
}

/// `mtry` candidates: up to three evenly spaced values from 2 to `p`,
/// floored and de-duplicated, clamped to `[1, p]`.
pub fn mtry_grid(n_predictors: usize) -> Vec<usize> {
    let p = n_predictors.max(1) as f64;
    let mut grid: Vec<usize> = Vec::with_capacity(3);
    for i in 0..3 {
        let value = (2.0 + i as f64 * (p - 2.0) / 2.0).floor() as usize;
        let value = value.clamp(1, n_predictors.max(1));
        if !grid.contains(&value) {
            grid.push(value);
        }
    }
    grid
}

/// Seed for tree `index`, independent of the order trees are built in.
fn tree_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Fitted random forest
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree<usize>>,
    n_classes: usize,
    params: ForestParams,
}

impl RandomForest {
    /// Fit a forest. Trees are grown in parallel; each draws its bootstrap
    /// sample and split predictors from its own seeded generator.
    pub fn fit(
        x: &FeatureMatrix,
        labels: &[usize],
        n_classes: usize,
        params: ForestParams,
        seed: u64,
    ) -> Self {
        let binned = BinnedMatrix::new(x, MAX_BINS);
        let n = x.n_rows();
        let tree_params = ClassificationTreeParams {
            mtry: Some(params.mtry),
            ..Default::default()
        };

        let trees: Vec<DecisionTree<usize>> = (0..params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(tree_seed(seed, t));
                let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                fit_classification_tree(&binned, labels, n_classes, rows, tree_params, &mut rng)
            })
            .collect();

        log::debug!(
            "Random forest ({}): {} trees, mean depth {:.1}",
            params,
            trees.len(),
            trees.iter().map(|t| t.depth()).sum::<usize>() as f64 / trees.len().max(1) as f64
        );

        Self {
            trees,
            n_classes,
            params,
        }
    }

    pub fn params(&self) -> ForestParams {
        self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Per-class vote counts for one row
    pub fn votes(&self, row: &[f64]) -> Vec<usize> {
        let mut votes = vec![0; self.n_classes];
        for tree in &self.trees {
            votes[tree.predict(row)] += 1;
        }
        votes
    }
}

impl Classifier for RandomForest {
    fn predict_row(&self, row: &[f64]) -> usize {
        majority_class(&self.votes(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mtry_grid() {
        assert_eq!(mtry_grid(30), vec![2, 16, 30]);
        assert_eq!(mtry_grid(3), vec![2, 3]);
        assert_eq!(mtry_grid(2), vec![2]);
        assert_eq!(mtry_grid(1), vec![1]);
    }

    #[test]
    fn test_tree_seeds_differ() {
        assert_ne!(tree_seed(300, 0), tree_seed(300, 1));
        assert_eq!(tree_seed(300, 7), tree_seed(300, 7));
    }
}

//! Multinomial gradient boosting with shallow regression trees
//!
//! Each round fits one regression tree per class to the softmax residuals
//! `y_k - p_k` on a random half of the rows, with leaf outputs given by a
//! single Newton step on the multinomial deviance.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;

use super::tree::{fit_regression_tree, BinnedMatrix, DecisionTree, MAX_BINS};
use super::Classifier;
use crate::pipeline::FeatureMatrix;

/// Tunable settings for a boosted ensemble
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoostingParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub shrinkage: f64,
    /// Minimum training rows per leaf
    pub min_leaf: usize,
    /// Fraction of rows sampled (without replacement) for each round
    pub bag_fraction: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 1,
            shrinkage: 0.1,
            min_leaf: 10,
            bag_fraction: 0.5,
        }
    }
}

impl std::fmt::Display for BoostingParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "depth={}, trees={}, shrinkage={}",
            self.max_depth, self.n_trees, self.shrinkage
        )
    }
}

/// Tree counts evaluated for every depth in the tuning grid
pub const TREE_COUNT_GRID: [usize; 3] = [50, 100, 150];

/// Depths evaluated in the tuning grid
pub const DEPTH_GRID: [usize; 3] = [1, 2, 3];

/// Fitted gradient boosting model
#[derive(Debug, Clone)]
pub struct GradientBoosting {
    /// Initial per-class scores (log class priors)
    init: Vec<f64>,
    /// One tree per class per round
    rounds: Vec<Vec<DecisionTree<f64>>>,
    params: BoostingParams,
}

/// Numerically stable softmax, written into `out`.
fn softmax(scores: &[f64], out: &mut [f64]) {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for (o, s) in out.iter_mut().zip(scores) {
        *o = (s - max).exp();
        total += *o;
    }
    for o in out.iter_mut() {
        *o /= total;
    }
}

impl GradientBoosting {
    pub fn fit(
        x: &FeatureMatrix,
        labels: &[usize],
        n_classes: usize,
        params: BoostingParams,
        seed: u64,
    ) -> Self {
        let n = x.n_rows();
        let k = n_classes;
        let binned = BinnedMatrix::new(x, MAX_BINS);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut counts = vec![0usize; k];
        for &y in labels {
            counts[y] += 1;
        }
        // Smoothed so an absent class does not produce -inf
        let init: Vec<f64> = counts
            .iter()
            .map(|&c| ((c as f64 + 0.5) / (n as f64 + 0.5 * k as f64)).ln())
            .collect();

        let mut scores: Vec<f64> = (0..n).flat_map(|_| init.iter().copied()).collect();
        let mut probs = vec![0.0; n * k];
        let bag_size = ((n as f64 * params.bag_fraction).floor() as usize).clamp(1.min(n), n);
        let newton_scale = if k > 1 { (k - 1) as f64 / k as f64 } else { 0.0 };

        let mut rounds = Vec::with_capacity(params.n_trees);

        for round in 0..params.n_trees {
            for i in 0..n {
                softmax(&scores[i * k..(i + 1) * k], &mut probs[i * k..(i + 1) * k]);
            }

            let mut bag = sample(&mut rng, n, bag_size).into_vec();
            bag.sort_unstable();

            let trees: Vec<DecisionTree<f64>> = (0..k)
                .into_par_iter()
                .map(|class| {
                    let residuals: Vec<f64> = (0..n)
                        .map(|i| {
                            let y = if labels[i] == class { 1.0 } else { 0.0 };
                            y - probs[i * k + class]
                        })
                        .collect();

                    let leaf_value = |rows: &[usize]| {
                        let (num, den) = rows.iter().fold((0.0, 0.0), |(num, den), &r| {
                            let res = residuals[r];
                            (num + res, den + res.abs() * (1.0 - res.abs()))
                        });
                        if den < 1e-12 {
                            0.0
                        } else {
                            newton_scale * num / den
                        }
                    };

                    fit_regression_tree(
                        &binned,
                        &residuals,
                        bag.clone(),
                        params.max_depth,
                        params.min_leaf,
                        leaf_value,
                    )
                })
                .collect();

            for i in 0..n {
                let row = x.row(i);
                for (class, tree) in trees.iter().enumerate() {
                    scores[i * k + class] += params.shrinkage * tree.predict(row);
                }
            }

            rounds.push(trees);

            if (round + 1) % 50 == 0 {
                log::debug!("Boosting round {}/{}", round + 1, params.n_trees);
            }
        }

        Self {
            init,
            rounds,
            params,
        }
    }

    /// Raw per-class scores using only the first `n_rounds` rounds.
    fn scores_with_rounds(&self, row: &[f64], n_rounds: usize) -> Vec<f64> {
        let mut scores = self.init.clone();
        for trees in self.rounds.iter().take(n_rounds) {
            for (class, tree) in trees.iter().enumerate() {
                scores[class] += self.params.shrinkage * tree.predict(row);
            }
        }
        scores
    }

    /// Class prediction using only the first `n_rounds` rounds. Lets one fit
    /// of the largest ensemble score every smaller tree count in the grid.
    pub fn predict_with_rounds(&self, row: &[f64], n_rounds: usize) -> usize {
        argmax(&self.scores_with_rounds(row, n_rounds))
    }
}

/// Index of the largest value; ties go to the lowest index.
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, best_v), (i, &v)| {
            if v > best_v {
                (i, v)
            } else {
                (best, best_v)
            }
        })
        .0
}

impl Classifier for GradientBoosting {
    fn predict_row(&self, row: &[f64]) -> usize {
        self.predict_with_rounds(row, self.rounds.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let mut out = [0.0; 3];
        softmax(&[1000.0, 1000.0, 999.0], &mut out);
        assert!((out.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((out[0] - out[1]).abs() < 1e-12);
        assert!(out[2] < out[0]);
    }

    #[test]
    fn test_argmax_ties_low() {
        assert_eq!(argmax(&[0.1, 0.5, 0.5]), 1);
    }

    #[test]
    fn test_learns_threshold_at_every_round_count() {
        let rows: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64, (i % 7) as f64]).collect();
        let x = FeatureMatrix::from_rows(vec!["a".into(), "b".into()], &rows);
        let y: Vec<usize> = (0..60).map(|i| if i < 20 { 0 } else if i < 40 { 1 } else { 2 }).collect();

        let params = BoostingParams {
            n_trees: 30,
            max_depth: 2,
            min_leaf: 3,
            ..Default::default()
        };
        let model = GradientBoosting::fit(&x, &y, 3, params, 42);

        assert_eq!(model.predict_row(&[5.0, 0.0]), 0);
        assert_eq!(model.predict_row(&[30.0, 0.0]), 1);
        assert_eq!(model.predict_row(&[55.0, 0.0]), 2);
        assert_eq!(model.predict_with_rounds(&[30.0, 0.0], 30), model.predict_row(&[30.0, 0.0]));

        // Zero rounds falls back to the class priors, which are equal here
        assert_eq!(model.scores_with_rounds(&[55.0, 0.0], 0).len(), 3);
        assert_eq!(model.predict_with_rounds(&[55.0, 0.0], 0), 0);
        assert_eq!(model.predict_with_rounds(&[55.0, 0.0], 20), 2);
    }
}

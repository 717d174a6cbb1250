//! Cross-validated model selection
//!
//! Every candidate in a method's tuning grid is fit on k-1 stratified folds and
//! scored by accuracy on the held-out fold. The candidate with the best mean
//! accuracy is refit on the full training set.

use anyhow::Result;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use super::boosting::{BoostingParams, GradientBoosting, DEPTH_GRID, TREE_COUNT_GRID};
use super::forest::{mtry_grid, ForestParams, RandomForest, DEFAULT_FOREST_TREES};
use super::{Classifier, FittedModel, Hyperparameters, ModelMethod};
use crate::pipeline::{accuracy, FeatureMatrix, LabelSet, LabeledData, PipelineError};
use crate::utils::{create_progress_bar, finish_with_success};

/// Default number of cross-validation folds
pub const DEFAULT_FOLDS: usize = 3;

/// Settings for one cross-validated training run
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrainConfig {
    pub method: ModelMethod,
    pub folds: usize,
    pub seed: u64,
    pub forest_trees: usize,
}

impl TrainConfig {
    pub fn new(method: ModelMethod, seed: u64) -> Self {
        Self {
            method,
            folds: DEFAULT_FOLDS,
            seed,
            forest_trees: DEFAULT_FOREST_TREES,
        }
    }

    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_forest_trees(mut self, trees: usize) -> Self {
        self.forest_trees = trees;
        self
    }
}

/// Held-out accuracy of one tuning candidate
#[derive(Debug, Clone, Serialize)]
pub struct CandidateScore {
    pub params: Hyperparameters,
    pub fold_accuracy: Vec<f64>,
    pub mean_accuracy: f64,
}

/// Cross-validation record kept with the fitted model
#[derive(Debug, Clone, Serialize)]
pub struct CrossValidation {
    pub folds: usize,
    pub fold_sizes: Vec<usize>,
    pub candidates: Vec<CandidateScore>,
    /// Index into `candidates` of the selected hyperparameters
    pub best: usize,
}

impl CrossValidation {
    pub fn best_candidate(&self) -> &CandidateScore {
        &self.candidates[self.best]
    }
}

/// Fitted model plus everything needed to apply it to new tables.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub method: ModelMethod,
    pub params: Hyperparameters,
    pub model: FittedModel,
    pub cross_validation: CrossValidation,
    pub predictors: Vec<String>,
    pub label_set: LabelSet,
}

impl TrainedModel {
    /// Predict class indices for the predictor columns of `df`.
    pub fn predict_indices(&self, df: &DataFrame) -> Result<Vec<usize>> {
        let x = FeatureMatrix::from_frame(df, &self.predictors)?;
        Ok(self.model.predict(&x))
    }

    /// Predict category names for the predictor columns of `df`.
    pub fn predict_labels(&self, df: &DataFrame) -> Result<Vec<String>> {
        Ok(self
            .predict_indices(df)?
            .into_iter()
            .map(|i| self.label_set.name(i).to_string())
            .collect())
    }
}

/// Deal rows into `k` stratified folds.
///
/// Within each category (sorted order) rows are shuffled and dealt round-robin;
/// the dealing position carries across categories so fold sizes differ by at
/// most one.
pub fn stratified_folds(
    labels: &[usize],
    n_classes: usize,
    k: usize,
    seed: u64,
) -> Result<Vec<Vec<usize>>, PipelineError> {
    if k < 2 {
        return Err(PipelineError::InvalidFoldCount(k));
    }

    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (row, &y) in labels.iter().enumerate() {
        by_class[y].push(row);
    }

    let present: Vec<&Vec<usize>> = by_class.iter().filter(|rows| !rows.is_empty()).collect();
    let categories = present.len();
    let smallest_category = present.iter().map(|rows| rows.len()).min().unwrap_or(0);
    let fold_rows = labels.len() / k;

    if smallest_category < k || fold_rows < categories {
        return Err(PipelineError::InsufficientFoldSize {
            folds: k,
            fold_rows,
            categories,
            smallest_category,
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];
    let mut position = 0;
    for mut rows in by_class {
        rows.shuffle(&mut rng);
        for row in rows {
            folds[position % k].push(row);
            position += 1;
        }
    }

    for fold in &mut folds {
        fold.sort_unstable();
    }

    Ok(folds)
}

/// Tuning grid for a method given the predictor count
pub fn candidate_grid(config: &TrainConfig, n_predictors: usize) -> Vec<Hyperparameters> {
    match config.method {
        ModelMethod::GradientBoosting => DEPTH_GRID
            .iter()
            .flat_map(|&max_depth| {
                TREE_COUNT_GRID.iter().map(move |&n_trees| {
                    Hyperparameters::GradientBoosting(BoostingParams {
                        n_trees,
                        max_depth,
                        ..Default::default()
                    })
                })
            })
            .collect(),
        ModelMethod::RandomForest => mtry_grid(n_predictors)
            .into_iter()
            .map(|mtry| {
                Hyperparameters::RandomForest(ForestParams {
                    n_trees: config.forest_trees,
                    mtry,
                })
            })
            .collect(),
    }
}

fn fit(params: Hyperparameters, data: &LabeledData, seed: u64) -> FittedModel {
    match params {
        Hyperparameters::GradientBoosting(p) => FittedModel::GradientBoosting(
            GradientBoosting::fit(&data.features, &data.labels, data.n_classes(), p, seed),
        ),
        Hyperparameters::RandomForest(p) => FittedModel::RandomForest(RandomForest::fit(
            &data.features,
            &data.labels,
            data.n_classes(),
            p,
            seed,
        )),
    }
}

/// Held-out accuracy of every candidate on one fold.
///
/// Boosting candidates that share a depth are scored from one fit of the
/// largest tree count by truncating the ensemble at each smaller count.
fn score_fold(
    grid: &[Hyperparameters],
    train: &LabeledData,
    holdout: &LabeledData,
    seed: u64,
) -> Vec<f64> {
    let mut scores = vec![f64::NAN; grid.len()];

    for (i, params) in grid.iter().enumerate() {
        if !scores[i].is_nan() {
            continue;
        }

        match params {
            Hyperparameters::GradientBoosting(p) => {
                let siblings: Vec<usize> = grid
                    .iter()
                    .enumerate()
                    .filter_map(|(j, other)| match other {
                        Hyperparameters::GradientBoosting(o)
                            if o.max_depth == p.max_depth && scores[j].is_nan() =>
                        {
                            Some(j)
                        }
                        _ => None,
                    })
                    .collect();
                let max_trees = siblings
                    .iter()
                    .filter_map(|&j| match grid[j] {
                        Hyperparameters::GradientBoosting(o) => Some(o.n_trees),
                        _ => None,
                    })
                    .max()
                    .unwrap_or(p.n_trees);

                let largest = BoostingParams {
                    n_trees: max_trees,
                    ..*p
                };
                let model = GradientBoosting::fit(
                    &train.features,
                    &train.labels,
                    train.n_classes(),
                    largest,
                    seed,
                );

                for j in siblings {
                    if let Hyperparameters::GradientBoosting(o) = grid[j] {
                        let predicted: Vec<usize> = holdout
                            .features
                            .rows()
                            .map(|row| model.predict_with_rounds(row, o.n_trees))
                            .collect();
                        scores[j] = accuracy(&holdout.labels, &predicted);
                    }
                }
            }
            Hyperparameters::RandomForest(_) => {
                let model = fit(*params, train, seed);
                scores[i] = accuracy(&holdout.labels, &model.predict(&holdout.features));
            }
        }
    }

    scores
}

/// Cross-validate the method's grid on `data` and refit the best candidate.
pub fn train_on(data: &LabeledData, predictors: &[String], config: &TrainConfig) -> Result<TrainedModel> {
    let folds = stratified_folds(&data.labels, data.n_classes(), config.folds, config.seed)?;
    let grid = candidate_grid(config, data.features.n_cols());

    let pb = create_progress_bar(
        (folds.len() + 1) as u64,
        &format!("Cross-validating {}", config.method.title()),
    );

    let mut fold_scores: Vec<Vec<f64>> = Vec::with_capacity(folds.len());
    for (f, holdout_rows) in folds.iter().enumerate() {
        let train_rows: Vec<usize> = folds
            .iter()
            .enumerate()
            .filter(|(g, _)| *g != f)
            .flat_map(|(_, rows)| rows.iter().copied())
            .collect();

        let train = data.select_rows(&train_rows);
        let holdout = data.select_rows(holdout_rows);
        let seed = config.seed.wrapping_add(f as u64 + 1);
        let scores = score_fold(&grid, &train, &holdout, seed);

        log::debug!(
            "{} fold {}/{}: {:?}",
            config.method,
            f + 1,
            folds.len(),
            scores
        );
        fold_scores.push(scores);
        pb.inc(1);
    }

    let candidates: Vec<CandidateScore> = grid
        .iter()
        .enumerate()
        .map(|(i, params)| {
            let fold_accuracy: Vec<f64> = fold_scores.iter().map(|s| s[i]).collect();
            let mean_accuracy = fold_accuracy.iter().sum::<f64>() / fold_accuracy.len() as f64;
            CandidateScore {
                params: *params,
                fold_accuracy,
                mean_accuracy,
            }
        })
        .collect();

    // First candidate wins ties
    let best = candidates
        .iter()
        .enumerate()
        .fold(0, |best, (i, c)| {
            if c.mean_accuracy > candidates[best].mean_accuracy {
                i
            } else {
                best
            }
        });

    let params = candidates[best].params;
    pb.set_message(format!("Refitting {} ({})", config.method.title(), params));
    let model = fit(params, data, config.seed);
    pb.inc(1);
    finish_with_success(
        &pb,
        &format!(
            "{} selected {} (CV accuracy {:.4})",
            config.method.title(),
            params,
            candidates[best].mean_accuracy
        ),
    );

    Ok(TrainedModel {
        method: config.method,
        params,
        model,
        cross_validation: CrossValidation {
            folds: folds.len(),
            fold_sizes: folds.iter().map(|f| f.len()).collect(),
            candidates,
            best,
        },
        predictors: predictors.to_vec(),
        label_set: data.label_set.clone(),
    })
}

/// Cross-validate and fit a model on the predictor columns of a training table.
pub fn train_model(
    df: &DataFrame,
    label: &str,
    predictors: &[String],
    config: &TrainConfig,
) -> Result<TrainedModel> {
    let data = LabeledData::from_frame(df, predictors, label)?;
    train_on(&data, predictors, config)
}

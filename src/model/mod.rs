//! Model module - tree ensembles, k-means baseline and cross-validated training

pub mod boosting;
pub mod forest;
pub mod kmeans;
pub mod train;
pub mod tree;

pub use boosting::*;
pub use forest::*;
pub use kmeans::*;
pub use train::*;

use serde::Serialize;

use crate::pipeline::FeatureMatrix;

/// A fitted model mapping a predictor row to a class index.
pub trait Classifier {
    fn predict_row(&self, row: &[f64]) -> usize;

    fn predict(&self, x: &FeatureMatrix) -> Vec<usize> {
        x.rows().map(|row| self.predict_row(row)).collect()
    }
}

/// Supervised learning method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelMethod {
    GradientBoosting,
    RandomForest,
}

impl ModelMethod {
    pub const ALL: [ModelMethod; 2] = [ModelMethod::GradientBoosting, ModelMethod::RandomForest];

    /// Human-readable name for reports
    pub fn title(&self) -> &'static str {
        match self {
            ModelMethod::GradientBoosting => "Gradient Boosting",
            ModelMethod::RandomForest => "Random Forest",
        }
    }
}

impl std::fmt::Display for ModelMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelMethod::GradientBoosting => write!(f, "gradient_boosting"),
            ModelMethod::RandomForest => write!(f, "random_forest"),
        }
    }
}

impl std::str::FromStr for ModelMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gradient_boosting" | "gbm" => Ok(ModelMethod::GradientBoosting),
            "random_forest" | "rf" => Ok(ModelMethod::RandomForest),
            _ => Err(format!(
                "Unknown method: '{}'. Use 'gradient_boosting' or 'random_forest'.",
                s
            )),
        }
    }
}

/// Hyperparameters of one tuning candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Hyperparameters {
    GradientBoosting(BoostingParams),
    RandomForest(ForestParams),
}

impl std::fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Hyperparameters::GradientBoosting(p) => write!(f, "{}", p),
            Hyperparameters::RandomForest(p) => write!(f, "{}", p),
        }
    }
}

/// Fitted ensemble of either kind
#[derive(Debug, Clone)]
pub enum FittedModel {
    GradientBoosting(GradientBoosting),
    RandomForest(RandomForest),
}

impl Classifier for FittedModel {
    fn predict_row(&self, row: &[f64]) -> usize {
        match self {
            FittedModel::GradientBoosting(m) => m.predict_row(row),
            FittedModel::RandomForest(m) => m.predict_row(row),
        }
    }
}

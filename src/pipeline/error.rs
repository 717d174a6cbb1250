//! Error types for the classification pipeline.
//!
//! Every variant is fatal to the run. Callers wrap these in `anyhow::Error`
//! so the binary halts with a descriptive message.

use thiserror::Error;

/// Failures raised by the pipeline stages.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    /// Filtering removed every non-label column.
    ///
    /// `stage` names the filtering step after which no predictor was left.
    #[error("No predictor columns remain after {stage} filtering")]
    EmptyPredictorSet { stage: &'static str },

    /// The correlation matrix needs at least two numeric columns.
    #[error("Correlation matrix requires at least 2 numeric columns, found {found}")]
    NonSquareCorrelation { found: usize },

    /// A cross-validation fold would be smaller than the number of categories.
    #[error(
        "Cannot build {folds} folds: fold size {fold_rows} is smaller than {categories} label categories \
         (smallest category has {smallest_category} rows)"
    )]
    InsufficientFoldSize {
        folds: usize,
        fold_rows: usize,
        categories: usize,
        smallest_category: usize,
    },

    /// Test rows carry labels the model never saw during training.
    #[error("Label categories {unseen:?} were not seen during training (known: {known:?})")]
    LabelMismatch {
        unseen: Vec<String>,
        known: Vec<String>,
    },

    /// A predictor the model was trained on is absent from the scored table.
    #[error("Predictor column '{0}' is missing from the table")]
    MissingPredictor(String),

    /// Label column is absent or contains nulls.
    #[error("Label column '{column}' {reason}")]
    MissingLabel { column: String, reason: String },

    /// Split fraction outside the open interval (0, 1).
    #[error("Split fraction must be in (0, 1), got {0}")]
    InvalidFraction(f64),

    /// Cluster count is zero or exceeds the number of rows.
    #[error("Cluster count {k} is invalid for {rows} rows")]
    InvalidClusterCount { k: usize, rows: usize },

    /// Fold count below two.
    #[error("Cross-validation needs at least 2 folds, got {0}")]
    InvalidFoldCount(usize),
}

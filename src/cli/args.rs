//! Command-line argument definitions using clap

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use crate::model::{DEFAULT_FOLDS, DEFAULT_FOREST_TREES};
use crate::pipeline::{DEFAULT_CORRELATION_CUTOFF, DEFAULT_EXCLUDED_COLUMNS};

/// Liftfit - Filter accelerometer predictors and compare ensemble classifiers
#[derive(Parser, Debug)]
#[command(name = "liftfit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input CSV file with a header row
    #[arg(short, long)]
    pub input: PathBuf,

    /// Label column (categorical outcome, never dropped)
    #[arg(short, long, default_value = "classe")]
    pub target: String,

    /// Identifier/metadata columns removed before any analysis (comma-separated).
    /// Defaults to the weight lifting dataset's bookkeeping columns.
    #[arg(long, value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// Correlation threshold - drop one predictor from pairs with absolute correlation above this value
    #[arg(long, default_value_t = DEFAULT_CORRELATION_CUTOFF, value_parser = validate_unit_closed)]
    pub correlation_threshold: f64,

    /// Fraction of rows per category assigned to the training split
    #[arg(long, default_value = "0.7", value_parser = validate_unit_open)]
    pub train_fraction: f64,

    /// Seed for the split, folds, k-means and ensembles
    #[arg(long, default_value = "300")]
    pub seed: u64,

    /// Number of cross-validation folds
    #[arg(long, default_value_t = DEFAULT_FOLDS, value_parser = validate_folds)]
    pub folds: usize,

    /// Number of k-means clusters for the baseline
    #[arg(long, default_value = "5")]
    pub clusters: usize,

    /// Trees per random forest
    #[arg(long, default_value_t = DEFAULT_FOREST_TREES)]
    pub forest_trees: usize,

    /// Optional unlabeled CSV to score with the most accurate model
    #[arg(long)]
    pub score: Option<PathBuf>,

    /// Optional path for a JSON analysis report
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Number of rows to use for schema inference.
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

/// Resolved settings for one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub label: String,
    pub excluded: Vec<String>,
    pub correlation_cutoff: f64,
    pub train_fraction: f64,
    pub seed: u64,
    pub folds: usize,
    pub clusters: usize,
    pub forest_trees: usize,
    pub score: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub infer_schema_length: usize,
}

impl Cli {
    pub fn into_config(self) -> PipelineConfig {
        PipelineConfig {
            input: self.input,
            label: self.target,
            excluded: self.exclude.unwrap_or_else(|| {
                DEFAULT_EXCLUDED_COLUMNS.iter().map(|s| s.to_string()).collect()
            }),
            correlation_cutoff: self.correlation_threshold,
            train_fraction: self.train_fraction,
            seed: self.seed,
            folds: self.folds,
            clusters: self.clusters,
            forest_trees: self.forest_trees,
            score: self.score,
            report: self.report,
            infer_schema_length: self.infer_schema_length,
        }
    }
}

fn parse_f64(s: &str) -> Result<f64, String> {
    s.parse()
        .map_err(|_| format!("'{}' is not a valid number", s))
}

/// Validator for values in [0, 1]
fn validate_unit_closed(s: &str) -> Result<f64, String> {
    let value = parse_f64(s)?;
    if !(0.0..=1.0).contains(&value) {
        Err(format!("value must be between 0.0 and 1.0, got {}", value))
    } else {
        Ok(value)
    }
}

/// Validator for values in (0, 1)
fn validate_unit_open(s: &str) -> Result<f64, String> {
    let value = parse_f64(s)?;
    if value <= 0.0 || value >= 1.0 {
        Err(format!(
            "value must be strictly between 0.0 and 1.0, got {}",
            value
        ))
    } else {
        Ok(value)
    }
}

/// Validator for the fold count
fn validate_folds(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid fold count", s))?;
    if value < 2 {
        Err(format!("at least 2 folds are required, got {}", value))
    } else {
        Ok(value)
    }
}

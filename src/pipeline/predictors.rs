//! Predictor filter: reduces a table to numeric, complete, weakly correlated
//! predictors plus the label column.

use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;

use super::correlation::{
    compute_correlation_matrix, extract_correlated_pairs, numeric_predictor_columns,
    select_features_to_drop, CorrelatedPair,
};
use super::error::PipelineError;
use super::missing::{analyze_missing_values, get_features_above_threshold};

/// Identifier and bookkeeping columns of the weight lifting dataset. They carry
/// row ids, subject names, timestamps and window markers rather than sensor
/// readings.
pub const DEFAULT_EXCLUDED_COLUMNS: [&str; 7] = [
    "X",
    "user_name",
    "raw_timestamp_part_1",
    "raw_timestamp_part_2",
    "cvtd_timestamp",
    "new_window",
    "num_window",
];

/// Default absolute correlation above which one of a pair is removed
pub const DEFAULT_CORRELATION_CUTOFF: f64 = 0.7;

/// Settings for the predictor filter
#[derive(Debug, Clone, Serialize)]
pub struct FilterConfig {
    pub label: String,
    pub excluded: Vec<String>,
    pub correlation_cutoff: f64,
}

impl FilterConfig {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            excluded: DEFAULT_EXCLUDED_COLUMNS.iter().map(|s| s.to_string()).collect(),
            correlation_cutoff: DEFAULT_CORRELATION_CUTOFF,
        }
    }

    pub fn with_excluded(mut self, excluded: Vec<String>) -> Self {
        self.excluded = excluded;
        self
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.correlation_cutoff = cutoff;
        self
    }
}

/// Result of running the predictor filter on a table.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Retained predictors plus the label column
    pub table: DataFrame,
    /// Retained predictor names, in table order
    pub predictors: Vec<String>,
    pub label: String,
    pub dropped_excluded: Vec<String>,
    pub dropped_textual: Vec<String>,
    pub dropped_missing: Vec<String>,
    pub dropped_correlation: Vec<String>,
    pub correlated_pairs: Vec<CorrelatedPair>,
}

impl FilterOutcome {
    /// Project another table (e.g. the test split) onto the retained columns.
    pub fn apply_to(&self, df: &DataFrame) -> Result<DataFrame> {
        for name in &self.predictors {
            if df.column(name).is_err() {
                return Err(PipelineError::MissingPredictor(name.clone()).into());
            }
        }
        let columns = self.columns();
        Ok(df.select(columns.iter().map(|s| s.as_str()))?)
    }

    /// Project an unlabeled table onto the retained predictors only.
    pub fn apply_predictors(&self, df: &DataFrame) -> Result<DataFrame> {
        for name in &self.predictors {
            if df.column(name).is_err() {
                return Err(PipelineError::MissingPredictor(name.clone()).into());
            }
        }
        Ok(df.select(self.predictors.iter().map(|s| s.as_str()))?)
    }

    fn columns(&self) -> Vec<String> {
        let mut columns = self.predictors.clone();
        columns.push(self.label.clone());
        columns
    }

    pub fn total_dropped(&self) -> usize {
        self.dropped_excluded.len()
            + self.dropped_textual.len()
            + self.dropped_missing.len()
            + self.dropped_correlation.len()
    }
}

/// Columns of `df` that hold non-numeric values, excluding the label.
pub fn textual_columns(df: &DataFrame, label: &str) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| !col.dtype().is_primitive_numeric() && col.name().as_str() != label)
        .map(|col| col.name().to_string())
        .collect()
}

fn predictor_count(df: &DataFrame, label: &str) -> usize {
    df.get_column_names()
        .iter()
        .filter(|n| n.as_str() != label)
        .count()
}

fn ensure_predictors(df: &DataFrame, label: &str, stage: &'static str) -> Result<()> {
    if predictor_count(df, label) == 0 {
        return Err(PipelineError::EmptyPredictorSet { stage }.into());
    }
    Ok(())
}

fn drop_columns(df: &DataFrame, names: &[String]) -> DataFrame {
    df.drop_many(names.iter().map(|s| s.as_str()))
}

/// Run the full predictor filter.
///
/// Steps: named exclusion, textual removal, missing-value removal, then
/// correlation pruning over the remaining numeric predictors.
pub fn filter_predictors(df: &DataFrame, config: &FilterConfig) -> Result<FilterOutcome> {
    let label = config.label.as_str();

    if df.column(label).is_err() {
        return Err(PipelineError::MissingLabel {
            column: label.to_string(),
            reason: "not found in table".to_string(),
        }
        .into());
    }

    // Step 1: named exclusion list; absent names are ignored
    let dropped_excluded: Vec<String> = config
        .excluded
        .iter()
        .filter(|name| name.as_str() != label && df.column(name).is_ok())
        .cloned()
        .collect();
    let df = drop_columns(df, &dropped_excluded);
    ensure_predictors(&df, label, "exclusion")?;

    // Step 2: textual columns
    let dropped_textual = textual_columns(&df, label);
    let df = drop_columns(&df, &dropped_textual);
    ensure_predictors(&df, label, "textual")?;

    // Step 3: any missing value drops the column
    let missing_ratios = analyze_missing_values(&df, label)?;
    let dropped_missing = get_features_above_threshold(&missing_ratios, 0.0, label);
    let df = drop_columns(&df, &dropped_missing);
    ensure_predictors(&df, label, "missing value")?;

    // Step 4: correlation pruning; a lone predictor has no pair to prune
    let numeric = numeric_predictor_columns(&df, label);
    let (correlated_pairs, dropped_correlation) = if numeric.len() < 2 {
        (Vec::new(), Vec::new())
    } else {
        let matrix = compute_correlation_matrix(&df, &numeric)?;
        (
            extract_correlated_pairs(&matrix, config.correlation_cutoff),
            select_features_to_drop(&matrix, config.correlation_cutoff),
        )
    };
    let df = drop_columns(&df, &dropped_correlation);
    ensure_predictors(&df, label, "correlation")?;

    log::debug!(
        "Predictor filter dropped {} excluded, {} textual, {} missing, {} correlated",
        dropped_excluded.len(),
        dropped_textual.len(),
        dropped_missing.len(),
        dropped_correlation.len()
    );

    let predictors = numeric_predictor_columns(&df, label);

    Ok(FilterOutcome {
        table: df,
        predictors,
        label: label.to_string(),
        dropped_excluded,
        dropped_textual,
        dropped_missing,
        dropped_correlation,
        correlated_pairs,
    })
}

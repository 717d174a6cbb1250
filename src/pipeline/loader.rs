//! Dataset loader for CSV files

use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

use super::error::PipelineError;

/// Tokens read as missing values. `#DIV/0!` is intentionally absent so that
/// spreadsheet error columns load as text and are removed by the textual filter.
pub const NULL_TOKENS: [&str; 2] = ["NA", ""];

/// Load a CSV dataset and fix the label column's type to a string category.
///
/// Returns the collected DataFrame along with row count, column count and
/// estimated memory in MB.
pub fn load_dataset(
    path: &Path,
    label: &str,
    infer_schema_length: usize,
) -> Result<(DataFrame, usize, usize, f64)> {
    let df = read_csv(path, infer_schema_length)?;
    let df = cast_label_column(df, label)?;

    let (rows, cols) = df.shape();
    let memory_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);

    log::debug!(
        "Loaded {} with {} rows, {} columns",
        path.display(),
        rows,
        cols
    );

    Ok((df, rows, cols, memory_mb))
}

/// Read a CSV file without any label handling. Used for unlabeled scoring files.
pub fn read_csv(path: &Path, infer_schema_length: usize) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if extension != "csv" {
        anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv",
            extension
        );
    }

    // 0 means full table scan
    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let null_values = NullValues::AllColumns(NULL_TOKENS.iter().map(|t| (*t).into()).collect());

    LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(schema_length)
        .with_null_values(Some(null_values))
        .finish()
        .with_context(|| format!("Failed to load CSV file: {}", path.display()))?
        .collect()
        .with_context(|| format!("Failed to parse CSV file: {}", path.display()))
}

/// Cast the label column to String so every category is a text value,
/// failing when the column is absent or holds nulls.
pub fn cast_label_column(mut df: DataFrame, label: &str) -> Result<DataFrame> {
    let column = df.column(label).map_err(|_| PipelineError::MissingLabel {
        column: label.to_string(),
        reason: "not found in dataset".to_string(),
    })?;

    if column.null_count() > 0 {
        return Err(PipelineError::MissingLabel {
            column: label.to_string(),
            reason: format!("contains {} missing values", column.null_count()),
        }
        .into());
    }

    let casted = column
        .cast(&DataType::String)
        .with_context(|| format!("Failed to cast label column '{}' to categories", label))?;
    df.with_column(casted)?;

    Ok(df)
}

/// Read the label column as owned strings.
pub fn label_values(df: &DataFrame, label: &str) -> Result<Vec<String>> {
    let column = df.column(label).map_err(|_| PipelineError::MissingLabel {
        column: label.to_string(),
        reason: "not found in table".to_string(),
    })?;
    let casted = column.cast(&DataType::String)?;

    casted
        .str()?
        .into_iter()
        .map(|v| {
            v.map(|s| s.to_string()).ok_or_else(|| {
                PipelineError::MissingLabel {
                    column: label.to_string(),
                    reason: "contains missing values".to_string(),
                }
                .into()
            })
        })
        .collect()
}

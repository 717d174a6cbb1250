//! Missing value analysis and reduction

use anyhow::Result;
use polars::prelude::*;

/// Number of missing cells in a column: nulls, plus NaN in float columns.
pub fn missing_count(col: &Column) -> Result<usize> {
    let mut count = col.null_count();
    if col.dtype().is_float() {
        let nan = col.as_materialized_series().is_nan()?;
        count += nan.num_trues();
    }
    Ok(count)
}

/// Analyze missing values in the dataset.
///
/// Returns `(column, missing_count / row_count)` for every column except
/// `label`, sorted by missing ratio descending.
pub fn analyze_missing_values(df: &DataFrame, label: &str) -> Result<Vec<(String, f64)>> {
    // Handle empty DataFrame
    if df.height() == 0 {
        return Ok(Vec::new());
    }

    let rows = df.height() as f64;

    let mut missing_ratios: Vec<(String, f64)> = df
        .get_columns()
        .iter()
        .filter(|col| col.name().as_str() != label)
        .map(|col| Ok((col.name().to_string(), missing_count(col)? as f64 / rows)))
        .collect::<Result<_>>()?;

    // Stable sort keeps table order among equal ratios
    missing_ratios.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    Ok(missing_ratios)
}

/// Get features to drop based on missing value threshold
pub fn get_features_above_threshold(
    missing_ratios: &[(String, f64)],
    threshold: f64,
    label: &str,
) -> Vec<String> {
    missing_ratios
        .iter()
        .filter(|(name, ratio)| *ratio > threshold && name != label)
        .map(|(name, _)| name.clone())
        .collect()
}

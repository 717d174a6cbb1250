//! Correlation-based predictor reduction

use anyhow::{Context, Result};
use faer::Mat;
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use super::error::PipelineError;

/// Represents a correlated pair of features
#[derive(Debug, Clone, Serialize)]
pub struct CorrelatedPair {
    pub feature1: String,
    pub feature2: String,
    pub correlation: f64,
}

/// Square Pearson correlation matrix over named numeric columns.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    names: Vec<String>,
    values: Mat<f64>,
}

impl CorrelationMatrix {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    /// Look up the coefficient between two columns by name.
    pub fn between(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.get(i, j))
    }

    /// Mean absolute off-diagonal correlation of column `i` against the
    /// columns flagged in `retained`.
    fn mean_abs_against(&self, i: usize, retained: &[bool]) -> f64 {
        let (sum, count) = (0..self.len())
            .filter(|&j| j != i && retained[j])
            .fold((0.0, 0usize), |(s, c), j| (s + self.get(i, j).abs(), c + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }
}

/// Names of the numeric columns of `df`, excluding the label.
pub fn numeric_predictor_columns(df: &DataFrame, label: &str) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| col.dtype().is_primitive_numeric() && col.name().as_str() != label)
        .map(|col| col.name().to_string())
        .collect()
}

/// Compute the correlation matrix using matrix operations.
///
/// Algorithm:
/// 1. Standardize each column: z = (x - mean) / (std * sqrt(n))
/// 2. Compute R = Z^T * Z
///
/// Zero-variance columns standardize to all zeros and therefore correlate 0
/// with every other column. The diagonal is pinned to 1.
pub fn compute_correlation_matrix(df: &DataFrame, columns: &[String]) -> Result<CorrelationMatrix> {
    if columns.len() < 2 {
        return Err(PipelineError::NonSquareCorrelation {
            found: columns.len(),
        }
        .into());
    }

    let float_columns: Vec<Vec<f64>> = columns
        .iter()
        .map(|name| {
            let col = df
                .column(name)
                .with_context(|| format!("Column '{}' not found", name))?
                .cast(&DataType::Float64)?;
            Ok(col.f64()?.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        })
        .collect::<Result<_>>()?;

    let n_rows = df.height();
    let n_cols = columns.len();

    let standardized: Vec<Vec<f64>> = float_columns
        .par_iter()
        .map(|values| standardize(values))
        .collect();

    let mut z = Mat::<f64>::zeros(n_rows, n_cols);
    for (col_idx, col_data) in standardized.iter().enumerate() {
        for (row_idx, &val) in col_data.iter().enumerate() {
            z[(row_idx, col_idx)] = val;
        }
    }

    let mut values = z.transpose() * &z;
    for i in 0..n_cols {
        values[(i, i)] = 1.0;
        for j in (i + 1)..n_cols {
            // Exactly symmetric
            let r = (0.5 * (values[(i, j)] + values[(j, i)])).clamp(-1.0, 1.0);
            values[(i, j)] = r;
            values[(j, i)] = r;
        }
    }

    Ok(CorrelationMatrix {
        names: columns.to_vec(),
        values,
    })
}

/// Center and scale a column so that dot products between columns are
/// Pearson coefficients. Missing values contribute 0.
fn standardize(values: &[f64]) -> Vec<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));

    if count == 0 {
        return vec![0.0; values.len()];
    }

    let mean = sum / count as f64;
    let sq_dev: f64 = values
        .iter()
        .filter(|v| !v.is_nan())
        .map(|v| (v - mean) * (v - mean))
        .sum();

    // Constant column
    if sq_dev == 0.0 {
        return vec![0.0; values.len()];
    }

    let scale = sq_dev.sqrt();
    values
        .iter()
        .map(|v| if v.is_nan() { 0.0 } else { (v - mean) / scale })
        .collect()
}

/// Extract correlated pairs from the upper triangle of the matrix,
/// sorted by absolute correlation descending.
pub fn extract_correlated_pairs(matrix: &CorrelationMatrix, threshold: f64) -> Vec<CorrelatedPair> {
    let n = matrix.len();
    let mut pairs = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            let corr = matrix.get(i, j);
            if corr.abs() > threshold && !corr.is_nan() {
                pairs.push(CorrelatedPair {
                    feature1: matrix.names[i].clone(),
                    feature2: matrix.names[j].clone(),
                    correlation: corr,
                });
            }
        }
    }

    pairs.sort_by(|a, b| {
        b.correlation
            .abs()
            .partial_cmp(&a.correlation.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    pairs
}

/// Select columns to remove so that no two retained columns have absolute
/// correlation above `cutoff`.
///
/// Columns are visited in descending order of their mean absolute correlation
/// (ties keep matrix order). For every pair above the cutoff where both columns
/// are still retained, the one whose mean absolute correlation against the
/// other retained columns is larger is dropped; on a tie the later column in
/// visiting order is dropped.
///
/// Returns dropped column names in matrix order.
pub fn select_features_to_drop(matrix: &CorrelationMatrix, cutoff: f64) -> Vec<String> {
    let n = matrix.len();
    let all = vec![true; n];

    let initial_means: Vec<f64> = (0..n).map(|i| matrix.mean_abs_against(i, &all)).collect();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        initial_means[b]
            .partial_cmp(&initial_means[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut retained = all;

    for (pos, &i) in order.iter().enumerate() {
        for &j in &order[pos + 1..] {
            if !retained[i] {
                break;
            }
            if !retained[j] || matrix.get(i, j).abs() <= cutoff {
                continue;
            }

            let mean_i = matrix.mean_abs_against(i, &retained);
            let mean_j = matrix.mean_abs_against(j, &retained);
            if mean_i > mean_j {
                retained[i] = false;
            } else {
                retained[j] = false;
            }
        }
    }

    (0..n)
        .filter(|&i| !retained[i])
        .map(|i| matrix.names[i].clone())
        .collect()
}

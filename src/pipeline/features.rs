//! Dense predictor matrices and label encoding shared by the model stages

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::Serialize;

use super::error::PipelineError;
use super::loader::label_values;

/// Sorted, de-duplicated label categories. Class indices are positions in this list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSet {
    categories: Vec<String>,
}

impl LabelSet {
    pub fn from_values(values: &[String]) -> Self {
        let mut categories = values.to_vec();
        categories.sort();
        categories.dedup();
        Self { categories }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn index_of(&self, category: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(category))
            .ok()
    }

    pub fn name(&self, index: usize) -> &str {
        &self.categories[index]
    }

    /// Encode values as class indices, failing with `LabelMismatch` when a
    /// value is not part of this set.
    pub fn encode(&self, values: &[String]) -> Result<Vec<usize>, PipelineError> {
        let mut unseen: Vec<String> = values
            .iter()
            .filter(|v| self.index_of(v).is_none())
            .cloned()
            .collect();

        if !unseen.is_empty() {
            unseen.sort();
            unseen.dedup();
            return Err(PipelineError::LabelMismatch {
                unseen,
                known: self.categories.clone(),
            });
        }

        Ok(values.iter().filter_map(|v| self.index_of(v)).collect())
    }
}

/// Row-major `f64` matrix of predictor values.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    names: Vec<String>,
    data: Vec<f64>,
    n_rows: usize,
}

impl FeatureMatrix {
    /// Build a matrix from row slices. All rows must have `names.len()` entries.
    pub fn from_rows(names: Vec<String>, rows: &[Vec<f64>]) -> Self {
        let n_cols = names.len();
        let mut data = Vec::with_capacity(rows.len() * n_cols);
        for row in rows {
            debug_assert_eq!(row.len(), n_cols);
            data.extend_from_slice(row);
        }
        Self {
            names,
            data,
            n_rows: rows.len(),
        }
    }

    /// Extract the named predictor columns of `df` as a dense matrix.
    ///
    /// Nulls are an error since the predictor filter has already removed
    /// every column that contains one.
    pub fn from_frame(df: &DataFrame, predictors: &[String]) -> Result<Self> {
        let n_rows = df.height();
        let n_cols = predictors.len();
        let mut data = vec![0.0; n_rows * n_cols];

        for (c, name) in predictors.iter().enumerate() {
            let column = df
                .column(name)
                .map_err(|_| PipelineError::MissingPredictor(name.clone()))?
                .cast(&DataType::Float64)
                .with_context(|| format!("Predictor '{}' is not numeric", name))?;

            for (r, value) in column.f64()?.iter().enumerate() {
                data[r * n_cols + c] = value.with_context(|| {
                    format!("Predictor '{}' has a missing value at row {}", name, r)
                })?;
            }
        }

        Ok(Self {
            names: predictors.to_vec(),
            data,
            n_rows,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let n_cols = self.n_cols();
        &self.data[i * n_cols..(i + 1) * n_cols]
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n_cols() + col]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    /// New matrix holding only the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let mut data = Vec::with_capacity(rows.len() * self.n_cols());
        for &r in rows {
            data.extend_from_slice(self.row(r));
        }
        Self {
            names: self.names.clone(),
            data,
            n_rows: rows.len(),
        }
    }

    /// Z-score every column. Constant columns become all zeros.
    pub fn standardized(&self) -> Self {
        let n_cols = self.n_cols();
        let n = self.n_rows.max(1) as f64;
        let mut out = self.data.clone();

        for c in 0..n_cols {
            let mean = self.rows().map(|r| r[c]).sum::<f64>() / n;
            let var = self.rows().map(|r| (r[c] - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            for r in 0..self.n_rows {
                let v = &mut out[r * n_cols + c];
                *v = if std > 0.0 { (*v - mean) / std } else { 0.0 };
            }
        }

        Self {
            names: self.names.clone(),
            data: out,
            n_rows: self.n_rows,
        }
    }
}

/// Predictors plus encoded labels for one table.
#[derive(Debug, Clone)]
pub struct LabeledData {
    pub features: FeatureMatrix,
    pub labels: Vec<usize>,
    pub label_set: LabelSet,
}

impl LabeledData {
    /// Extract a labeled dataset, deriving the label set from the table itself.
    pub fn from_frame(df: &DataFrame, predictors: &[String], label: &str) -> Result<Self> {
        let values = label_values(df, label)?;
        let label_set = LabelSet::from_values(&values);
        Self::with_label_set(df, predictors, label, label_set)
    }

    /// Extract a labeled dataset against a known label set (e.g. the training
    /// categories when loading the test table).
    pub fn with_label_set(
        df: &DataFrame,
        predictors: &[String],
        label: &str,
        label_set: LabelSet,
    ) -> Result<Self> {
        let values = label_values(df, label)?;
        let labels = label_set.encode(&values)?;
        let features = FeatureMatrix::from_frame(df, predictors)?;
        Ok(Self {
            features,
            labels,
            label_set,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.label_set.len()
    }

    /// Row count per class index.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes()];
        for &y in &self.labels {
            counts[y] += 1;
        }
        counts
    }

    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            features: self.features.select_rows(rows),
            labels: rows.iter().map(|&r| self.labels[r]).collect(),
            label_set: self.label_set.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_label_set_sorted_and_unique() {
        let set = LabelSet::from_values(&strings(&["C", "A", "B", "A"]));
        assert_eq!(set.categories(), &strings(&["A", "B", "C"])[..]);
        assert_eq!(set.index_of("B"), Some(1));
        assert_eq!(set.index_of("Z"), None);
    }

    #[test]
    fn test_encode_reports_unseen_categories() {
        let set = LabelSet::from_values(&strings(&["A", "B"]));
        let err = set.encode(&strings(&["A", "E", "D", "E"])).unwrap_err();
        assert_eq!(
            err,
            PipelineError::LabelMismatch {
                unseen: strings(&["D", "E"]),
                known: strings(&["A", "B"]),
            }
        );
    }

    #[test]
    fn test_select_rows_and_standardize() {
        let m = FeatureMatrix::from_rows(
            strings(&["x", "k"]),
            &[vec![1.0, 5.0], vec![2.0, 5.0], vec![3.0, 5.0]],
        );
        let picked = m.select_rows(&[2, 0]);
        assert_eq!(picked.row(0), &[3.0, 5.0]);
        assert_eq!(picked.row(1), &[1.0, 5.0]);

        let z = m.standardized();
        assert!((z.value(1, 0)).abs() < 1e-12);
        assert_eq!(z.value(0, 1), 0.0);
        assert!(z.value(0, 0) < 0.0 && z.value(2, 0) > 0.0);
    }
}

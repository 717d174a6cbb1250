//! Held-out evaluation: confusion matrix and accuracy

use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;

use super::features::{LabelSet, LabeledData};
use crate::model::{Classifier, ModelMethod, TrainedModel};

/// Share of positions where `truth` and `predicted` agree. Empty input gives 0.
pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / truth.len() as f64
}

/// Counts of (true category, predicted category) pairs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    pub categories: Vec<String>,
    /// `counts[actual][predicted]`
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(label_set: &LabelSet, truth: &[usize], predicted: &[usize]) -> Self {
        let k = label_set.len();
        let mut counts = vec![vec![0; k]; k];
        for (&t, &p) in truth.iter().zip(predicted) {
            counts[t][p] += 1;
        }
        Self {
            categories: label_set.categories().to_vec(),
            counts,
        }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.counts.len()).map(|i| self.counts[i][i]).sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.correct() as f64 / total as f64
        }
    }

    fn actual_total(&self, class: usize) -> usize {
        self.counts[class].iter().sum()
    }

    fn predicted_total(&self, class: usize) -> usize {
        self.counts.iter().map(|row| row[class]).sum()
    }

    /// Recall of one class; `None` when the class never occurs.
    pub fn sensitivity(&self, class: usize) -> Option<f64> {
        let n = self.actual_total(class);
        (n > 0).then(|| self.counts[class][class] as f64 / n as f64)
    }

    /// Precision of one class; `None` when the class is never predicted.
    pub fn precision(&self, class: usize) -> Option<f64> {
        let n = self.predicted_total(class);
        (n > 0).then(|| self.counts[class][class] as f64 / n as f64)
    }

    /// Cohen's kappa: agreement corrected for chance.
    pub fn kappa(&self) -> f64 {
        let total = self.total() as f64;
        if total == 0.0 {
            return 0.0;
        }
        let observed = self.correct() as f64 / total;
        let expected: f64 = (0..self.counts.len())
            .map(|c| self.actual_total(c) as f64 * self.predicted_total(c) as f64)
            .sum::<f64>()
            / (total * total);
        if (1.0 - expected).abs() < f64::EPSILON {
            return if observed >= 1.0 { 1.0 } else { 0.0 };
        }
        (observed - expected) / (1.0 - expected)
    }
}

/// Per-class statistics for reporting
#[derive(Debug, Clone, Serialize)]
pub struct ClassStats {
    pub category: String,
    pub support: usize,
    pub sensitivity: Option<f64>,
    pub precision: Option<f64>,
}

/// Result of applying a trained model to a labeled test table
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub method: ModelMethod,
    pub confusion: ConfusionMatrix,
    pub accuracy: f64,
    pub kappa: f64,
    pub class_stats: Vec<ClassStats>,
}

impl Evaluation {
    pub fn from_confusion(method: ModelMethod, confusion: ConfusionMatrix) -> Self {
        let class_stats = confusion
            .categories
            .iter()
            .enumerate()
            .map(|(i, category)| ClassStats {
                category: category.clone(),
                support: confusion.actual_total(i),
                sensitivity: confusion.sensitivity(i),
                precision: confusion.precision(i),
            })
            .collect();

        Self {
            method,
            accuracy: confusion.accuracy(),
            kappa: confusion.kappa(),
            confusion,
            class_stats,
        }
    }
}

/// Predict every row of `test` and compare with its labels.
///
/// Fails with `LabelMismatch` when the test table holds a category the model
/// was not trained on.
pub fn evaluate(model: &TrainedModel, test: &DataFrame, label: &str) -> Result<Evaluation> {
    let data = LabeledData::with_label_set(test, &model.predictors, label, model.label_set.clone())?;
    let predicted = model.model.predict(&data.features);
    let confusion = ConfusionMatrix::new(&model.label_set, &data.labels, &predicted);

    log::debug!(
        "{} evaluated on {} rows: {}/{} correct",
        model.method,
        confusion.total(),
        confusion.correct(),
        confusion.total()
    );

    Ok(Evaluation::from_confusion(model.method, confusion))
}

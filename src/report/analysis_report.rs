//! JSON analysis report
//!
//! Records the run configuration, the split, every predictor filter decision,
//! the clustering baseline and both trained models with their test-set
//! evaluation, so a run can be inspected without rerunning it.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::cli::PipelineConfig;
use crate::model::{ClusterCrossTab, CrossValidation, Hyperparameters, KMeansResult, ModelMethod, TrainedModel};
use crate::pipeline::{CorrelatedPair, Evaluation, FilterOutcome, SplitTables};

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub liftfit_version: String,
    pub config: PipelineConfig,
}

/// Row counts of the stratified split
#[derive(Debug, Clone, Serialize)]
pub struct SplitReport {
    pub total_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl SplitReport {
    pub fn new(split: &SplitTables) -> Self {
        Self {
            total_rows: split.train_rows.len() + split.test_rows.len(),
            train_rows: split.train_rows.len(),
            test_rows: split.test_rows.len(),
        }
    }
}

/// Predictor filter decisions
#[derive(Debug, Clone, Serialize)]
pub struct FilterReport {
    pub correlation_cutoff: f64,
    pub predictors: Vec<String>,
    pub dropped_excluded: Vec<String>,
    pub dropped_textual: Vec<String>,
    pub dropped_missing: Vec<String>,
    pub dropped_correlation: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub correlated_pairs: Vec<CorrelatedPair>,
}

impl FilterReport {
    pub fn new(outcome: &FilterOutcome, correlation_cutoff: f64) -> Self {
        Self {
            correlation_cutoff,
            predictors: outcome.predictors.clone(),
            dropped_excluded: outcome.dropped_excluded.clone(),
            dropped_textual: outcome.dropped_textual.clone(),
            dropped_missing: outcome.dropped_missing.clone(),
            dropped_correlation: outcome.dropped_correlation.clone(),
            correlated_pairs: outcome.correlated_pairs.clone(),
        }
    }
}

/// k-means baseline summary
#[derive(Debug, Clone, Serialize)]
pub struct ClusteringReport {
    pub k: usize,
    pub iterations: usize,
    pub converged: bool,
    pub inertia: f64,
    pub cluster_sizes: Vec<usize>,
    pub purity: f64,
    pub cross_tab: ClusterCrossTab,
}

impl ClusteringReport {
    pub fn new(result: &KMeansResult, cross_tab: &ClusterCrossTab) -> Self {
        Self {
            k: result.centroids.len(),
            iterations: result.iterations,
            converged: result.converged,
            inertia: result.inertia,
            cluster_sizes: result.cluster_sizes(),
            purity: cross_tab.purity(),
            cross_tab: cross_tab.clone(),
        }
    }
}

/// One trained model with its tuning record and test-set evaluation
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub method: ModelMethod,
    pub selected: Hyperparameters,
    pub cross_validation: CrossValidation,
    pub evaluation: Evaluation,
}

impl ModelReport {
    pub fn new(model: &TrainedModel, evaluation: &Evaluation) -> Self {
        Self {
            method: model.method,
            selected: model.params,
            cross_validation: model.cross_validation.clone(),
            evaluation: evaluation.clone(),
        }
    }
}

/// Complete analysis report
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub split: SplitReport,
    pub filter: FilterReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clustering: Option<ClusteringReport>,
    pub models: Vec<ModelReport>,
}

impl AnalysisReport {
    pub fn new(config: &PipelineConfig, split: SplitReport, filter: FilterReport) -> Self {
        Self {
            metadata: ReportMetadata {
                timestamp: Utc::now().to_rfc3339(),
                liftfit_version: env!("CARGO_PKG_VERSION").to_string(),
                config: config.clone(),
            },
            split,
            filter,
            clustering: None,
            models: Vec::new(),
        }
    }

    pub fn set_clustering(&mut self, clustering: ClusteringReport) {
        self.clustering = Some(clustering);
    }

    pub fn add_model(&mut self, model: ModelReport) {
        self.models.push(model);
    }
}

/// Write the report as pretty-printed JSON
pub fn export_analysis_report(report: &AnalysisReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize analysis report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write analysis report: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> PipelineConfig {
        PipelineConfig {
            input: PathBuf::from("pml-training.csv"),
            label: "classe".to_string(),
            excluded: vec!["X".to_string()],
            correlation_cutoff: 0.7,
            train_fraction: 0.7,
            seed: 300,
            folds: 3,
            clusters: 5,
            forest_trees: 100,
            score: None,
            report: None,
            infer_schema_length: 10000,
        }
    }

    fn filter() -> FilterReport {
        FilterReport {
            correlation_cutoff: 0.7,
            predictors: vec!["roll_belt".to_string()],
            dropped_excluded: vec!["X".to_string()],
            dropped_textual: vec![],
            dropped_missing: vec!["max_roll_belt".to_string()],
            dropped_correlation: vec![],
            correlated_pairs: vec![],
        }
    }

    #[test]
    fn test_report_serializes_sections() {
        let split = SplitReport {
            total_rows: 10,
            train_rows: 7,
            test_rows: 3,
        };
        let report = AnalysisReport::new(&config(), split, filter());
        let value: serde_json::Value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["metadata"]["config"]["label"], "classe");
        assert_eq!(value["split"]["train_rows"], 7);
        assert_eq!(value["filter"]["dropped_missing"][0], "max_roll_belt");
        assert!(value.get("clustering").is_none());
        assert!(value["filter"].get("correlated_pairs").is_none());
        assert_eq!(value["models"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let split = SplitReport {
            total_rows: 10,
            train_rows: 7,
            test_rows: 3,
        };
        export_analysis_report(&AnalysisReport::new(&config(), split, filter()), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"liftfit_version\""));
    }
}

//! Tests for the predictor filter

use liftfit::pipeline::{
    compute_correlation_matrix, filter_predictors, textual_columns, FilterConfig, PipelineError,
    DEFAULT_CORRELATION_CUTOFF, DEFAULT_EXCLUDED_COLUMNS,
};
use polars::prelude::*;

mod common;

fn default_config() -> FilterConfig {
    FilterConfig::new("classe")
}

#[test]
fn test_defaults() {
    let config = default_config();
    assert_eq!(config.correlation_cutoff, DEFAULT_CORRELATION_CUTOFF);
    assert_eq!(config.correlation_cutoff, 0.7);
    assert_eq!(config.excluded.len(), DEFAULT_EXCLUDED_COLUMNS.len());
    assert!(config.excluded.iter().any(|c| c == "cvtd_timestamp"));
}

#[test]
fn test_each_stage_drops_expected_columns() {
    let df = common::create_recording_dataframe();
    let outcome = filter_predictors(&df, &default_config()).unwrap();

    assert_eq!(outcome.dropped_excluded, vec!["X", "user_name", "new_window"]);
    assert_eq!(outcome.dropped_textual, vec!["kurtosis_yaw_belt"]);
    assert_eq!(outcome.dropped_missing, vec!["max_roll_belt"]);
    // pitch and yaw move together; pitch also leans on roll
    assert_eq!(outcome.dropped_correlation, vec!["pitch_belt"]);
    assert_eq!(outcome.predictors, vec!["roll_belt", "yaw_belt"]);
    assert_eq!(outcome.total_dropped(), 6);

    common::assert_shape(&outcome.table, 10, 3);
    common::assert_missing_columns(&outcome.table, &["X", "pitch_belt", "max_roll_belt"]);
}

#[test]
fn test_label_never_dropped() {
    let df = common::create_recording_dataframe();
    let config = default_config().with_excluded(vec!["classe".to_string(), "X".to_string()]);
    let outcome = filter_predictors(&df, &config).unwrap();

    assert!(outcome.table.column("classe").is_ok());
    assert_eq!(outcome.dropped_excluded, vec!["X"]);
}

#[test]
fn test_absent_excluded_names_ignored() {
    let df = common::create_correlation_test_dataframe();
    let outcome = filter_predictors(&df, &default_config()).unwrap();
    assert!(outcome.dropped_excluded.is_empty());
    assert_eq!(outcome.dropped_correlation, vec!["b"]);
}

#[test]
fn test_filter_is_idempotent() {
    let df = common::create_activity_dataframe(20, 11);
    let first = filter_predictors(&df, &default_config()).unwrap();
    let second = filter_predictors(&first.table, &default_config()).unwrap();

    assert_eq!(first.predictors, second.predictors);
    assert_eq!(second.total_dropped(), 0);
    assert_eq!(first.table.shape(), second.table.shape());
}

#[test]
fn test_retained_predictors_below_cutoff() {
    let df = common::create_activity_dataframe(30, 5);
    let outcome = filter_predictors(&df, &default_config()).unwrap();

    assert_eq!(outcome.dropped_correlation.len(), 1);
    let matrix = compute_correlation_matrix(&outcome.table, &outcome.predictors).unwrap();
    for i in 0..matrix.len() {
        for j in (i + 1)..matrix.len() {
            assert!(matrix.get(i, j).abs() <= 0.7);
        }
    }
}

#[test]
fn test_apply_to_projects_test_table() {
    let df = common::create_activity_dataframe(10, 2);
    let outcome = filter_predictors(&df, &default_config()).unwrap();
    let other = common::create_activity_dataframe(4, 99);

    let projected = outcome.apply_to(&other).unwrap();
    let mut expected = outcome.predictors.clone();
    expected.push("classe".to_string());
    let columns: Vec<String> = projected
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(columns, expected);
    assert_eq!(projected.height(), 20);
}

#[test]
fn test_apply_to_missing_predictor() {
    let df = common::create_activity_dataframe(10, 2);
    let outcome = filter_predictors(&df, &default_config()).unwrap();
    let stripped = df.drop(&outcome.predictors[0]).unwrap();

    let err = outcome.apply_to(&stripped).unwrap_err();
    assert_eq!(
        err.downcast_ref::<PipelineError>(),
        Some(&PipelineError::MissingPredictor(outcome.predictors[0].clone()))
    );
}

#[test]
fn test_textual_columns_skip_label() {
    let df = common::create_recording_dataframe();
    assert_eq!(
        textual_columns(&df, "classe"),
        vec!["user_name", "new_window", "kurtosis_yaw_belt"]
    );
}

#[test]
fn test_everything_filtered_is_an_error() {
    let df = df! {
        "user_name" => ["pedro", "adelmo", "pedro"],
        "kurtosis_roll_belt" => ["#DIV/0!", "", ""],
        "classe" => ["A", "B", "A"],
    }
    .unwrap();
    let err = filter_predictors(&df, &default_config()).unwrap_err();

    assert_eq!(
        err.downcast_ref::<PipelineError>(),
        Some(&PipelineError::EmptyPredictorSet { stage: "textual" })
    );
}

#[test]
fn test_incomplete_columns_only_is_an_error() {
    let df = df! {
        "max_roll_belt" => [Some(1.0f64), None, Some(2.0)],
        "min_roll_belt" => [None, Some(1.0f64), Some(2.0)],
        "classe" => ["A", "B", "A"],
    }
    .unwrap();
    let err = filter_predictors(&df, &default_config()).unwrap_err();

    assert_eq!(
        err.downcast_ref::<PipelineError>(),
        Some(&PipelineError::EmptyPredictorSet { stage: "missing value" })
    );
}

#[test]
fn test_single_numeric_predictor_is_kept() {
    let df = df! {
        "roll_belt" => [1.0f64, 2.0, 3.0],
        "classe" => ["A", "B", "A"],
    }
    .unwrap();
    let outcome = filter_predictors(&df, &default_config()).unwrap();

    assert_eq!(outcome.predictors, vec!["roll_belt"]);
    assert!(outcome.correlated_pairs.is_empty());
    assert!(outcome.dropped_correlation.is_empty());

    // The matrix itself still needs two columns
    let err = compute_correlation_matrix(&df, &["roll_belt".to_string()]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<PipelineError>(),
        Some(&PipelineError::NonSquareCorrelation { found: 1 })
    );
}

#[test]
fn test_pair_pruned_to_one_predictor_filters_again_unchanged() {
    let df = df! {
        "a" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0],
        "b" => [1.1f64, 1.9, 3.2, 3.9, 5.1, 6.0],
        "classe" => ["A", "B", "A", "B", "A", "B"],
    }
    .unwrap();

    let first = filter_predictors(&df, &default_config()).unwrap();
    assert_eq!(first.predictors, vec!["a"]);
    assert_eq!(first.dropped_correlation, vec!["b"]);

    let second = filter_predictors(&first.table, &default_config()).unwrap();
    assert_eq!(second.predictors, vec!["a"]);
    assert_eq!(second.total_dropped(), 0);
    assert_eq!(first.table.shape(), second.table.shape());
}

//! Tests for correlation matrix computation and pruning

use liftfit::pipeline::{
    compute_correlation_matrix, extract_correlated_pairs, numeric_predictor_columns,
    select_features_to_drop, PipelineError,
};
use polars::prelude::*;

mod common;

fn names(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_numeric_columns_exclude_label() {
    let df = common::create_correlation_test_dataframe();
    assert_eq!(numeric_predictor_columns(&df, "classe"), names(&["a", "b", "c"]));
}

#[test]
fn test_matrix_is_symmetric_with_unit_diagonal() {
    let df = common::create_correlation_test_dataframe();
    let matrix = compute_correlation_matrix(&df, &names(&["a", "b", "c"])).unwrap();

    assert_eq!(matrix.len(), 3);
    for i in 0..3 {
        assert_eq!(matrix.get(i, i), 1.0);
        for j in 0..3 {
            assert!((matrix.get(i, j) - matrix.get(j, i)).abs() < 1e-12);
        }
    }

    let ab = matrix.between("a", "b").unwrap();
    assert!((ab - 0.9506).abs() < 1e-3, "expected r(a, b) near 0.95, got {}", ab);
    assert!(matrix.between("a", "c").unwrap().abs() < 0.05);
}

#[test]
fn test_one_of_strongly_correlated_pair_dropped() {
    let df = common::create_correlation_test_dataframe();
    let matrix = compute_correlation_matrix(&df, &names(&["a", "b", "c"])).unwrap();

    let dropped = select_features_to_drop(&matrix, 0.7);
    assert_eq!(dropped.len(), 1);
    // b leans slightly more on c than a does, so b has the larger mean
    assert_eq!(dropped, names(&["b"]));

    let pairs = extract_correlated_pairs(&matrix, 0.7);
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].feature1, "a");
    assert_eq!(pairs[0].feature2, "b");
}

#[test]
fn test_negative_correlation_counts() {
    let df = df! {
        "up" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0],
        "down" => [6.0f64, 5.0, 4.0, 3.0, 2.0, 1.0],
    }
    .unwrap();
    let matrix = compute_correlation_matrix(&df, &names(&["up", "down"])).unwrap();

    assert!((matrix.get(0, 1) + 1.0).abs() < 1e-12);
    assert_eq!(select_features_to_drop(&matrix, 0.7), names(&["down"]));
}

#[test]
fn test_constant_column_uncorrelated() {
    let df = df! {
        "x" => [1.0f64, 2.0, 3.0, 4.0],
        "flat" => [5.0f64, 5.0, 5.0, 5.0],
    }
    .unwrap();
    let matrix = compute_correlation_matrix(&df, &names(&["x", "flat"])).unwrap();

    assert_eq!(matrix.get(0, 1), 0.0);
    assert!(select_features_to_drop(&matrix, 0.7).is_empty());
}

#[test]
fn test_retained_columns_below_cutoff() {
    let mut columns = Vec::new();
    let base: Vec<f64> = (0..50).map(|i| ((i * 37) % 23) as f64).collect();
    let other: Vec<f64> = (0..50).map(|i| ((i * 11) % 17) as f64).collect();
    for k in 0..4 {
        let values: Vec<f64> = base
            .iter()
            .zip(&other)
            .enumerate()
            .map(|(i, (b, o))| b * (k as f64 + 1.0) + o * k as f64 + (i % (k + 2)) as f64)
            .collect();
        columns.push(Column::new(format!("blend_{}", k).into(), values));
    }
    columns.push(Column::new("other".into(), other.clone()));
    let df = DataFrame::new(columns).unwrap();

    let all = numeric_predictor_columns(&df, "classe");
    let matrix = compute_correlation_matrix(&df, &all).unwrap();
    let dropped = select_features_to_drop(&matrix, 0.7);
    assert!(!dropped.is_empty());

    let retained: Vec<String> = all.into_iter().filter(|c| !dropped.contains(c)).collect();
    for (i, a) in retained.iter().enumerate() {
        for b in &retained[i + 1..] {
            let r = matrix.between(a, b).unwrap();
            assert!(r.abs() <= 0.7, "{} and {} retained with r = {}", a, b, r);
        }
    }
}

#[test]
fn test_fewer_than_two_columns_rejected() {
    let df = common::create_correlation_test_dataframe();
    let err = compute_correlation_matrix(&df, &names(&["a"])).unwrap_err();
    assert_eq!(
        err.downcast_ref::<PipelineError>(),
        Some(&PipelineError::NonSquareCorrelation { found: 1 })
    );
}

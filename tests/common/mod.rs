//! Shared test utilities and fixture generators

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tempfile::TempDir;

pub const CATEGORIES: [&str; 5] = ["A", "B", "C", "D", "E"];

/// Three numeric predictors where `a` and `b` correlate at r = 0.95 and `c`
/// is unrelated to both.
pub fn create_correlation_test_dataframe() -> DataFrame {
    df! {
        "classe" => ["A", "B", "C", "D", "E", "A", "B", "C", "D", "E",
                     "A", "B", "C", "D", "E", "A", "B", "C", "D", "E"],
        "a" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0,
                11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0, 19.0, 20.0],
        "b" => [2.08f64, 0.32, 5.52, 3.64, 7.04, 3.36, 7.48, 6.68, 12.0, 9.04,
                12.44, 9.72, 13.24, 11.12, 16.8, 15.28, 19.4, 16.44, 19.84, 17.96],
        "c" => [0.0f64, 7.0, 3.0, 10.0, 6.0, 2.0, 9.0, 5.0, 1.0, 8.0,
                4.0, 0.0, 7.0, 3.0, 10.0, 6.0, 2.0, 9.0, 5.0, 1.0],
    }
    .unwrap()
}

/// A small recording table with one column of every kind the predictor
/// filter handles: bookkeeping, textual, incomplete and numeric.
pub fn create_recording_dataframe() -> DataFrame {
    df! {
        "X" => [1i64, 2, 3, 4, 5, 6, 7, 8, 9, 10],
        "user_name" => ["carlitos", "pedro", "adelmo", "carlitos", "pedro",
                        "adelmo", "carlitos", "pedro", "adelmo", "carlitos"],
        "new_window" => ["no", "no", "no", "yes", "no", "no", "no", "no", "yes", "no"],
        "kurtosis_yaw_belt" => ["#DIV/0!", "", "", "", "", "", "", "", "#DIV/0!", ""],
        "max_roll_belt" => [None, None, None, Some(-94.3f64), None, None, None, None, Some(-94.1), None],
        "roll_belt" => [1.41f64, 1.42, 1.48, 1.48, 1.45, 8.07, 8.1, 8.2, 8.3, 8.5],
        "pitch_belt" => [8.07f64, 3.1, 8.05, 2.9, 8.06, 2.8, 8.03, 3.3, 8.02, 3.0],
        "yaw_belt" => [-94.4f64, -90.2, -94.4, -91.0, -94.4, -92.7, -94.4, -89.9, -94.4, -93.1],
        "classe" => ["A", "A", "A", "B", "B", "B", "C", "C", "C", "C"],
    }
    .unwrap()
}

/// Class-separable synthetic recordings, `per_class` rows for each of the
/// five categories, interleaved A, B, C, D, E, A, ...
///
/// Columns:
/// - `X`, `user_name`: bookkeeping columns on the default exclusion list
/// - `roll_belt`, `pitch_belt`: shifted by category, so both separate classes
/// - `accel_belt_x`: near-copy of `roll_belt` (removed by correlation pruning)
/// - `yaw_belt`: pure noise
/// - `max_roll_belt`: mostly missing
pub fn create_activity_dataframe(per_class: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows = per_class * CATEGORIES.len();

    let mut ids = Vec::with_capacity(rows);
    let mut users = Vec::with_capacity(rows);
    let mut classe = Vec::with_capacity(rows);
    let mut roll = Vec::with_capacity(rows);
    let mut pitch = Vec::with_capacity(rows);
    let mut accel = Vec::with_capacity(rows);
    let mut yaw = Vec::with_capacity(rows);
    let mut max_roll = Vec::with_capacity(rows);

    for i in 0..rows {
        let class = i % CATEGORIES.len();
        let r = class as f64 * 3.0 + rng.gen_range(-1.0..1.0);

        ids.push(i as i64 + 1);
        users.push(["adelmo", "carlitos", "pedro"][i % 3]);
        classe.push(CATEGORIES[class]);
        roll.push(r);
        pitch.push(((class * 2) % 5) as f64 * 3.0 + rng.gen_range(-1.0..1.0));
        accel.push(2.0 * r + rng.gen_range(-0.05..0.05));
        yaw.push(rng.gen_range(-10.0..10.0));
        max_roll.push(if i % 25 == 0 { Some(rng.gen_range(-90.0..90.0)) } else { None });
    }

    DataFrame::new(vec![
        Column::new("X".into(), ids),
        Column::new("user_name".into(), users),
        Column::new("roll_belt".into(), roll),
        Column::new("pitch_belt".into(), pitch),
        Column::new("accel_belt_x".into(), accel),
        Column::new("yaw_belt".into(), yaw),
        Column::new("max_roll_belt".into(), max_roll),
        Column::new("classe".into(), classe),
    ])
    .unwrap()
}

/// Label values for `per_class` rows of each category, grouped by category
pub fn balanced_labels(per_class: usize) -> Vec<String> {
    CATEGORIES
        .iter()
        .flat_map(|c| std::iter::repeat(c.to_string()).take(per_class))
        .collect()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Write raw CSV text to a temporary file
pub fn write_temp_csv(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("raw.csv");
    std::fs::write(&csv_path, contents).unwrap();
    (temp_dir, csv_path)
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}

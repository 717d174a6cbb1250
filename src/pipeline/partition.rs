//! Seeded stratified train/test partitioning

use std::collections::BTreeMap;

use anyhow::Result;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::error::PipelineError;
use super::loader::label_values;

/// Train and test tables produced by the partitioner, with the original
/// row positions each one was drawn from.
#[derive(Debug, Clone)]
pub struct SplitTables {
    pub train: DataFrame,
    pub test: DataFrame,
    pub train_rows: Vec<usize>,
    pub test_rows: Vec<usize>,
}

/// Group row positions by label category. Categories come back sorted.
pub fn rows_by_category(labels: &[String]) -> BTreeMap<&str, Vec<usize>> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (row, label) in labels.iter().enumerate() {
        groups.entry(label.as_str()).or_default().push(row);
    }
    groups
}

/// Compute stratified train/test row positions.
///
/// Each category's rows are shuffled with a single `StdRng` seeded from `seed`
/// (categories visited in sorted order) and the first `round(p * n)` rows of
/// each category go to training. Both outputs are returned in ascending order.
pub fn stratified_indices(
    labels: &[String],
    fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), PipelineError> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(PipelineError::InvalidFraction(fraction));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::with_capacity(labels.len());

    for (_, mut rows) in rows_by_category(labels) {
        rows.shuffle(&mut rng);
        let take = ((rows.len() as f64) * fraction).round() as usize;
        let take = take.min(rows.len());
        train.extend_from_slice(&rows[..take]);
        test.extend_from_slice(&rows[take..]);
    }

    train.sort_unstable();
    test.sort_unstable();

    Ok((train, test))
}

/// Split a table into stratified train/test subsets.
pub fn stratified_split(
    df: &DataFrame,
    label: &str,
    fraction: f64,
    seed: u64,
) -> Result<SplitTables> {
    let labels = label_values(df, label)?;
    let (train_rows, test_rows) = stratified_indices(&labels, fraction, seed)?;

    let train = take_rows(df, &train_rows)?;
    let test = take_rows(df, &test_rows)?;

    log::debug!(
        "Stratified split (p={}, seed={}): {} train / {} test rows",
        fraction,
        seed,
        train.height(),
        test.height()
    );

    Ok(SplitTables {
        train,
        test,
        train_rows,
        test_rows,
    })
}

/// Select rows by position into a new DataFrame.
pub fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = rows.iter().map(|&r| r as IdxSize).collect();
    let idx = IdxCa::from_vec("idx".into(), idx);
    Ok(df.take(&idx)?)
}

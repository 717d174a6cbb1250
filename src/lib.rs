//! Liftfit: Weight Lifting Activity Classification Library
//!
//! Loads accelerometer recordings, filters the predictor set (exclusions,
//! textual and incomplete columns, correlation pruning), runs a k-means
//! baseline and compares cross-validated gradient boosting and random
//! forest classifiers on a stratified hold-out split.

pub mod cli;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod utils;

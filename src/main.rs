//! Liftfit: Weight Lifting Activity Classification CLI
//!
//! Filters the accelerometer predictor set, runs a k-means baseline and
//! compares cross-validated gradient boosting and random forest models on a
//! stratified hold-out split.

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use console::style;

use liftfit::cli::{Cli, PipelineConfig};
use liftfit::model::{fit_kmeans, train_model, ClusterCrossTab, KMeansConfig, ModelMethod, TrainConfig, TrainedModel};
use liftfit::pipeline::{
    evaluate, filter_predictors, load_dataset, read_csv, stratified_split, Evaluation, FilterConfig,
    FilterOutcome, LabeledData,
};
use liftfit::report::{
    display_cluster_charts, display_evaluation, export_analysis_report, render_accuracy_comparison,
    render_cross_validation, render_predictions, AnalysisReport, ClusteringReport, FilterReport,
    FilterSummary, ModelReport, SplitReport,
};
use liftfit::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_count, print_indented, print_info, print_step_header, print_step_time,
    print_success,
};

fn main() -> Result<()> {
    env_logger::init();

    let config = Cli::parse().into_config();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&config);

    // Step 1: Load dataset
    print_step_header(1, "Load Dataset");
    let step_start = Instant::now();
    let spinner = create_spinner("Reading CSV...");
    let (df, rows, cols, memory_mb) =
        load_dataset(&config.input, &config.label, config.infer_schema_length)?;
    finish_with_success(&spinner, "Dataset loaded");

    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);
    print_step_time(step_start.elapsed());

    // Step 2: Stratified split
    print_step_header(2, "Stratified Partition");
    let step_start = Instant::now();
    let split = stratified_split(&df, &config.label, config.train_fraction, config.seed)?;
    drop(df);
    print_success(&format!(
        "{} training rows / {} test rows (p = {:.2}, seed = {})",
        split.train_rows.len(),
        split.test_rows.len(),
        config.train_fraction,
        config.seed
    ));
    print_step_time(step_start.elapsed());

    // Step 3: Predictor filter, decided on the training rows only
    print_step_header(3, "Predictor Filter");
    let step_start = Instant::now();
    let spinner = create_spinner("Filtering predictors...");
    let filter_config = FilterConfig::new(config.label.clone())
        .with_excluded(config.excluded.clone())
        .with_cutoff(config.correlation_cutoff);
    let outcome = filter_predictors(&split.train, &filter_config)?;
    let test = outcome.apply_to(&split.test)?;
    finish_with_success(&spinner, "Predictor filter complete");

    if outcome.correlated_pairs.is_empty() {
        print_info("No highly correlated predictor pairs found");
    } else {
        print_count(
            "correlated pair(s)",
            outcome.correlated_pairs.len(),
            Some(&format!("(>{:.2})", config.correlation_cutoff)),
        );
    }

    let initial_features = split.train.width().saturating_sub(1);
    FilterSummary::new(initial_features, &outcome).display();
    print_step_time(step_start.elapsed());

    let mut report = config.report.as_ref().map(|_| {
        AnalysisReport::new(
            &config,
            SplitReport::new(&split),
            FilterReport::new(&outcome, config.correlation_cutoff),
        )
    });

    // Step 4: k-means baseline
    print_step_header(4, "K-Means Baseline");
    let step_start = Instant::now();
    let clustering = run_clustering(&outcome, &config)?;
    if let Some(report) = report.as_mut() {
        report.set_clustering(clustering);
    }
    print_step_time(step_start.elapsed());

    // Step 5: Cross-validated training
    print_step_header(5, "Cross-Validated Training");
    let step_start = Instant::now();
    let mut models: Vec<TrainedModel> = Vec::with_capacity(ModelMethod::ALL.len());
    for method in ModelMethod::ALL {
        let train_config = TrainConfig::new(method, config.seed)
            .with_folds(config.folds)
            .with_forest_trees(config.forest_trees);
        let model = train_model(&outcome.table, &config.label, &outcome.predictors, &train_config)?;

        println!();
        println!(
            "    {} {}",
            style("🔁").cyan(),
            style(format!(
                "{} - {}-FOLD CROSS-VALIDATION",
                method.title().to_uppercase(),
                model.cross_validation.folds
            ))
            .white()
            .bold()
        );
        println!();
        print_indented(&render_cross_validation(&model));
        models.push(model);
    }
    print_step_time(step_start.elapsed());

    // Step 6: Hold-out evaluation
    print_step_header(6, "Hold-Out Evaluation");
    let step_start = Instant::now();
    let mut evaluations: Vec<Evaluation> = Vec::with_capacity(models.len());
    for model in &models {
        let evaluation = evaluate(model, &test, &config.label)?;
        display_evaluation(&evaluation);
        if let Some(report) = report.as_mut() {
            report.add_model(ModelReport::new(model, &evaluation));
        }
        evaluations.push(evaluation);
    }

    println!();
    print_indented(&render_accuracy_comparison(&evaluations));
    print_step_time(step_start.elapsed());

    // Optional: score an unlabeled table with the most accurate model
    if let Some(score_path) = &config.score {
        print_step_header(7, "Score Unlabeled Cases");
        let step_start = Instant::now();
        let best = best_model(&models, &evaluations);
        let spinner = create_spinner("Scoring...");
        let unlabeled = read_csv(score_path, config.infer_schema_length)?;
        let projected = outcome.apply_predictors(&unlabeled)?;
        let predictions = best.predict_labels(&projected)?;
        finish_with_success(
            &spinner,
            &format!(
                "Scored {} row(s) with {}",
                predictions.len(),
                best.method.title()
            ),
        );
        println!();
        print_indented(&render_predictions(&predictions));
        print_step_time(step_start.elapsed());
    }

    if let (Some(report), Some(path)) = (report, &config.report) {
        let spinner = create_spinner("Writing analysis report...");
        export_analysis_report(&report, path)?;
        finish_with_success(&spinner, &format!("Report saved to {}", path.display()));
    }

    print_completion();

    Ok(())
}

/// Cluster the standardised training predictors and chart them against the label.
fn run_clustering(outcome: &FilterOutcome, config: &PipelineConfig) -> Result<ClusteringReport> {
    let spinner = create_spinner(&format!("Clustering into {} groups...", config.clusters));
    let data = LabeledData::from_frame(&outcome.table, &outcome.predictors, &outcome.label)?;
    let x = data.features.standardized();
    let result = fit_kmeans(&x, KMeansConfig::new(config.clusters, config.seed))?;

    let message = format!(
        "k-means finished after {} iteration(s), within-cluster SS {:.1}",
        result.iterations, result.inertia
    );
    if result.converged {
        finish_with_success(&spinner, &message);
    } else {
        finish_with_warning(&spinner, &format!("{} (not converged)", message));
    }

    let cross_tab = ClusterCrossTab::new(
        &result.assignments,
        config.clusters,
        &data.labels,
        &data.label_set,
    );
    display_cluster_charts(&cross_tab);

    Ok(ClusteringReport::new(&result, &cross_tab))
}

/// Model with the highest hold-out accuracy; the first listed wins ties.
fn best_model<'a>(models: &'a [TrainedModel], evaluations: &[Evaluation]) -> &'a TrainedModel {
    let best = evaluations
        .iter()
        .enumerate()
        .fold(0, |best, (i, e)| {
            if e.accuracy > evaluations[best].accuracy {
                i
            } else {
                best
            }
        });
    &models[best]
}

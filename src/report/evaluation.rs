//! Terminal rendering of cross-validation results and confusion matrices

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::model::TrainedModel;
use crate::pipeline::{ConfusionMatrix, Evaluation};
use crate::utils::print_indented;

fn format_rate(rate: Option<f64>) -> String {
    rate.map_or_else(|| "-".to_string(), |r| format!("{:.4}", r))
}

/// Table of tuning candidates with per-fold and mean accuracy.
pub fn render_cross_validation(model: &TrainedModel) -> String {
    let cv = &model.cross_validation;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);

    let mut header = vec![Cell::new("Candidate").add_attribute(Attribute::Bold)];
    for f in 0..cv.folds {
        header.push(Cell::new(format!("Fold {}", f + 1)).add_attribute(Attribute::Bold));
    }
    header.push(Cell::new("Mean").add_attribute(Attribute::Bold));
    table.set_header(header);

    for (i, candidate) in cv.candidates.iter().enumerate() {
        let selected = i == cv.best;
        let mut row = vec![Cell::new(candidate.params.to_string())];
        for acc in &candidate.fold_accuracy {
            row.push(Cell::new(format!("{:.4}", acc)).set_alignment(CellAlignment::Right));
        }
        let mean = Cell::new(format!("{:.4}", candidate.mean_accuracy))
            .set_alignment(CellAlignment::Right);
        row.push(if selected {
            mean.fg(Color::Green).add_attribute(Attribute::Bold)
        } else {
            mean
        });
        table.add_row(row);
    }

    table.to_string()
}

/// Confusion matrix with actual categories as rows and predictions as columns.
pub fn render_confusion_matrix(confusion: &ConfusionMatrix) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);

    let mut header = vec![Cell::new("Actual \\ Predicted").add_attribute(Attribute::Bold)];
    header.extend(
        confusion
            .categories
            .iter()
            .map(|c| Cell::new(c).add_attribute(Attribute::Bold)),
    );
    table.set_header(header);

    for (i, category) in confusion.categories.iter().enumerate() {
        let mut row = vec![Cell::new(category).add_attribute(Attribute::Bold)];
        for (j, &count) in confusion.counts[i].iter().enumerate() {
            let cell = Cell::new(count).set_alignment(CellAlignment::Right);
            row.push(if i == j {
                cell.fg(Color::Green)
            } else if count > 0 {
                cell.fg(Color::Red)
            } else {
                cell
            });
        }
        table.add_row(row);
    }

    table.to_string()
}

/// Per-class sensitivity and precision
pub fn render_class_stats(evaluation: &Evaluation) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Class").add_attribute(Attribute::Bold),
        Cell::new("Support").add_attribute(Attribute::Bold),
        Cell::new("Sensitivity").add_attribute(Attribute::Bold),
        Cell::new("Precision").add_attribute(Attribute::Bold),
    ]);

    for stats in &evaluation.class_stats {
        table.add_row(vec![
            Cell::new(&stats.category),
            Cell::new(stats.support).set_alignment(CellAlignment::Right),
            Cell::new(format_rate(stats.sensitivity)).set_alignment(CellAlignment::Right),
            Cell::new(format_rate(stats.precision)).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

/// Print the full evaluation block for one model
pub fn display_evaluation(evaluation: &Evaluation) {
    println!();
    println!(
        "    {} {}",
        style("🧮").cyan(),
        style(format!(
            "{} - CONFUSION MATRIX",
            evaluation.method.title().to_uppercase()
        ))
        .white()
        .bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    println!();
    print_indented(&render_confusion_matrix(&evaluation.confusion));
    println!();
    print_indented(&render_class_stats(evaluation));
    println!();
    println!(
        "      Accuracy: {}   Kappa: {}   ({}/{} test rows)",
        style(format!("{:.4}", evaluation.accuracy)).green().bold(),
        style(format!("{:.4}", evaluation.kappa)).cyan(),
        evaluation.confusion.correct(),
        evaluation.confusion.total()
    );
}

/// Side-by-side accuracy comparison of every evaluated model
pub fn render_accuracy_comparison(evaluations: &[Evaluation]) -> String {
    let best = evaluations
        .iter()
        .map(|e| e.accuracy)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Model").add_attribute(Attribute::Bold),
        Cell::new("Accuracy").add_attribute(Attribute::Bold),
        Cell::new("Out-of-sample error").add_attribute(Attribute::Bold),
        Cell::new("Kappa").add_attribute(Attribute::Bold),
    ]);

    for e in evaluations {
        let acc = Cell::new(format!("{:.4}", e.accuracy)).set_alignment(CellAlignment::Right);
        table.add_row(vec![
            Cell::new(e.method.title()),
            if e.accuracy == best {
                acc.fg(Color::Green).add_attribute(Attribute::Bold)
            } else {
                acc
            },
            Cell::new(format!("{:.4}", 1.0 - e.accuracy)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.4}", e.kappa)).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

/// Numbered predictions for an unlabeled table
pub fn render_predictions(predictions: &[String]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Row").add_attribute(Attribute::Bold),
        Cell::new("Predicted").add_attribute(Attribute::Bold),
    ]);
    for (i, label) in predictions.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1).set_alignment(CellAlignment::Right),
            Cell::new(label).fg(Color::Cyan),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::LabelSet;

    #[test]
    fn test_confusion_table_lists_categories() {
        let set = LabelSet::from_values(&["A".to_string(), "B".to_string()]);
        let cm = ConfusionMatrix::new(&set, &[0, 1, 1], &[0, 1, 0]);
        let rendered = render_confusion_matrix(&cm);
        assert!(rendered.contains("Actual \\ Predicted"));
        assert!(rendered.contains('A'));
        assert!(rendered.contains('B'));
    }

    #[test]
    fn test_predictions_numbered_from_one() {
        let rendered = render_predictions(&["B".to_string(), "A".to_string()]);
        assert!(rendered.contains("Predicted"));
        assert!(rendered.lines().any(|l| l.contains('1') && l.contains('B')));
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(None), "-");
        assert_eq!(format_rate(Some(0.5)), "0.5000");
    }
}

//! Predictor filter summary

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::FilterOutcome;
use crate::utils::print_indented;

/// Summary of the predictor filtering step
#[derive(Debug, Default)]
pub struct FilterSummary {
    pub initial_features: usize,
    pub final_features: usize,
    pub dropped_excluded: Vec<String>,
    pub dropped_textual: Vec<String>,
    pub dropped_missing: Vec<String>,
    pub dropped_correlation: Vec<String>,
}

impl FilterSummary {
    /// `initial_features` counts every column except the label.
    pub fn new(initial_features: usize, outcome: &FilterOutcome) -> Self {
        Self {
            initial_features,
            final_features: outcome.predictors.len(),
            dropped_excluded: outcome.dropped_excluded.clone(),
            dropped_textual: outcome.dropped_textual.clone(),
            dropped_missing: outcome.dropped_missing.clone(),
            dropped_correlation: outcome.dropped_correlation.clone(),
        }
    }

    fn stages(&self) -> [(&'static str, &[String]); 4] {
        [
            ("🏷️  Dropped (Excluded)", self.dropped_excluded.as_slice()),
            ("🔤 Dropped (Textual)", self.dropped_textual.as_slice()),
            ("🗑️  Dropped (Missing)", self.dropped_missing.as_slice()),
            ("🔗 Dropped (Correlation)", self.dropped_correlation.as_slice()),
        ]
    }

    pub fn render_table(&self) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new("📁 Initial Features"),
            Cell::new(self.initial_features),
        ]);

        for (title, dropped) in self.stages() {
            table.add_row(vec![
                Cell::new(title),
                Cell::new(dropped.len()).fg(if dropped.is_empty() {
                    Color::White
                } else {
                    Color::Red
                }),
            ]);
        }

        table.add_row(vec![
            Cell::new("✅ Final Predictors"),
            Cell::new(self.final_features)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);

        let reduction_pct = if self.initial_features > 0 {
            (self.initial_features.saturating_sub(self.final_features) as f64
                / self.initial_features as f64)
                * 100.0
        } else {
            0.0
        };

        table.add_row(vec![
            Cell::new("📉 Reduction"),
            Cell::new(format!("{:.1}%", reduction_pct))
                .fg(Color::Cyan)
                .add_attribute(Attribute::Bold),
        ]);

        table.to_string()
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("PREDICTOR FILTER SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        print_indented(&self.render_table());

        // Textual and missing-value drops can run to a hundred columns, so
        // only the correlation drops are listed by name
        if !self.dropped_correlation.is_empty() {
            println!();
            println!(
                "      {} {}:",
                style("High Correlation").yellow(),
                style(format!("({})", self.dropped_correlation.len())).dim()
            );
            for feature in &self.dropped_correlation {
                println!("        {} {}", style("•").dim(), feature);
            }
        }
    }
}

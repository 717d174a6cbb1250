//! Cluster-versus-label bar charts for the k-means baseline
//!
//! Two stacked horizontal bar charts are drawn in the terminal: one bar per
//! cluster split by label, and one bar per label split by cluster.

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Table};
use console::{style, Color};

use crate::model::ClusterCrossTab;
use crate::utils::print_indented;

/// Width of a full bar in characters
const BAR_WIDTH: usize = 40;

const PALETTE: [Color; 6] = [
    Color::Cyan,
    Color::Magenta,
    Color::Yellow,
    Color::Green,
    Color::Blue,
    Color::Red,
];

const GLYPHS: [char; 6] = ['█', '▓', '▒', '░', '▚', '▞'];

/// Split `width` characters across `counts` proportionally using largest
/// remainders, so the segments always add up to `width` for a non-empty bar.
pub fn segment_widths(counts: &[usize], width: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }

    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * width as f64 / total as f64)
        .collect();
    let mut widths: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();
    let mut remaining = width - widths.iter().sum::<usize>();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });
    for i in order {
        if remaining == 0 {
            break;
        }
        widths[i] += 1;
        remaining -= 1;
    }

    widths
}

fn render_bar(counts: &[usize], colored: bool) -> String {
    segment_widths(counts, BAR_WIDTH)
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            let segment: String = std::iter::repeat(GLYPHS[i % GLYPHS.len()]).take(w).collect();
            if colored {
                style(segment).fg(PALETTE[i % PALETTE.len()]).to_string()
            } else {
                segment
            }
        })
        .collect()
}

fn render_legend(names: &[String], colored: bool) -> String {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let swatch = GLYPHS[i % GLYPHS.len()].to_string();
            let swatch = if colored {
                style(swatch).fg(PALETTE[i % PALETTE.len()]).to_string()
            } else {
                swatch
            };
            format!("{} {}", swatch, name)
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn cluster_name(cluster: usize) -> String {
    format!("Cluster {}", cluster + 1)
}

/// One bar per cluster, segmented by label category.
pub fn render_cluster_composition(tab: &ClusterCrossTab, colored: bool) -> String {
    let mut lines = Vec::with_capacity(tab.n_clusters() + 2);
    for c in 0..tab.n_clusters() {
        lines.push(format!(
            "{:<10} │{}│ {}",
            cluster_name(c),
            render_bar(&tab.counts[c], colored),
            tab.cluster_total(c)
        ));
    }
    lines.push(String::new());
    lines.push(format!("Label: {}", render_legend(&tab.categories, colored)));
    lines.join("\n")
}

/// One bar per label category, segmented by cluster.
pub fn render_label_spread(tab: &ClusterCrossTab, colored: bool) -> String {
    let clusters: Vec<String> = (0..tab.n_clusters()).map(cluster_name).collect();
    let mut lines = Vec::with_capacity(tab.categories.len() + 2);
    for (k, category) in tab.categories.iter().enumerate() {
        let counts: Vec<usize> = tab.counts.iter().map(|row| row[k]).collect();
        lines.push(format!(
            "{:<10} │{}│ {}",
            category,
            render_bar(&counts, colored),
            tab.category_total(k)
        ));
    }
    lines.push(String::new());
    lines.push(format!("Cluster: {}", render_legend(&clusters, colored)));
    lines.join("\n")
}

/// Cross-tab as a table of counts
pub fn render_cross_tab(tab: &ClusterCrossTab) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);

    let mut header = vec![Cell::new("Cluster").add_attribute(Attribute::Bold)];
    header.extend(
        tab.categories
            .iter()
            .map(|c| Cell::new(c).add_attribute(Attribute::Bold)),
    );
    header.push(Cell::new("Total").add_attribute(Attribute::Bold));
    table.set_header(header);

    for (c, row) in tab.counts.iter().enumerate() {
        let mut cells = vec![Cell::new(c + 1)];
        cells.extend(
            row.iter()
                .map(|&n| Cell::new(n).set_alignment(CellAlignment::Right)),
        );
        cells.push(Cell::new(tab.cluster_total(c)).set_alignment(CellAlignment::Right));
        table.add_row(cells);
    }

    table.to_string()
}

/// Print the cross-tab and both charts
pub fn display_cluster_charts(tab: &ClusterCrossTab) {
    println!();
    print_indented(&render_cross_tab(tab));

    println!();
    println!(
        "    {} {}",
        style("📊").cyan(),
        style("CLUSTER COMPOSITION BY LABEL").white().bold()
    );
    println!();
    print_indented(&render_cluster_composition(tab, true));

    println!();
    println!(
        "    {} {}",
        style("📊").cyan(),
        style("LABEL SPREAD ACROSS CLUSTERS").white().bold()
    );
    println!();
    print_indented(&render_label_spread(tab, true));

    println!();
    println!(
        "      Cluster purity: {}",
        style(format!("{:.4}", tab.purity())).yellow().bold()
    );
}

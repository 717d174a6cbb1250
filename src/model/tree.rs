//! CART decision trees over quantile-binned predictors
//!
//! Both ensembles share the same machinery: predictors are first cut into at
//! most `MAX_BINS` quantile bins, then each node scans per-bin histograms to
//! find the best threshold. Classification trees minimise Gini impurity,
//! regression trees minimise squared error.

use rand::rngs::StdRng;
use rand::seq::index::sample;

use crate::pipeline::FeatureMatrix;

/// Maximum number of bins per predictor
pub const MAX_BINS: usize = 64;

/// Minimum impurity decrease for a split to be accepted
const MIN_GAIN: f64 = 1e-12;

/// Bin thresholds and per-row bin codes for every predictor.
///
/// A value `v` falls in bin `b` where `b` is the number of thresholds strictly
/// below `v`, so "bin <= b" is equivalent to "v <= thresholds[b]".
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    thresholds: Vec<Vec<f64>>,
    /// Column-major: `codes[feature * n_rows + row]`
    codes: Vec<u8>,
    n_rows: usize,
}

impl BinnedMatrix {
    pub fn new(x: &FeatureMatrix, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, 256);
        let n_rows = x.n_rows();
        let mut thresholds = Vec::with_capacity(x.n_cols());
        let mut codes = Vec::with_capacity(x.n_cols() * n_rows);

        for f in 0..x.n_cols() {
            let column: Vec<f64> = x.rows().map(|r| r[f]).collect();
            let cuts = bin_thresholds(&column, max_bins);
            codes.extend(column.iter().map(|&v| bin_of(&cuts, v) as u8));
            thresholds.push(cuts);
        }

        Self {
            thresholds,
            codes,
            n_rows,
        }
    }

    pub fn n_features(&self) -> usize {
        self.thresholds.len()
    }

    fn n_bins(&self, feature: usize) -> usize {
        self.thresholds[feature].len() + 1
    }

    fn code(&self, feature: usize, row: usize) -> usize {
        self.codes[feature * self.n_rows + row] as usize
    }

    fn threshold(&self, feature: usize, bin: usize) -> f64 {
        self.thresholds[feature][bin]
    }
}

/// Quantile cut points, taken as midpoints between adjacent distinct values.
/// Columns with few distinct values get a cut between every pair of them.
fn bin_thresholds(values: &[f64], max_bins: usize) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut distinct = sorted.clone();
    distinct.dedup();

    if distinct.len() <= max_bins {
        return distinct.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    }

    let n = sorted.len();
    let mut cuts: Vec<f64> = Vec::with_capacity(max_bins - 1);
    for q in 1..max_bins {
        let lower = sorted[(q * n / max_bins).saturating_sub(1)];
        let next = sorted.partition_point(|&v| v <= lower);
        if next < n {
            let cut = (lower + sorted[next]) / 2.0;
            if cuts.last().map_or(true, |&last| cut > last) {
                cuts.push(cut);
            }
        }
    }
    cuts
}

fn bin_of(thresholds: &[f64], value: f64) -> usize {
    thresholds.partition_point(|&t| t < value)
}

#[derive(Debug, Clone)]
enum Node<T> {
    Leaf(T),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Binary decision tree stored as a flat node arena; node 0 is the root.
#[derive(Debug, Clone)]
pub struct DecisionTree<T> {
    nodes: Vec<Node<T>>,
}

impl<T: Copy> DecisionTree<T> {
    pub fn predict(&self, row: &[f64]) -> T {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk<T>(nodes: &[Node<T>], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Candidate split found by a histogram scan
#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    bin: usize,
    gain: f64,
}

fn partition_rows(binned: &BinnedMatrix, rows: &[usize], split: Split) -> (Vec<usize>, Vec<usize>) {
    rows.iter()
        .copied()
        .partition(|&r| binned.code(split.feature, r) <= split.bin)
}

// ============================================================================
// Classification
// ============================================================================

/// Gini impurity scaled by node size: `n - sum(c^2) / n`. Lower is purer.
fn scaled_gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let sum_sq: f64 = counts.iter().map(|&c| (c * c) as f64).sum();
    n as f64 - sum_sq / n as f64
}

fn class_counts(labels: &[usize], rows: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0; n_classes];
    for &r in rows {
        counts[labels[r]] += 1;
    }
    counts
}

/// Most frequent class; ties go to the lowest class index.
pub fn majority_class(counts: &[usize]) -> usize {
    counts
        .iter()
        .enumerate()
        .fold((0, 0), |(best, best_count), (class, &count)| {
            if count > best_count {
                (class, count)
            } else {
                (best, best_count)
            }
        })
        .0
}

fn best_gini_split(
    binned: &BinnedMatrix,
    labels: &[usize],
    rows: &[usize],
    features: &[usize],
    n_classes: usize,
) -> Option<Split> {
    let n = rows.len();
    let parent_counts = class_counts(labels, rows, n_classes);
    let parent = scaled_gini(&parent_counts, n);

    let mut best: Option<Split> = None;

    for &f in features {
        let n_bins = binned.n_bins(f);
        let mut hist = vec![0usize; n_bins * n_classes];
        for &r in rows {
            hist[binned.code(f, r) * n_classes + labels[r]] += 1;
        }

        let mut left = vec![0usize; n_classes];
        let mut left_n = 0;
        for b in 0..n_bins - 1 {
            for k in 0..n_classes {
                left[k] += hist[b * n_classes + k];
            }
            left_n += hist[b * n_classes..(b + 1) * n_classes].iter().sum::<usize>();
            if left_n == 0 {
                continue;
            }
            if left_n == n {
                break;
            }

            let right: Vec<usize> = parent_counts
                .iter()
                .zip(&left)
                .map(|(p, l)| p - l)
                .collect();
            let gain = parent - scaled_gini(&left, left_n) - scaled_gini(&right, n - left_n);

            if gain > MIN_GAIN && best.map_or(true, |s| gain > s.gain) {
                best = Some(Split {
                    feature: f,
                    bin: b,
                    gain,
                });
            }
        }
    }

    best
}

/// Settings for growing one classification tree
#[derive(Debug, Clone, Copy)]
pub struct ClassificationTreeParams {
    /// Predictors sampled per split; `None` considers all of them
    pub mtry: Option<usize>,
    /// Nodes with fewer rows become leaves
    pub min_node_size: usize,
    pub max_depth: Option<usize>,
}

impl Default for ClassificationTreeParams {
    fn default() -> Self {
        Self {
            mtry: None,
            min_node_size: 1,
            max_depth: None,
        }
    }
}

struct ClassificationBuilder<'a> {
    binned: &'a BinnedMatrix,
    labels: &'a [usize],
    n_classes: usize,
    params: ClassificationTreeParams,
    rng: &'a mut StdRng,
    nodes: Vec<Node<usize>>,
}

impl ClassificationBuilder<'_> {
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let counts = class_counts(self.labels, &rows, self.n_classes);
        let majority = majority_class(&counts);
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf(majority));

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let too_small = rows.len() <= self.params.min_node_size.max(1);
        let too_deep = self.params.max_depth.is_some_and(|d| depth >= d);
        if pure || too_small || too_deep {
            return idx;
        }

        let n_features = self.binned.n_features();
        let features: Vec<usize> = match self.params.mtry {
            Some(m) if m < n_features => sample(&mut *self.rng, n_features, m.max(1)).into_vec(),
            _ => (0..n_features).collect(),
        };

        let Some(split) = best_gini_split(self.binned, self.labels, &rows, &features, self.n_classes)
        else {
            return idx;
        };

        let (left_rows, right_rows) = partition_rows(self.binned, &rows, split);
        drop(rows);
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);

        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: self.binned.threshold(split.feature, split.bin),
            left,
            right,
        };
        idx
    }
}

/// Grow a Gini classification tree on `rows` (which may repeat, as in a
/// bootstrap sample).
pub fn fit_classification_tree(
    binned: &BinnedMatrix,
    labels: &[usize],
    n_classes: usize,
    rows: Vec<usize>,
    params: ClassificationTreeParams,
    rng: &mut StdRng,
) -> DecisionTree<usize> {
    let mut builder = ClassificationBuilder {
        binned,
        labels,
        n_classes,
        params,
        rng,
        nodes: Vec::new(),
    };
    builder.grow(rows, 0);
    DecisionTree {
        nodes: builder.nodes,
    }
}

// ============================================================================
// Regression
// ============================================================================

fn best_squared_error_split(
    binned: &BinnedMatrix,
    targets: &[f64],
    rows: &[usize],
    min_leaf: usize,
) -> Option<Split> {
    let n = rows.len();
    let total: f64 = rows.iter().map(|&r| targets[r]).sum();
    let parent = total * total / n as f64;

    let mut best: Option<Split> = None;

    for f in 0..binned.n_features() {
        let n_bins = binned.n_bins(f);
        let mut sums = vec![0.0; n_bins];
        let mut counts = vec![0usize; n_bins];
        for &r in rows {
            let b = binned.code(f, r);
            sums[b] += targets[r];
            counts[b] += 1;
        }

        let mut left_sum = 0.0;
        let mut left_n = 0;
        for b in 0..n_bins - 1 {
            left_sum += sums[b];
            left_n += counts[b];
            let right_n = n - left_n;
            if left_n < min_leaf {
                continue;
            }
            if right_n < min_leaf {
                break;
            }

            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64
                - parent;

            if gain > MIN_GAIN && best.map_or(true, |s| gain > s.gain) {
                best = Some(Split {
                    feature: f,
                    bin: b,
                    gain,
                });
            }
        }
    }

    best
}

struct RegressionBuilder<'a, F> {
    binned: &'a BinnedMatrix,
    targets: &'a [f64],
    max_depth: usize,
    min_leaf: usize,
    leaf_value: F,
    nodes: Vec<Node<f64>>,
}

impl<F: Fn(&[usize]) -> f64> RegressionBuilder<'_, F> {
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf((self.leaf_value)(&rows)));

        if depth >= self.max_depth || rows.len() < 2 * self.min_leaf.max(1) {
            return idx;
        }

        let Some(split) = best_squared_error_split(self.binned, self.targets, &rows, self.min_leaf.max(1))
        else {
            return idx;
        };

        let (left_rows, right_rows) = partition_rows(self.binned, &rows, split);
        drop(rows);
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);

        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: self.binned.threshold(split.feature, split.bin),
            left,
            right,
        };
        idx
    }
}

/// Grow a least-squares regression tree of at most `max_depth` levels.
///
/// Splits are chosen on squared error of `targets`; leaf outputs come from
/// `leaf_value` applied to the rows reaching the leaf.
pub fn fit_regression_tree<F>(
    binned: &BinnedMatrix,
    targets: &[f64],
    rows: Vec<usize>,
    max_depth: usize,
    min_leaf: usize,
    leaf_value: F,
) -> DecisionTree<f64>
where
    F: Fn(&[usize]) -> f64,
{
    let mut builder = RegressionBuilder {
        binned,
        targets,
        max_depth,
        min_leaf,
        leaf_value,
        nodes: Vec::new(),
    };
    builder.grow(rows, 0);
    DecisionTree {
        nodes: builder.nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn matrix(rows: &[Vec<f64>]) -> FeatureMatrix {
        let names = (0..rows[0].len()).map(|i| format!("f{}", i)).collect();
        FeatureMatrix::from_rows(names, rows)
    }

    #[test]
    fn test_bin_thresholds_exact_for_few_values() {
        assert_eq!(bin_thresholds(&[3.0, 1.0, 2.0, 1.0], 8), vec![1.5, 2.5]);
    }

    #[test]
    fn test_bin_thresholds_quantile_capped() {
        let values: Vec<f64> = (0..1000).map(|v| v as f64).collect();
        let cuts = bin_thresholds(&values, 10);
        assert!(cuts.len() <= 9);
        assert!(cuts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_bin_codes_match_thresholds() {
        let cuts = vec![1.5, 2.5];
        assert_eq!(bin_of(&cuts, 1.0), 0);
        assert_eq!(bin_of(&cuts, 2.0), 1);
        assert_eq!(bin_of(&cuts, 9.0), 2);
    }

    #[test]
    fn test_majority_class_ties_low() {
        assert_eq!(majority_class(&[2, 3, 3]), 1);
        assert_eq!(majority_class(&[0, 0, 0]), 0);
    }

    #[test]
    fn test_classification_tree_separates_classes() {
        let x = matrix(&[
            vec![1.0, 0.0],
            vec![2.0, 1.0],
            vec![3.0, 0.0],
            vec![10.0, 1.0],
            vec![11.0, 0.0],
            vec![12.0, 1.0],
        ]);
        let y = vec![0, 0, 0, 1, 1, 1];
        let binned = BinnedMatrix::new(&x, MAX_BINS);
        let mut rng = StdRng::seed_from_u64(1);
        let tree = fit_classification_tree(
            &binned,
            &y,
            2,
            (0..6).collect(),
            ClassificationTreeParams::default(),
            &mut rng,
        );

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict(&[0.0, 5.0]), 0);
        assert_eq!(tree.predict(&[20.0, 5.0]), 1);
    }

    #[test]
    fn test_regression_tree_respects_depth_and_leaf_size() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let x = matrix(&rows);
        let targets: Vec<f64> = (0..20).map(|i| if i < 10 { -1.0 } else { 1.0 }).collect();
        let binned = BinnedMatrix::new(&x, MAX_BINS);
        let mean = |rows: &[usize]| rows.iter().map(|&r| targets[r]).sum::<f64>() / rows.len() as f64;

        let tree = fit_regression_tree(&binned, &targets, (0..20).collect(), 1, 3, mean);
        assert_eq!(tree.depth(), 1);
        assert!((tree.predict(&[2.0]) + 1.0).abs() < 1e-12);
        assert!((tree.predict(&[15.0]) - 1.0).abs() < 1e-12);

        // min_leaf larger than half the rows prevents any split
        let stump = fit_regression_tree(&binned, &targets, (0..20).collect(), 3, 11, mean);
        assert_eq!(stump.depth(), 0);
    }
}

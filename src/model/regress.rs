//! Regression primitives: CART trees, a bagged forest, gradient boosting,
//! and a ridge model on standardized features.
//!
//! All fitting is seeded, so repeated training over the same rows yields
//! the same artifact bytes.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Seed for splits, bootstraps, and anything else stochastic in training.
pub const TRAINING_SEED: u64 = 42;

const FOREST_ESTIMATORS: usize = 100;
const FOREST_MAX_DEPTH: usize = 12;
const FOREST_MIN_LEAF: usize = 2;

const BOOST_ESTIMATORS: usize = 100;
const BOOST_MAX_DEPTH: usize = 3;
const BOOST_MIN_LEAF: usize = 1;
const BOOST_LEARNING_RATE: f64 = 0.1;

const RIDGE_ALPHA: f64 = 1.0;

/// Column-wise standardizer. Constant columns pass through unscaled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let n = rows.len().max(1) as f64;
        let mut means = vec![0.0; cols];
        for row in rows {
            for (c, v) in row.iter().enumerate() {
                means[c] += v;
            }
        }
        for m in means.iter_mut() {
            *m /= n;
        }
        let mut stds = vec![0.0; cols];
        for row in rows {
            for (c, v) in row.iter().enumerate() {
                stds[c] += (v - means[c]).powi(2);
            }
        }
        for s in stds.iter_mut() {
            *s = (*s / n).sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }
        StandardScaler { means, stds }
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .map(|(c, v)| (v - self.means[c]) / self.stds[c])
            .collect()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A variance-reduction regression tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Node,
}

impl RegressionTree {
    pub fn fit(
        rows: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        max_depth: usize,
        min_leaf: usize,
    ) -> Self {
        RegressionTree {
            root: grow(rows, targets, indices, max_depth, min_leaf),
        }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row.get(*feature).copied().unwrap_or(0.0) <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

fn mean_of(targets: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| targets[i]).sum::<f64>() / indices.len() as f64
}

fn grow(
    rows: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    depth: usize,
    min_leaf: usize,
) -> Node {
    if depth == 0 || indices.len() < 2 * min_leaf {
        return Node::Leaf {
            value: mean_of(targets, indices),
        };
    }
    match best_split(rows, targets, indices, min_leaf) {
        Some((feature, threshold, left_idx, right_idx)) => Node::Split {
            feature,
            threshold,
            left: Box::new(grow(rows, targets, &left_idx, depth - 1, min_leaf)),
            right: Box::new(grow(rows, targets, &right_idx, depth - 1, min_leaf)),
        },
        None => Node::Leaf {
            value: mean_of(targets, indices),
        },
    }
}

/// Best variance-reducing split across all features, or None when no
/// split separates the node.
#[allow(clippy::type_complexity)]
fn best_split(
    rows: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    min_leaf: usize,
) -> Option<(usize, f64, Vec<usize>, Vec<usize>)> {
    let n = indices.len();
    let n_features = rows.first().map(|r| r.len()).unwrap_or(0);
    let total_sum: f64 = indices.iter().map(|&i| targets[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| targets[i] * targets[i]).sum();
    let parent_sse = total_sq - total_sum * total_sum / n as f64;

    let mut best: Option<(f64, usize, f64)> = None; // (gain, feature, threshold)

    for feature in 0..n_features {
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_by(|&a, &b| {
            rows[a][feature]
                .partial_cmp(&rows[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for split_at in 1..n {
            let i = sorted[split_at - 1];
            left_sum += targets[i];
            left_sq += targets[i] * targets[i];

            if split_at < min_leaf || n - split_at < min_leaf {
                continue;
            }
            let lo = rows[sorted[split_at - 1]][feature];
            let hi = rows[sorted[split_at]][feature];
            if lo == hi {
                continue;
            }

            let left_n = split_at as f64;
            let right_n = (n - split_at) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / left_n)
                + (right_sq - right_sum * right_sum / right_n);
            let gain = parent_sse - sse;
            if gain > 1e-12 && best.map(|(g, _, _)| gain > g).unwrap_or(true) {
                best = Some((gain, feature, (lo + hi) / 2.0));
            }
        }
    }

    let (_, feature, threshold) = best?;
    let mut left_idx = Vec::new();
    let mut right_idx = Vec::new();
    for &i in indices {
        if rows[i][feature] <= threshold {
            left_idx.push(i);
        } else {
            right_idx.push(i);
        }
    }
    if left_idx.is_empty() || right_idx.is_empty() {
        return None;
    }
    Some((feature, threshold, left_idx, right_idx))
}

/// Bagged ensemble of full-depth trees over bootstrap samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaggedForest {
    trees: Vec<RegressionTree>,
}

impl BaggedForest {
    pub fn fit(rows: &[Vec<f64>], targets: &[f64], seed: u64) -> Self {
        let n = rows.len();
        let trees: Vec<RegressionTree> = (0..FOREST_ESTIMATORS)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(rows, targets, &sample, FOREST_MAX_DEPTH, FOREST_MIN_LEAF)
            })
            .collect();
        BaggedForest { trees }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }
}

/// Gradient-boosted shallow trees with shrinkage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoost {
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoost {
    pub fn fit(rows: &[Vec<f64>], targets: &[f64]) -> Self {
        let n = rows.len();
        let init = if n == 0 {
            0.0
        } else {
            targets.iter().sum::<f64>() / n as f64
        };
        let all: Vec<usize> = (0..n).collect();
        let mut predictions = vec![init; n];
        let mut trees = Vec::with_capacity(BOOST_ESTIMATORS);
        for _ in 0..BOOST_ESTIMATORS {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&predictions)
                .map(|(y, p)| y - p)
                .collect();
            let tree =
                RegressionTree::fit(rows, &residuals, &all, BOOST_MAX_DEPTH, BOOST_MIN_LEAF);
            for (i, p) in predictions.iter_mut().enumerate() {
                *p += BOOST_LEARNING_RATE * tree.predict(&rows[i]);
            }
            trees.push(tree);
        }
        GradientBoost {
            init,
            learning_rate: BOOST_LEARNING_RATE,
            trees,
        }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.init
            + self.learning_rate
                * self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }
}

/// L2-regularized linear model. Expects standardized input rows; the
/// intercept is the unpenalized target mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeModel {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl RidgeModel {
    /// Fit on already-standardized rows via the normal equations.
    pub fn fit(scaled_rows: &[Vec<f64>], targets: &[f64]) -> Self {
        let n = scaled_rows.len();
        let cols = scaled_rows.first().map(|r| r.len()).unwrap_or(0);
        if n == 0 || cols == 0 {
            return RidgeModel {
                coefficients: vec![0.0; cols],
                intercept: 0.0,
            };
        }
        let intercept = targets.iter().sum::<f64>() / n as f64;

        let flat: Vec<f64> = scaled_rows.iter().flat_map(|r| r.iter().copied()).collect();
        let x = DMatrix::from_row_slice(n, cols, &flat);
        let centered = DVector::from_iterator(n, targets.iter().map(|y| y - intercept));

        let mut gram = x.transpose() * &x;
        for i in 0..cols {
            gram[(i, i)] += RIDGE_ALPHA;
        }
        let rhs = x.transpose() * centered;
        let coefficients = gram
            .cholesky()
            .map(|chol| chol.solve(&rhs))
            .or_else(|| {
                let mut gram = x.transpose() * &x;
                for i in 0..cols {
                    gram[(i, i)] += RIDGE_ALPHA;
                }
                gram.lu().solve(&rhs)
            })
            .map(|beta| beta.iter().copied().collect())
            .unwrap_or_else(|| vec![0.0; cols]);

        RidgeModel {
            coefficients,
            intercept,
        }
    }

    /// Predict from an already-standardized row.
    pub fn predict(&self, scaled_row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(scaled_row)
                .map(|(c, v)| c * v)
                .sum::<f64>()
    }
}

/// The candidate families fitted for every position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateKind {
    Forest,
    Boost,
    Ridge,
}

impl CandidateKind {
    pub fn label(&self) -> &'static str {
        match self {
            CandidateKind::Forest => "rf",
            CandidateKind::Boost => "gb",
            CandidateKind::Ridge => "ridge",
        }
    }
}

/// A fitted regressor of any candidate family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Regressor {
    Forest(BaggedForest),
    Boost(GradientBoost),
    Ridge(RidgeModel),
}

impl Regressor {
    pub fn kind(&self) -> CandidateKind {
        match self {
            Regressor::Forest(_) => CandidateKind::Forest,
            Regressor::Boost(_) => CandidateKind::Boost,
            Regressor::Ridge(_) => CandidateKind::Ridge,
        }
    }

    /// Whether input rows must pass through the stored scaler first.
    pub fn requires_scaler(&self) -> bool {
        matches!(self, Regressor::Ridge(_))
    }

    /// Predict from a raw (unscaled) row; the caller applies the scaler
    /// when `requires_scaler()` says so.
    pub fn predict(&self, row: &[f64]) -> f64 {
        match self {
            Regressor::Forest(forest) => forest.predict(row),
            Regressor::Boost(boost) => boost.predict(row),
            Regressor::Ridge(ridge) => ridge.predict(row),
        }
    }
}

/// Deterministic 80/20 split of row indices.
pub fn train_test_split(n: usize, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let test_len = ((n as f64) * 0.2).round() as usize;
    let test = indices[..test_len].to_vec();
    let train = indices[test_len..].to_vec();
    (train, test)
}

pub fn mean_absolute_error(truth: &[f64], predicted: &[f64]) -> f64 {
    if truth.is_empty() {
        return f64::INFINITY;
    }
    truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / truth.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        // y = 2*x0 - x1 + 5, deterministic pseudo-noise
        let mut rows = Vec::with_capacity(n);
        let mut targets = Vec::with_capacity(n);
        for i in 0..n {
            let x0 = (i % 17) as f64;
            let x1 = (i % 5) as f64;
            let noise = ((i * 31) % 7) as f64 * 0.01;
            rows.push(vec![x0, x1]);
            targets.push(2.0 * x0 - x1 + 5.0 + noise);
        }
        (rows, targets)
    }

    #[test]
    fn test_scaler_round_trip() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 30.0], vec![5.0, 50.0]];
        let scaler = StandardScaler::fit(&rows);
        let scaled = scaler.transform(&rows);
        // Standardized columns are zero-mean.
        for c in 0..2 {
            let mean: f64 = scaled.iter().map(|r| r[c]).sum::<f64>() / 3.0;
            assert!(mean.abs() < 1e-9);
        }
    }

    #[test]
    fn test_scaler_constant_column() {
        let rows = vec![vec![7.0], vec![7.0], vec![7.0]];
        let scaler = StandardScaler::fit(&rows);
        let scaled = scaler.transform_row(&[7.0]);
        assert_eq!(scaled[0], 0.0);
    }

    #[test]
    fn test_tree_fits_step_function() {
        let rows: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..40).map(|i| if i < 20 { 1.0 } else { 9.0 }).collect();
        let all: Vec<usize> = (0..40).collect();
        let tree = RegressionTree::fit(&rows, &targets, &all, 4, 1);
        assert!((tree.predict(&[3.0]) - 1.0).abs() < 1e-9);
        assert!((tree.predict(&[33.0]) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_ridge_recovers_linear_relationship() {
        let (rows, targets) = linear_data(200);
        let scaler = StandardScaler::fit(&rows);
        let scaled = scaler.transform(&rows);
        let ridge = RidgeModel::fit(&scaled, &targets);

        let probe = scaler.transform_row(&[10.0, 2.0]);
        let expected = 2.0 * 10.0 - 2.0 + 5.0;
        assert!((ridge.predict(&probe) - expected).abs() < 0.5);
    }

    #[test]
    fn test_forest_and_boost_fit_reasonably() {
        let (rows, targets) = linear_data(150);
        let forest = BaggedForest::fit(&rows, &targets, TRAINING_SEED);
        let boost = GradientBoost::fit(&rows, &targets);

        let probe = vec![8.0, 3.0];
        let expected = 2.0 * 8.0 - 3.0 + 5.0;
        assert!((forest.predict(&probe) - expected).abs() < 3.0);
        assert!((boost.predict(&probe) - expected).abs() < 3.0);
    }

    #[test]
    fn test_forest_fit_is_deterministic() {
        let (rows, targets) = linear_data(80);
        let a = BaggedForest::fit(&rows, &targets, TRAINING_SEED);
        let b = BaggedForest::fit(&rows, &targets, TRAINING_SEED);
        for probe in [vec![1.0, 1.0], vec![9.0, 4.0], vec![16.0, 0.0]] {
            assert_eq!(a.predict(&probe), b.predict(&probe));
        }
    }

    #[test]
    fn test_train_test_split_is_seeded_and_disjoint() {
        let (train_a, test_a) = train_test_split(100, TRAINING_SEED);
        let (train_b, test_b) = train_test_split(100, TRAINING_SEED);
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(train_a.len(), 80);
        assert_eq!(test_a.len(), 20);
        for i in &test_a {
            assert!(!train_a.contains(i));
        }
    }

    #[test]
    fn test_mae() {
        let mae = mean_absolute_error(&[1.0, 2.0, 3.0], &[2.0, 2.0, 1.0]);
        assert!((mae - 1.0).abs() < 1e-9);
        assert!(mean_absolute_error(&[], &[]).is_infinite());
    }
}

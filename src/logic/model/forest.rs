//! Random Forests - bagged CART ensembles
//!
//! Classifier averages per-tree class distributions (soft voting),
//! regressor averages leaf means. Trees are grown on bootstrap
//! resamples drawn from a seeded RNG, so a fixed seed gives a fixed forest.

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::tree::{Criterion, DecisionTree, MaxFeatures, TreeData, TreeParams};
use crate::constants::{FOREST_MAX_DEPTH, FOREST_N_ESTIMATORS, TRAIN_SEED};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub tree: TreeParams,
    pub bootstrap: bool,
    pub seed: u64,
}

impl ForestParams {
    /// 100 trees, depth 10, √features per split
    pub fn classifier() -> Self {
        Self {
            n_estimators: FOREST_N_ESTIMATORS,
            tree: TreeParams {
                max_depth: FOREST_MAX_DEPTH,
                min_samples_split: 2,
                min_samples_leaf: 1,
                max_features: MaxFeatures::Sqrt,
            },
            bootstrap: true,
            seed: TRAIN_SEED,
        }
    }

    /// 100 trees, depth 10, all features per split
    pub fn regressor() -> Self {
        Self {
            tree: TreeParams {
                max_features: MaxFeatures::All,
                ..Self::classifier().tree
            },
            ..Self::classifier()
        }
    }

    pub fn with_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Balanced class weights: n_samples / (n_classes * count(class))
pub fn balanced_class_weights(labels: &[usize], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0usize; n_classes];
    for &l in labels {
        counts[l] += 1;
    }
    let n = labels.len() as f64;
    counts
        .iter()
        .map(|&c| if c == 0 { 0.0 } else { n / (n_classes as f64 * c as f64) })
        .collect()
}

/// Grow `n_estimators` trees; returns trees and normalized importances
fn grow(
    data: &TreeData<'_>,
    base_weights: &[f64],
    params: &ForestParams,
) -> Result<(Vec<DecisionTree>, Vec<f64>), String> {
    let n_samples = data.x.nrows();
    let n_features = data.x.ncols();

    if n_samples == 0 || n_features == 0 {
        return Err(format!("empty training matrix ({}x{})", n_samples, n_features));
    }
    if data.y.len() != n_samples || base_weights.len() != n_samples {
        return Err("label/weight length does not match sample count".to_string());
    }
    if params.n_estimators == 0 {
        return Err("n_estimators must be positive".to_string());
    }

    let mut master = StdRng::seed_from_u64(params.seed);
    let mut trees = Vec::with_capacity(params.n_estimators);
    let mut importances = vec![0.0; n_features];

    for _ in 0..params.n_estimators {
        let mut rng = StdRng::seed_from_u64(master.gen());

        let mut counts = vec![0u32; n_samples];
        if params.bootstrap {
            for _ in 0..n_samples {
                counts[rng.gen_range(0..n_samples)] += 1;
            }
        } else {
            counts.iter_mut().for_each(|c| *c = 1);
        }

        let samples: Vec<(usize, f64)> = counts
            .iter()
            .enumerate()
            .filter(|(i, c)| **c > 0 && base_weights[*i] > 0.0)
            .map(|(i, c)| (i, f64::from(*c) * base_weights[i]))
            .collect();

        let (tree, tree_importance) = DecisionTree::fit(data, samples, &params.tree, &mut rng);

        let total: f64 = tree_importance.iter().sum();
        if total > 0.0 {
            for (acc, v) in importances.iter_mut().zip(&tree_importance) {
                *acc += v / total;
            }
        }
        trees.push(tree);
    }

    let total: f64 = importances.iter().sum();
    if total > 0.0 {
        importances.iter_mut().for_each(|v| *v /= total);
    }

    Ok((trees, importances))
}

// ============================================================================
// CLASSIFIER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    pub trees: Vec<DecisionTree>,
    pub n_classes: usize,
    pub n_features: usize,
    pub class_weights: Vec<f64>,
    pub feature_importances: Vec<f64>,
    pub params: ForestParams,
}

impl RandomForestClassifier {
    /// Fit with balanced class weights
    pub fn fit(
        x: ArrayView2<'_, f64>,
        labels: &[usize],
        n_classes: usize,
        params: ForestParams,
    ) -> Result<Self, String> {
        if labels.iter().any(|&l| l >= n_classes) {
            return Err(format!("label out of range for {} classes", n_classes));
        }

        let class_weights = balanced_class_weights(labels, n_classes);
        let sample_weights: Vec<f64> = labels.iter().map(|&l| class_weights[l]).collect();
        let y: Vec<f64> = labels.iter().map(|&l| l as f64).collect();

        let data = TreeData {
            x: x.view(),
            y: &y,
            criterion: Criterion::Gini { n_classes },
        };
        let (trees, feature_importances) = grow(&data, &sample_weights, &params)?;

        Ok(Self {
            trees,
            n_classes,
            n_features: x.ncols(),
            class_weights,
            feature_importances,
            params,
        })
    }

    /// Mean of per-tree class distributions
    pub fn predict_proba_row(&self, row: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (p, v) in proba.iter_mut().zip(tree.leaf(row)) {
                *p += v;
            }
        }
        let n = self.trees.len().max(1) as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }

    pub fn predict_row(&self, row: &[f64]) -> usize {
        argmax(&self.predict_proba_row(row))
    }
}

// ============================================================================
// REGRESSOR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    pub trees: Vec<DecisionTree>,
    pub n_features: usize,
    pub feature_importances: Vec<f64>,
    pub params: ForestParams,
}

impl RandomForestRegressor {
    pub fn fit(x: ArrayView2<'_, f64>, y: &[f64], params: ForestParams) -> Result<Self, String> {
        let weights = vec![1.0; y.len()];
        let data = TreeData {
            x: x.view(),
            y,
            criterion: Criterion::Mse,
        };
        let (trees, feature_importances) = grow(&data, &weights, &params)?;

        Ok(Self {
            trees,
            n_features: x.ncols(),
            feature_importances,
            params,
        })
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.leaf(row)[0]).sum();
        sum / self.trees.len().max(1) as f64
    }
}

/// Index of the largest value (first on ties)
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn blobs() -> (Array2<f64>, Vec<usize>) {
        // Three well separated clusters in 2D, class 2 under-represented
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..60 {
            let jitter = (i % 7) as f64 * 0.1;
            let (class, cx, cy) = match i % 6 {
                0 | 1 | 2 => (0, 0.0, 0.0),
                3 | 4 => (1, 10.0, 0.0),
                _ => (2, 5.0, 10.0),
            };
            rows.push([cx + jitter, cy - jitter]);
            labels.push(class);
        }
        let x = Array2::from_shape_fn((rows.len(), 2), |(i, j)| rows[i][j]);
        (x, labels)
    }

    #[test]
    fn test_balanced_weights() {
        let w = balanced_class_weights(&[0, 0, 0, 1], 2);
        assert!((w[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((w[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_classifier_fits_clusters() {
        let (x, labels) = blobs();
        let params = ForestParams::classifier().with_estimators(15);
        let forest = RandomForestClassifier::fit(x.view(), &labels, 3, params).unwrap();

        assert_eq!(forest.predict_row(&[0.2, -0.2]), 0);
        assert_eq!(forest.predict_row(&[10.1, 0.0]), 1);
        assert_eq!(forest.predict_row(&[5.0, 10.0]), 2);

        let proba = forest.predict_proba_row(&[5.0, 10.0]);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        let total: f64 = forest.feature_importances.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, labels) = blobs();
        let params = ForestParams::classifier().with_estimators(5);
        let a = RandomForestClassifier::fit(x.view(), &labels, 3, params).unwrap();
        let b = RandomForestClassifier::fit(x.view(), &labels, 3, params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_regressor_tracks_step_function() {
        let x = Array2::from_shape_fn((100, 1), |(i, _)| i as f64);
        let y: Vec<f64> = (0..100).map(|i| if i < 50 { 0.2 } else { 0.8 }).collect();
        let forest = RandomForestRegressor::fit(x.view(), &y, ForestParams::regressor().with_estimators(20)).unwrap();

        assert!((forest.predict_row(&[10.0]) - 0.2).abs() < 0.05);
        assert!((forest.predict_row(&[90.0]) - 0.8).abs() < 0.05);
    }

    #[test]
    fn test_fit_from_sliced_view() {
        let x = Array2::from_shape_fn((100, 2), |(i, j)| (i * (j + 1)) as f64);
        let targets: Vec<f64> = (0..100).map(|i| if i < 30 { 0.1 } else { 0.9 }).collect();
        let first_rows = x.slice(ndarray::s![..60, ..]);

        let forest = RandomForestRegressor::fit(first_rows, &targets[..60], ForestParams::regressor().with_estimators(10))
            .unwrap();
        assert_eq!(forest.n_features, 2);
        assert!((forest.predict_row(&[5.0, 10.0]) - 0.1).abs() < 0.05);

        let labels: Vec<usize> = (0..60).map(|i| usize::from(i >= 30)).collect();
        let classifier =
            RandomForestClassifier::fit(first_rows, &labels, 2, ForestParams::classifier().with_estimators(10)).unwrap();
        assert_eq!(classifier.predict_row(&[55.0, 110.0]), 1);
    }

    #[test]
    fn test_rejects_bad_input() {
        let x = Array2::<f64>::zeros((0, 2));
        assert!(RandomForestRegressor::fit(x.view(), &[], ForestParams::regressor()).is_err());

        let (x, labels) = blobs();
        assert!(RandomForestClassifier::fit(x.view(), &labels, 2, ForestParams::classifier()).is_err());
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
        assert_eq!(argmax(&[0.5, 0.5]), 0);
    }
}

//! Decision Tree - weighted CART used by the random forests
//!
//! Gini impurity for classification (leaf = class distribution),
//! variance for regression (leaf = weighted mean). Samples carry
//! weights so bootstrap counts and class balancing share one path.

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-12;

// ============================================================================
// PARAMETERS
// ============================================================================

/// Features considered at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    All,
    Sqrt,
}

impl MaxFeatures {
    pub fn resolve(&self, n_features: usize) -> usize {
        match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => ((n_features as f64).sqrt() as usize).clamp(1, n_features.max(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    /// Classification over `n_classes` integer labels
    Gini { n_classes: usize },
    /// Regression on a continuous target
    Mse,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

/// Training view handed to `DecisionTree::fit`
pub struct TreeData<'a> {
    pub x: ArrayView2<'a, f64>,
    /// Class index (as f64) or regression target
    pub y: &'a [f64],
    pub criterion: Criterion,
}

// ============================================================================
// TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
    pub n_features: usize,
}

impl DecisionTree {
    /// Fit on `(sample index, weight)` pairs.
    ///
    /// Returns the tree and the total weighted impurity decrease per feature.
    pub fn fit(
        data: &TreeData<'_>,
        samples: Vec<(usize, f64)>,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> (Self, Vec<f64>) {
        let n_features = data.x.ncols();
        let mut builder = Builder {
            data,
            params: *params,
            n_candidates: params.max_features.resolve(n_features),
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };

        builder.build(samples, 0, rng);

        let tree = DecisionTree {
            nodes: builder.nodes,
            n_features,
        };
        (tree, builder.importances)
    }

    /// Leaf value reached by `row`
    pub fn leaf(&self, row: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split { feature, threshold, left, right } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }
}

// ============================================================================
// IMPURITY ACCUMULATOR
// ============================================================================

#[derive(Debug, Clone)]
enum Acc {
    Gini { counts: Vec<f64>, total: f64 },
    Mse { w: f64, wy: f64, wy2: f64 },
}

impl Acc {
    fn empty(criterion: Criterion) -> Self {
        match criterion {
            Criterion::Gini { n_classes } => Acc::Gini {
                counts: vec![0.0; n_classes],
                total: 0.0,
            },
            Criterion::Mse => Acc::Mse { w: 0.0, wy: 0.0, wy2: 0.0 },
        }
    }

    fn add(&mut self, y: f64, weight: f64) {
        match self {
            Acc::Gini { counts, total } => {
                counts[y as usize] += weight;
                *total += weight;
            }
            Acc::Mse { w, wy, wy2 } => {
                *w += weight;
                *wy += weight * y;
                *wy2 += weight * y * y;
            }
        }
    }

    fn sub(&mut self, y: f64, weight: f64) {
        self.add(y, -weight);
    }

    /// Node weight times node impurity
    fn weighted_impurity(&self) -> f64 {
        match self {
            Acc::Gini { counts, total } => {
                if *total <= EPS {
                    return 0.0;
                }
                let sq: f64 = counts.iter().map(|c| c * c).sum();
                (total - sq / total).max(0.0)
            }
            Acc::Mse { w, wy, wy2 } => {
                if *w <= EPS {
                    return 0.0;
                }
                (wy2 - wy * wy / w).max(0.0)
            }
        }
    }

    fn leaf_value(&self) -> Vec<f64> {
        match self {
            Acc::Gini { counts, total } => {
                if *total <= EPS {
                    let n = counts.len().max(1) as f64;
                    return vec![1.0 / n; counts.len()];
                }
                counts.iter().map(|c| (c / total).max(0.0)).collect()
            }
            Acc::Mse { w, wy, .. } => vec![if *w <= EPS { 0.0 } else { wy / w }],
        }
    }
}

// ============================================================================
// BUILDER
// ============================================================================

struct Builder<'d, 'a> {
    data: &'d TreeData<'a>,
    params: TreeParams,
    n_candidates: usize,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl Builder<'_, '_> {
    fn build(&mut self, samples: Vec<(usize, f64)>, depth: usize, rng: &mut StdRng) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { value: Vec::new() });

        let mut acc = Acc::empty(self.data.criterion);
        for &(s, w) in &samples {
            acc.add(self.data.y[s], w);
        }

        let stop = depth >= self.params.max_depth
            || samples.len() < self.params.min_samples_split
            || acc.weighted_impurity() <= EPS;

        let split = if stop { None } else { self.best_split(&samples, &acc, rng) };

        match split {
            None => {
                self.nodes[idx] = Node::Leaf { value: acc.leaf_value() };
            }
            Some(best) => {
                self.importances[best.feature] += best.gain;

                let (left, right): (Vec<_>, Vec<_>) = samples
                    .into_iter()
                    .partition(|(s, _)| self.data.x[[*s, best.feature]] <= best.threshold);

                let left_idx = self.build(left, depth + 1, rng);
                let right_idx = self.build(right, depth + 1, rng);

                self.nodes[idx] = Node::Split {
                    feature: best.feature,
                    threshold: best.threshold,
                    left: left_idx,
                    right: right_idx,
                };
            }
        }

        idx
    }

    fn best_split(&self, samples: &[(usize, f64)], parent: &Acc, rng: &mut StdRng) -> Option<BestSplit> {
        let n_features = self.data.x.ncols();
        let candidates = index::sample(rng, n_features, self.n_candidates).into_vec();
        let parent_cost = parent.weighted_impurity();
        let min_leaf = self.params.min_samples_leaf.max(1);

        let mut best: Option<BestSplit> = None;
        let mut best_cost = f64::INFINITY;
        let mut sorted = samples.to_vec();

        for feature in candidates {
            let x = &self.data.x;
            sorted.sort_by(|a, b| x[[a.0, feature]].total_cmp(&x[[b.0, feature]]));

            let mut left = Acc::empty(self.data.criterion);
            let mut right = parent.clone();

            for i in 0..sorted.len() - 1 {
                let (s, w) = sorted[i];
                let y = self.data.y[s];
                left.add(y, w);
                right.sub(y, w);

                let n_left = i + 1;
                if n_left < min_leaf || sorted.len() - n_left < min_leaf {
                    continue;
                }

                let a = x[[s, feature]];
                let b = x[[sorted[i + 1].0, feature]];
                if b - a <= EPS {
                    continue;
                }

                let cost = left.weighted_impurity() + right.weighted_impurity();
                if cost < best_cost {
                    best_cost = cost;
                    best = Some(BestSplit {
                        feature,
                        threshold: a + (b - a) / 2.0,
                        gain: parent_cost - cost,
                    });
                }
            }
        }

        best.filter(|b| b.gain > EPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    fn params() -> TreeParams {
        TreeParams {
            max_depth: 5,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
        }
    }

    #[test]
    fn test_classifier_separates_threshold() {
        let x = array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [10.0, 1.0], [11.0, 0.0], [12.0, 1.0]];
        let y = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let data = TreeData { x: x.view(), y: &y, criterion: Criterion::Gini { n_classes: 2 } };
        let samples = (0..6).map(|i| (i, 1.0)).collect();
        let mut rng = StdRng::seed_from_u64(0);

        let (tree, importances) = DecisionTree::fit(&data, samples, &params(), &mut rng);

        assert_eq!(tree.leaf(&[0.0, 0.0]), &[1.0, 0.0]);
        assert_eq!(tree.leaf(&[20.0, 0.0]), &[0.0, 1.0]);
        assert_eq!(tree.depth(), 1);
        assert!(importances[0] > 0.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_regressor_leaf_means() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = [1.0, 1.0, 5.0, 5.0];
        let data = TreeData { x: x.view(), y: &y, criterion: Criterion::Mse };
        let samples = (0..4).map(|i| (i, 1.0)).collect();
        let mut rng = StdRng::seed_from_u64(0);

        let (tree, _) = DecisionTree::fit(&data, samples, &params(), &mut rng);
        assert_eq!(tree.leaf(&[0.5]), &[1.0]);
        assert_eq!(tree.leaf(&[2.5]), &[5.0]);
    }

    #[test]
    fn test_weights_shift_leaf_distribution() {
        // Identical features: no split possible, leaf is the weighted class mix
        let x = array![[1.0], [1.0], [1.0]];
        let y = [0.0, 0.0, 1.0];
        let data = TreeData { x: x.view(), y: &y, criterion: Criterion::Gini { n_classes: 2 } };
        let samples = vec![(0, 1.0), (1, 1.0), (2, 2.0)];
        let mut rng = StdRng::seed_from_u64(0);

        let (tree, _) = DecisionTree::fit(&data, samples, &params(), &mut rng);
        assert_eq!(tree.leaf(&[1.0]), &[0.5, 0.5]);
    }

    #[test]
    fn test_max_depth_respected() {
        let x = ndarray::Array2::from_shape_fn((64, 1), |(i, _)| i as f64);
        let y: Vec<f64> = (0..64).map(|i| (i % 2) as f64).collect();
        let data = TreeData { x: x.view(), y: &y, criterion: Criterion::Gini { n_classes: 2 } };
        let samples = (0..64).map(|i| (i, 1.0)).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let p = TreeParams { max_depth: 3, ..params() };

        let (tree, _) = DecisionTree::fit(&data, samples, &p, &mut rng);
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn test_sqrt_features() {
        assert_eq!(MaxFeatures::Sqrt.resolve(13), 3);
        assert_eq!(MaxFeatures::Sqrt.resolve(1), 1);
        assert_eq!(MaxFeatures::All.resolve(8), 8);
    }
}

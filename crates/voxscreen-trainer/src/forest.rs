//! Random forest fitting.
//!
//! Each tree is a CART tree grown to purity on a bootstrap sample, choosing
//! among a random subset of features at every node by weighted Gini
//! impurity. Bootstrap multiplicities and class weights both enter as
//! sample weights, so leaves store weighted class counts.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;
use voxscreen_classifiers::{DecisionTree, RandomForest, TreeNode};
use voxscreen_core::{Error, Result};

/// Forest hyper-parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    /// Features examined per split; `None` uses `floor(sqrt(n_features))`
    pub max_features: Option<usize>,
    pub min_samples_split: usize,
    /// Weight classes inversely to their frequency
    pub balanced: bool,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_features: None,
            min_samples_split: 2,
            balanced: true,
            bootstrap: true,
            seed: 42,
        }
    }
}

/// A fitted forest with its sorted class labels
#[derive(Debug, Clone)]
pub struct FittedForest {
    pub forest: RandomForest,
    pub classes: Vec<i64>,
}

/// Fit a random forest on `rows` and `labels`.
pub fn fit_forest(rows: &[Vec<f32>], labels: &[i64], params: &ForestParams) -> Result<FittedForest> {
    if rows.is_empty() {
        return Err(Error::dataset("cannot train on zero rows"));
    }
    if rows.len() != labels.len() {
        return Err(Error::dataset("rows and labels differ in length"));
    }
    if params.n_estimators == 0 {
        return Err(Error::dataset("forest needs at least one tree"));
    }
    let n_features = rows[0].len();
    if n_features == 0 || rows.iter().any(|r| r.len() != n_features) {
        return Err(Error::dataset("rows must share a non-zero width"));
    }

    let classes: Vec<i64> = {
        let mut c = labels.to_vec();
        c.sort_unstable();
        c.dedup();
        c
    };
    let class_idx: Vec<usize> = labels
        .iter()
        .map(|l| classes.binary_search(l).unwrap_or(0))
        .collect();
    let class_weight = class_weights(&class_idx, classes.len(), params.balanced);
    let max_features = params
        .max_features
        .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize)
        .clamp(1, n_features);

    let data = TrainingData {
        rows,
        class_idx: &class_idx,
        n_classes: classes.len(),
        n_features,
    };

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut trees = Vec::with_capacity(params.n_estimators);
    for _ in 0..params.n_estimators {
        let mut weights = vec![0.0_f64; rows.len()];
        if params.bootstrap {
            for _ in 0..rows.len() {
                weights[rng.gen_range(0..rows.len())] += 1.0;
            }
        } else {
            weights.iter_mut().for_each(|w| *w = 1.0);
        }
        for (w, &c) in weights.iter_mut().zip(&class_idx) {
            *w *= class_weight[c];
        }

        let nodes = grow_tree(&data, &weights, max_features, params.min_samples_split, &mut rng);
        trees.push(DecisionTree::new(nodes, n_features, classes.len())?);
    }

    debug!(
        trees = trees.len(),
        max_features,
        classes = classes.len(),
        "fitted random forest"
    );

    Ok(FittedForest {
        forest: RandomForest::new(trees)?,
        classes,
    })
}

/// `n_samples / (n_classes * count)` per class when balanced, else 1
fn class_weights(class_idx: &[usize], n_classes: usize, balanced: bool) -> Vec<f64> {
    if !balanced {
        return vec![1.0; n_classes];
    }
    let mut counts = vec![0usize; n_classes];
    for &c in class_idx {
        counts[c] += 1;
    }
    counts
        .iter()
        .map(|&count| {
            if count == 0 {
                0.0
            } else {
                class_idx.len() as f64 / (n_classes * count) as f64
            }
        })
        .collect()
}

struct TrainingData<'a> {
    rows: &'a [Vec<f32>],
    class_idx: &'a [usize],
    n_classes: usize,
    n_features: usize,
}

struct BestSplit {
    feature: usize,
    threshold: f32,
    impurity: f64,
}

fn grow_tree(
    data: &TrainingData<'_>,
    weights: &[f64],
    max_features: usize,
    min_samples_split: usize,
    rng: &mut StdRng,
) -> Vec<TreeNode> {
    let root: Vec<usize> = (0..data.rows.len()).filter(|&i| weights[i] > 0.0).collect();
    let mut nodes = vec![TreeNode::Leaf { counts: Vec::new() }];
    let mut stack = vec![(0usize, root)];
    let mut features: Vec<usize> = (0..data.n_features).collect();

    while let Some((node_idx, samples)) = stack.pop() {
        let counts = weighted_counts(data, weights, &samples);
        let splittable = samples.len() >= min_samples_split.max(2) && gini(&counts) > 0.0;

        let split = if splittable {
            features.shuffle(rng);
            best_split(data, weights, &samples, &features, max_features)
        } else {
            None
        };

        match split {
            Some(split) => {
                let (left, right): (Vec<usize>, Vec<usize>) = samples
                    .iter()
                    .partition(|&&i| data.rows[i][split.feature] <= split.threshold);

                let left_idx = nodes.len();
                let right_idx = left_idx + 1;
                nodes.push(TreeNode::Leaf { counts: Vec::new() });
                nodes.push(TreeNode::Leaf { counts: Vec::new() });
                nodes[node_idx] = TreeNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left: left_idx,
                    right: right_idx,
                };
                stack.push((right_idx, right));
                stack.push((left_idx, left));
            }
            None => {
                nodes[node_idx] = TreeNode::Leaf {
                    counts: counts.iter().map(|&c| c as f32).collect(),
                };
            }
        }
    }

    nodes
}

/// Lowest weighted child impurity over the first `max_features` features
/// that can be split at all.
fn best_split(
    data: &TrainingData<'_>,
    weights: &[f64],
    samples: &[usize],
    features: &[usize],
    max_features: usize,
) -> Option<BestSplit> {
    let total = weighted_counts(data, weights, samples);
    let mut best: Option<BestSplit> = None;
    let mut visited = 0;

    for &feature in features {
        if visited >= max_features && best.is_some() {
            break;
        }

        let mut order: Vec<usize> = samples.to_vec();
        order.sort_by(|&a, &b| data.rows[a][feature].total_cmp(&data.rows[b][feature]));

        let first = data.rows[order[0]][feature];
        let last = data.rows[order[order.len() - 1]][feature];
        if first == last {
            continue;
        }
        visited += 1;

        let mut left = vec![0.0_f64; data.n_classes];
        for pair in 0..order.len() - 1 {
            let i = order[pair];
            left[data.class_idx[i]] += weights[i];

            let here = data.rows[i][feature];
            let next = data.rows[order[pair + 1]][feature];
            if here == next {
                continue;
            }

            let right: Vec<f64> = total.iter().zip(&left).map(|(t, l)| t - l).collect();
            let w_left: f64 = left.iter().sum();
            let w_right: f64 = right.iter().sum();
            let impurity = w_left * gini(&left) + w_right * gini(&right);

            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                best = Some(BestSplit {
                    feature,
                    threshold: midpoint(here, next),
                    impurity,
                });
            }
        }
    }

    best
}

/// Threshold between two adjacent distinct values that still sends `low` left
fn midpoint(low: f32, high: f32) -> f32 {
    let mid = low + (high - low) / 2.0;
    if mid >= high || !mid.is_finite() {
        low
    } else {
        mid
    }
}

fn weighted_counts(data: &TrainingData<'_>, weights: &[f64], samples: &[usize]) -> Vec<f64> {
    let mut counts = vec![0.0_f64; data.n_classes];
    for &i in samples {
        counts[data.class_idx[i]] += weights[i];
    }
    counts
}

fn gini(counts: &[f64]) -> f64 {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}

/// Share of each label, for logging
pub fn label_distribution(labels: &[i64]) -> BTreeMap<i64, usize> {
    let mut dist = BTreeMap::new();
    for &l in labels {
        *dist.entry(l).or_insert(0) += 1;
    }
    dist
}

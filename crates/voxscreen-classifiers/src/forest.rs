//! Decision tree ensembles.
//!
//! Trees are stored as flat node arrays. Node 0 is the root and every split
//! points at children with larger indices, so traversal always terminates.

use serde::{Deserialize, Serialize};
use voxscreen_core::{Error, Result};

/// One node of a decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    /// Go to `left` when `row[feature] <= threshold`, else to `right`
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },

    /// Weighted training counts per class
    Leaf { counts: Vec<f32> },
}

/// A single CART tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Build a tree from its node array, checking the structure.
    pub fn new(nodes: Vec<TreeNode>, n_features: usize, n_classes: usize) -> Result<Self> {
        let tree = Self { nodes };
        tree.validate(n_features, n_classes)?;
        Ok(tree)
    }

    /// Nodes in storage order
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    /// Check node references, feature indices and leaf widths.
    pub fn validate(&self, n_features: usize, n_classes: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::model("tree has no nodes"));
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(Error::model(format!(
                            "node {idx} splits on feature {feature}, model has {n_features}"
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(Error::model(format!("node {idx} has a NaN threshold")));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(Error::model(format!(
                                "node {idx} has invalid child {child}"
                            )));
                        }
                    }
                }
                TreeNode::Leaf { counts } => {
                    if counts.len() != n_classes {
                        return Err(Error::model(format!(
                            "leaf {idx} has {} class counts, expected {n_classes}",
                            counts.len()
                        )));
                    }
                    if counts.iter().any(|c| !c.is_finite() || *c < 0.0) {
                        return Err(Error::model(format!("leaf {idx} has invalid counts")));
                    }
                }
            }
        }
        Ok(())
    }

    /// Class counts of the leaf reached by `row`
    pub fn leaf_counts(&self, row: &[f32]) -> Result<&[f32]> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).ok_or_else(|| {
                        Error::inference(format!("row has no feature {feature}"))
                    })?;
                    idx = if *value <= *threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { counts }) => return Ok(counts),
                None => return Err(Error::inference(format!("tree has no node {idx}"))),
            }
        }
    }

    /// Normalised class distribution at the leaf reached by `row`.
    ///
    /// An empty leaf yields the uniform distribution.
    pub fn predict_proba(&self, row: &[f32]) -> Result<Vec<f32>> {
        let counts = self.leaf_counts(row)?;
        let total: f32 = counts.iter().sum();
        if total <= 0.0 {
            let uniform = 1.0 / counts.len().max(1) as f32;
            return Ok(vec![uniform; counts.len()]);
        }
        Ok(counts.iter().map(|c| c / total).collect())
    }
}

/// Averaging ensemble of decision trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(trees: Vec<DecisionTree>) -> Result<Self> {
        if trees.is_empty() {
            return Err(Error::model("forest has no trees"));
        }
        Ok(Self { trees })
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub fn validate(&self, n_features: usize, n_classes: usize) -> Result<()> {
        if self.trees.is_empty() {
            return Err(Error::model("forest has no trees"));
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(n_features, n_classes)
                .map_err(|e| Error::model(format!("tree {idx}: {e}")))?;
        }
        Ok(())
    }

    /// Mean of the per-tree class distributions
    pub fn predict_proba(&self, row: &[f32], n_classes: usize) -> Result<Vec<f32>> {
        let mut sum = vec![0.0_f32; n_classes];
        for tree in &self.trees {
            let proba = tree.predict_proba(row)?;
            if proba.len() != n_classes {
                return Err(Error::inference(format!(
                    "tree produced {} probabilities, expected {n_classes}",
                    proba.len()
                )));
            }
            for (acc, p) in sum.iter_mut().zip(proba) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f32;
        Ok(sum.into_iter().map(|p| p / n).collect())
    }
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((idx, v)),
        }
    }
    best.map(|(idx, _)| idx)
}

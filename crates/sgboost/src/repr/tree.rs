//! Structure-of-arrays regression tree.
//!
//! This module provides:
//! - [`RegressionTree`]: immutable SoA storage used for inference and persistence
//! - [`TreeBuilder`]: mutable node arena filled in by the tree learner
//! - [`TreeValidationError`]: structural validation errors
//!
//! Nodes are addressed by integer id, the root is node 0. A row goes left at a
//! split node iff its feature value is `<=` the node's threshold.

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::utils::Parallelism;

/// Node index local to a tree (0 = root).
pub type NodeId = u32;

// ============================================================================
// TreeValidationError
// ============================================================================

/// Structural validation errors for [`RegressionTree`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeValidationError {
    #[error("tree has no nodes")]
    EmptyTree,

    #[error("node arrays have inconsistent lengths")]
    LengthMismatch,

    #[error("node {node} has {side} child {child} out of bounds ({n_nodes} nodes)")]
    ChildOutOfBounds {
        node: NodeId,
        side: &'static str,
        child: NodeId,
        n_nodes: usize,
    },

    #[error("node {node} references itself")]
    SelfLoop { node: NodeId },

    #[error("node {node} is reachable by more than one path")]
    DuplicateVisit { node: NodeId },

    #[error("cycle detected at node {node}")]
    CycleDetected { node: NodeId },

    #[error("node {node} is unreachable from the root")]
    UnreachableNode { node: NodeId },

    #[error("node {node} splits on feature {feature} but the model has {n_features} features")]
    FeatureOutOfBounds {
        node: NodeId,
        feature: u32,
        n_features: usize,
    },

    #[error("node {node} has a non-finite threshold or value")]
    NonFiniteValue { node: NodeId },
}

// ============================================================================
// RegressionTree
// ============================================================================

/// Immutable structure-of-arrays tree.
///
/// Split nodes use `split_features`, `thresholds`, children and `gains`; leaf
/// nodes use `leaf_values`. `covers` holds the in-sample row count that
/// reached each node during training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    split_features: Box<[u32]>,
    thresholds: Box<[f64]>,
    left_children: Box<[u32]>,
    right_children: Box<[u32]>,
    is_leaf: Box<[bool]>,
    leaf_values: Box<[f64]>,
    gains: Box<[f64]>,
    covers: Box<[u32]>,
}

impl RegressionTree {
    /// A tree with a single leaf.
    pub fn constant(value: f64) -> Self {
        let mut builder = TreeBuilder::new();
        let root = builder.init_root();
        builder.make_leaf(root, value, 0);
        builder.freeze()
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.is_leaf.iter().filter(|&&leaf| leaf).count()
    }

    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.is_leaf[node as usize]
    }

    #[inline]
    pub fn split_feature(&self, node: NodeId) -> u32 {
        self.split_features[node as usize]
    }

    #[inline]
    pub fn threshold(&self, node: NodeId) -> f64 {
        self.thresholds[node as usize]
    }

    #[inline]
    pub fn left_child(&self, node: NodeId) -> NodeId {
        self.left_children[node as usize]
    }

    #[inline]
    pub fn right_child(&self, node: NodeId) -> NodeId {
        self.right_children[node as usize]
    }

    #[inline]
    pub fn leaf_value(&self, node: NodeId) -> f64 {
        self.leaf_values[node as usize]
    }

    /// Information gain of each node (0 for leaves).
    #[inline]
    pub fn gains(&self) -> &[f64] {
        &self.gains
    }

    /// In-sample rows that reached each node during training.
    #[inline]
    pub fn covers(&self) -> &[u32] {
        &self.covers
    }

    /// Maximum root-to-leaf depth (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0 as NodeId, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            if self.is_leaf(node) {
                max_depth = max_depth.max(depth);
            } else {
                stack.push((self.left_child(node), depth + 1));
                stack.push((self.right_child(node), depth + 1));
            }
        }
        max_depth
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    /// Traverse from the root to the leaf a row falls into.
    #[inline]
    pub fn leaf_for_row(&self, row: ArrayView1<f64>) -> NodeId {
        let mut node: NodeId = 0;
        while !self.is_leaf(node) {
            let value = row[self.split_feature(node) as usize];
            node = if value <= self.threshold(node) {
                self.left_child(node)
            } else {
                self.right_child(node)
            };
        }
        node
    }

    /// Output value for a single row.
    #[inline]
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        self.leaf_value(self.leaf_for_row(row))
    }

    /// Output value for every row of a matrix.
    pub fn predict(&self, observations: ArrayView2<f64>) -> Vec<f64> {
        observations.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }

    /// Add `scale * tree(row)` to `out[row]` for every row.
    ///
    /// Rows are independent, so the parallel path produces the same bits as
    /// the sequential one.
    pub fn accumulate_into(
        &self,
        observations: ArrayView2<f64>,
        out: &mut [f64],
        scale: f64,
        parallelism: Parallelism,
    ) {
        debug_assert_eq!(observations.nrows(), out.len());
        parallelism.maybe_par_for_each_indexed(out, |i, acc| {
            *acc += scale * self.predict_row(observations.row(i));
        });
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Validate structural invariants.
    ///
    /// Checks array lengths, child bounds, absence of cycles and shared
    /// subtrees, reachability of every node, split features below
    /// `n_features`, and finiteness of thresholds and leaf values.
    pub fn validate(&self, n_features: usize) -> Result<(), TreeValidationError> {
        let n_nodes = self.n_nodes();
        if n_nodes == 0 {
            return Err(TreeValidationError::EmptyTree);
        }
        let lengths = [
            self.split_features.len(),
            self.thresholds.len(),
            self.left_children.len(),
            self.right_children.len(),
            self.leaf_values.len(),
            self.gains.len(),
            self.covers.len(),
        ];
        if lengths.iter().any(|&len| len != n_nodes) {
            return Err(TreeValidationError::LengthMismatch);
        }

        // Iterative DFS with color marking: 0 = unvisited, 1 = visiting, 2 = done
        let mut color = vec![0u8; n_nodes];
        let mut stack: Vec<(NodeId, bool)> = vec![(0, false)];

        while let Some((node, finished)) = stack.pop() {
            let idx = node as usize;
            if finished {
                color[idx] = 2;
                continue;
            }
            match color[idx] {
                0 => {}
                1 => return Err(TreeValidationError::CycleDetected { node }),
                _ => return Err(TreeValidationError::DuplicateVisit { node }),
            }
            color[idx] = 1;
            stack.push((node, true));

            if self.is_leaf(node) {
                if !self.leaf_value(node).is_finite() {
                    return Err(TreeValidationError::NonFiniteValue { node });
                }
                continue;
            }

            let feature = self.split_feature(node);
            if feature as usize >= n_features {
                return Err(TreeValidationError::FeatureOutOfBounds { node, feature, n_features });
            }
            if !self.threshold(node).is_finite() {
                return Err(TreeValidationError::NonFiniteValue { node });
            }

            let left = self.left_child(node);
            let right = self.right_child(node);
            if left == node || right == node {
                return Err(TreeValidationError::SelfLoop { node });
            }
            for (side, child) in [("left", left), ("right", right)] {
                if child as usize >= n_nodes {
                    return Err(TreeValidationError::ChildOutOfBounds { node, side, child, n_nodes });
                }
            }
            stack.push((right, false));
            stack.push((left, false));
        }

        if let Some(node) = color.iter().position(|&c| c == 0) {
            return Err(TreeValidationError::UnreachableNode { node: node as NodeId });
        }

        Ok(())
    }
}

// ============================================================================
// TreeBuilder
// ============================================================================

#[derive(Debug, Clone, Default)]
struct BuilderNode {
    is_leaf: bool,
    feature: u32,
    threshold: f64,
    left: NodeId,
    right: NodeId,
    value: f64,
    gain: f64,
    cover: u32,
}

/// Mutable tree builder used while a tree is grown.
///
/// Nodes are allocated as placeholders and later turned into a split (which
/// allocates both children) or a leaf.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    nodes: Vec<BuilderNode>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::with_capacity(16) }
    }

    /// Reset and allocate the root placeholder. Returns the root id (always 0).
    pub fn init_root(&mut self) -> NodeId {
        self.nodes.clear();
        self.nodes.push(BuilderNode::default());
        0
    }

    /// Turn `node` into a split, allocating its children.
    ///
    /// Returns `(left_id, right_id)`.
    pub fn apply_split(
        &mut self,
        node: NodeId,
        feature: u32,
        threshold: f64,
        gain: f64,
        cover: u32,
    ) -> (NodeId, NodeId) {
        let left = self.nodes.len() as NodeId;
        let right = left + 1;
        self.nodes.push(BuilderNode::default());
        self.nodes.push(BuilderNode::default());

        let n = &mut self.nodes[node as usize];
        n.is_leaf = false;
        n.feature = feature;
        n.threshold = threshold;
        n.left = left;
        n.right = right;
        n.gain = gain;
        n.cover = cover;

        (left, right)
    }

    /// Turn `node` into a leaf with the given output value.
    pub fn make_leaf(&mut self, node: NodeId, value: f64, cover: u32) {
        let n = &mut self.nodes[node as usize];
        n.is_leaf = true;
        n.value = value;
        n.cover = cover;
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Convert into the immutable SoA representation.
    pub fn freeze(self) -> RegressionTree {
        let n = self.nodes.len();
        let mut tree = RegressionTree {
            split_features: vec![0; n].into_boxed_slice(),
            thresholds: vec![0.0; n].into_boxed_slice(),
            left_children: vec![0; n].into_boxed_slice(),
            right_children: vec![0; n].into_boxed_slice(),
            is_leaf: vec![false; n].into_boxed_slice(),
            leaf_values: vec![0.0; n].into_boxed_slice(),
            gains: vec![0.0; n].into_boxed_slice(),
            covers: vec![0; n].into_boxed_slice(),
        };
        for (i, node) in self.nodes.into_iter().enumerate() {
            tree.is_leaf[i] = node.is_leaf;
            tree.covers[i] = node.cover;
            if node.is_leaf {
                tree.leaf_values[i] = node.value;
            } else {
                tree.split_features[i] = node.feature;
                tree.thresholds[i] = node.threshold;
                tree.left_children[i] = node.left;
                tree.right_children[i] = node.right;
                tree.gains[i] = node.gain;
            }
        }
        tree
    }
}

//! Boosted ensemble: per-output tree sequences plus their start values.

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeValidationError};
use crate::utils::Parallelism;

/// Structural validation errors for [`Ensemble`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnsembleValidationError {
    #[error("ensemble has no outputs")]
    NoOutputs,

    #[error("{n_outputs} tree sequences but {n_initial} initial values")]
    InitialValuesLenMismatch { n_outputs: usize, n_initial: usize },

    #[error("output {output} has {len} trees, expected {expected}")]
    RaggedSequences { output: usize, len: usize, expected: usize },

    #[error("learning rate {0} is not finite and positive")]
    InvalidLearningRate(f64),

    #[error("initial value of output {0} is not finite")]
    NonFiniteInitialValue(usize),

    #[error("tree {tree} of output {output}: {error}")]
    InvalidTree {
        output: usize,
        tree: usize,
        error: TreeValidationError,
    },
}

/// Additive tree ensemble with one tree sequence per output.
///
/// Output `k` of a row is `initial_values[k] + learning_rate * sum(tree(row))`
/// over the trees of sequence `k`. All sequences have the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ensemble {
    trees: Vec<Vec<RegressionTree>>,
    initial_values: Vec<f64>,
    learning_rate: f64,
    n_features: usize,
}

impl Ensemble {
    pub fn new(
        trees: Vec<Vec<RegressionTree>>,
        initial_values: Vec<f64>,
        learning_rate: f64,
        n_features: usize,
    ) -> Self {
        debug_assert_eq!(trees.len(), initial_values.len());
        Self { trees, initial_values, learning_rate, n_features }
    }

    #[inline]
    pub fn n_outputs(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Trees per output.
    #[inline]
    pub fn n_iterations(&self) -> usize {
        self.trees.first().map_or(0, Vec::len)
    }

    #[inline]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    #[inline]
    pub fn initial_values(&self) -> &[f64] {
        &self.initial_values
    }

    /// Tree sequence of one output.
    #[inline]
    pub fn trees(&self, output: usize) -> &[RegressionTree] {
        &self.trees[output]
    }

    /// Every tree, output by output.
    pub fn iter_trees(&self) -> impl Iterator<Item = &RegressionTree> + '_ {
        self.trees.iter().flatten()
    }

    /// Keep only the first `n_iterations` trees of every output.
    pub fn truncate(&mut self, n_iterations: usize) {
        for sequence in &mut self.trees {
            sequence.truncate(n_iterations);
        }
    }

    /// Raw margin of one output for a single row.
    ///
    /// Accumulates tree by tree, like [`margins`](Self::margins), so row and
    /// matrix predictions agree bit for bit.
    #[inline]
    pub fn margin_row(&self, output: usize, row: ArrayView1<f64>) -> f64 {
        self.trees[output]
            .iter()
            .fold(self.initial_values[output], |acc, tree| acc + self.learning_rate * tree.predict_row(row))
    }

    /// Raw margins of every output for a single row.
    pub fn margins_row(&self, row: ArrayView1<f64>) -> Vec<f64> {
        (0..self.n_outputs()).map(|k| self.margin_row(k, row)).collect()
    }

    /// Raw margins of every row, one vector per output.
    ///
    /// Trees are added in training order so the result matches the running
    /// predictions kept during training.
    pub fn margins(&self, observations: ArrayView2<f64>, parallelism: Parallelism) -> Vec<Vec<f64>> {
        let n_rows = observations.nrows();
        self.trees
            .iter()
            .zip(&self.initial_values)
            .map(|(sequence, &initial)| {
                let mut margins = vec![initial; n_rows];
                for tree in sequence {
                    tree.accumulate_into(observations, &mut margins, self.learning_rate, parallelism);
                }
                margins
            })
            .collect()
    }

    /// Check structural soundness of the whole ensemble.
    pub fn validate(&self) -> Result<(), EnsembleValidationError> {
        if self.trees.is_empty() {
            return Err(EnsembleValidationError::NoOutputs);
        }
        if self.trees.len() != self.initial_values.len() {
            return Err(EnsembleValidationError::InitialValuesLenMismatch {
                n_outputs: self.trees.len(),
                n_initial: self.initial_values.len(),
            });
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(EnsembleValidationError::InvalidLearningRate(self.learning_rate));
        }
        let expected = self.n_iterations();
        for (output, sequence) in self.trees.iter().enumerate() {
            if sequence.len() != expected {
                return Err(EnsembleValidationError::RaggedSequences { output, len: sequence.len(), expected });
            }
            if !self.initial_values[output].is_finite() {
                return Err(EnsembleValidationError::NonFiniteInitialValue(output));
            }
            for (tree_idx, tree) in sequence.iter().enumerate() {
                tree.validate(self.n_features)
                    .map_err(|error| EnsembleValidationError::InvalidTree { output, tree: tree_idx, error })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::TreeBuilder;
    use ndarray::array;

    fn stump(threshold: f64, left: f64, right: f64) -> RegressionTree {
        let mut b = TreeBuilder::new();
        let root = b.init_root();
        let (l, r) = b.apply_split(root, 0, threshold, 1.0, 2);
        b.make_leaf(l, left, 1);
        b.make_leaf(r, right, 1);
        b.freeze()
    }

    #[test]
    fn margins_add_scaled_trees() {
        let ensemble = Ensemble::new(
            vec![vec![stump(0.5, -1.0, 1.0), stump(1.5, 0.0, 2.0)]],
            vec![10.0],
            0.5,
            1,
        );
        assert_eq!(ensemble.margin_row(0, array![0.0].view()), 9.5);
        assert_eq!(ensemble.margin_row(0, array![2.0].view()), 11.5);

        let x = array![[0.0], [1.0], [2.0]];
        let margins = ensemble.margins(x.view(), Parallelism::Sequential);
        assert_eq!(margins, vec![vec![9.5, 10.5, 11.5]]);
    }

    #[test]
    fn truncate_keeps_prefix() {
        let mut ensemble = Ensemble::new(
            vec![vec![stump(0.5, -1.0, 1.0), stump(1.5, 0.0, 2.0)]; 2],
            vec![0.0, 0.0],
            1.0,
            1,
        );
        ensemble.truncate(1);
        assert_eq!(ensemble.n_iterations(), 1);
        assert_eq!(ensemble.trees(1).len(), 1);
        assert_eq!(ensemble.iter_trees().count(), 2);
    }

    #[test]
    fn validate_detects_ragged_sequences() {
        let ensemble = Ensemble::new(
            vec![vec![stump(0.5, 0.0, 1.0)], vec![]],
            vec![0.0, 0.0],
            0.1,
            1,
        );
        assert_eq!(
            ensemble.validate(),
            Err(EnsembleValidationError::RaggedSequences { output: 1, len: 0, expected: 1 })
        );
    }

    #[test]
    fn validate_detects_bad_trees() {
        let ensemble = Ensemble::new(vec![vec![stump(0.5, 0.0, 1.0)]], vec![0.0], 0.1, 0);
        assert!(matches!(
            ensemble.validate(),
            Err(EnsembleValidationError::InvalidTree { output: 0, tree: 0, .. })
        ));
    }
}

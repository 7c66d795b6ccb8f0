//! Presorted exact-greedy regression tree learner.
//!
//! Trees are grown depth-wise, one level at a time. For every level the
//! learner walks each feature's presorted row order once, skipping rows that
//! are out of sample or belong to a finished node, and keeps per-node running
//! counts and residual sums. Every boundary between consecutive distinct
//! values of a node is a candidate split.
//!
//! Features are scanned in parallel when allowed; the per-node winners are
//! then reduced in ascending feature order, so the tree does not depend on
//! the thread count. Ties resolve to the lowest feature id, then the lowest
//! threshold.

use ndarray::ArrayView2;

use crate::data::ColumnOrderIndex;
use crate::repr::{NodeId, RegressionTree, TreeBuilder};
use crate::training::loss::{LeafInputs, LossFn, ResidualUpdate};
use crate::training::split::{keep_best, split_threshold, SplitCandidate, SplitParams};
use crate::utils::Parallelism;

/// Marks rows that are out of sample or sit in a finished node.
const NO_SLOT: u32 = u32::MAX;

/// Per-row buffers for one tree fit. All slices are indexed by global row id.
#[derive(Clone, Copy, Debug)]
pub struct TreeInputs<'a> {
    pub observations: ArrayView2<'a, f64>,
    pub targets: &'a [f64],
    pub residuals: &'a [f64],
    pub predictions: &'a [f64],
    pub order: &'a ColumnOrderIndex,
    pub in_sample: &'a [bool],
    pub residual_update: ResidualUpdate,
}

impl TreeInputs<'_> {
    fn leaf_inputs(&self) -> LeafInputs<'_> {
        LeafInputs {
            targets: self.targets,
            predictions: self.predictions,
            residuals: self.residuals,
            update: self.residual_update,
        }
    }
}

/// A node waiting to be split or turned into a leaf.
#[derive(Clone, Copy, Debug)]
struct FrontierNode {
    id: NodeId,
    depth: usize,
    count: usize,
    sum: f64,
}

/// Running state of one node during a single feature scan.
#[derive(Clone, Copy, Debug, Default)]
struct ScanState {
    count_left: usize,
    sum_left: f64,
    last_value: Option<f64>,
    best: Option<SplitCandidate>,
}

/// Grows one regression tree to the current residuals.
#[derive(Clone, Debug)]
pub struct TreeLearner {
    params: SplitParams,
    parallelism: Parallelism,
}

impl TreeLearner {
    pub fn new(params: SplitParams, parallelism: Parallelism) -> Self {
        Self { params, parallelism }
    }

    pub fn params(&self) -> &SplitParams {
        &self.params
    }

    /// Fit a tree on the in-sample rows of `inputs`.
    ///
    /// Leaves take `loss.leaf_value` over their in-sample rows; a node with no
    /// in-sample rows outputs 0.
    pub fn learn<L: LossFn + ?Sized>(&self, loss: &L, inputs: &TreeInputs<'_>) -> RegressionTree {
        let n_rows = inputs.in_sample.len();
        let mut builder = TreeBuilder::new();
        let root = builder.init_root();

        // Frontier slot of each row's current node, or NO_SLOT.
        let mut row_slot = vec![NO_SLOT; n_rows];
        let mut root_node = FrontierNode { id: root, depth: 0, count: 0, sum: 0.0 };
        for (row, &in_sample) in inputs.in_sample.iter().enumerate() {
            if in_sample {
                row_slot[row] = 0;
                root_node.count += 1;
                root_node.sum += inputs.residuals[row];
            }
        }

        let mut frontier = vec![root_node];
        let leaf_inputs = inputs.leaf_inputs();

        while !frontier.is_empty() {
            let splittable: Vec<bool> = frontier
                .iter()
                .map(|node| self.params.can_split(node.depth, node.count))
                .collect();
            let best = if splittable.iter().any(|&s| s) {
                self.find_best_splits(inputs, &row_slot, &frontier, &splittable)
            } else {
                vec![None; frontier.len()]
            };

            // Rows of each frontier node in ascending row order.
            let mut slot_rows: Vec<Vec<u32>> = frontier.iter().map(|n| Vec::with_capacity(n.count)).collect();
            for (row, &slot) in row_slot.iter().enumerate() {
                if slot != NO_SLOT {
                    slot_rows[slot as usize].push(row as u32);
                }
            }

            let mut next_frontier = Vec::new();
            for (slot, node) in frontier.iter().enumerate() {
                let rows = &slot_rows[slot];
                let split = best[slot].filter(|c| self.params.accepts_gain(c.gain));

                let Some(split) = split else {
                    let value = if rows.is_empty() { 0.0 } else { loss.leaf_value(rows, &leaf_inputs) };
                    builder.make_leaf(node.id, value, node.count as u32);
                    for &row in rows {
                        row_slot[row as usize] = NO_SLOT;
                    }
                    continue;
                };

                let (left_id, right_id) = builder.apply_split(
                    node.id,
                    split.feature,
                    split.threshold,
                    split.gain,
                    node.count as u32,
                );
                let left_slot = next_frontier.len() as u32;
                let mut left = FrontierNode { id: left_id, depth: node.depth + 1, count: 0, sum: 0.0 };
                let mut right = FrontierNode { id: right_id, depth: node.depth + 1, count: 0, sum: 0.0 };

                let column = inputs.observations.column(split.feature as usize);
                for &row in rows {
                    let row = row as usize;
                    let (child, child_slot) = if column[row] <= split.threshold {
                        (&mut left, left_slot)
                    } else {
                        (&mut right, left_slot + 1)
                    };
                    child.count += 1;
                    child.sum += inputs.residuals[row];
                    row_slot[row] = child_slot;
                }
                debug_assert_eq!(left.count, split.count_left);
                debug_assert_eq!(right.count, split.count_right);

                next_frontier.push(left);
                next_frontier.push(right);
            }

            frontier = next_frontier;
        }

        builder.freeze()
    }

    /// Best valid split for every splittable frontier node.
    fn find_best_splits(
        &self,
        inputs: &TreeInputs<'_>,
        row_slot: &[u32],
        frontier: &[FrontierNode],
        splittable: &[bool],
    ) -> Vec<Option<SplitCandidate>> {
        let n_features = inputs.order.n_features();
        let per_feature = self.parallelism.maybe_par_map(0..n_features, |feature| {
            self.scan_feature(feature, inputs, row_slot, frontier, splittable)
        });

        // Sequential reduction in feature order keeps ties on the lowest id.
        let mut best = vec![None; frontier.len()];
        for candidates in per_feature {
            for (slot, candidate) in candidates.into_iter().enumerate() {
                if let Some(candidate) = candidate {
                    keep_best(&mut best[slot], candidate);
                }
            }
        }
        best
    }

    /// Walk one feature's sorted order, tracking the best split per node.
    fn scan_feature(
        &self,
        feature: usize,
        inputs: &TreeInputs<'_>,
        row_slot: &[u32],
        frontier: &[FrontierNode],
        splittable: &[bool],
    ) -> Vec<Option<SplitCandidate>> {
        let mut states = vec![ScanState::default(); frontier.len()];

        for (row, value) in inputs.order.feature(feature).iter() {
            let slot = row_slot[row];
            if slot == NO_SLOT || !splittable[slot as usize] {
                continue;
            }
            let node = &frontier[slot as usize];
            let state = &mut states[slot as usize];

            if let Some(last) = state.last_value {
                if value > last {
                    let count_right = node.count - state.count_left;
                    if self.params.is_valid_split(state.count_left, count_right) {
                        let sum_right = node.sum - state.sum_left;
                        let gain = self.params.compute_gain(
                            state.sum_left,
                            state.count_left,
                            sum_right,
                            count_right,
                        );
                        keep_best(
                            &mut state.best,
                            SplitCandidate {
                                feature: feature as u32,
                                threshold: split_threshold(last, value),
                                gain,
                                count_left: state.count_left,
                                count_right,
                            },
                        );
                    }
                }
            }

            state.count_left += 1;
            state.sum_left += inputs.residuals[row];
            state.last_value = Some(value);
        }

        states.into_iter().map(|s| s.best).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::loss::SquaredLoss;
    use ndarray::{array, Array2};

    struct Fixture {
        observations: Array2<f64>,
        targets: Vec<f64>,
        residuals: Vec<f64>,
        predictions: Vec<f64>,
        order: ColumnOrderIndex,
        in_sample: Vec<bool>,
    }

    impl Fixture {
        /// Squared loss at prediction 0, so residuals equal targets.
        fn new(observations: Array2<f64>, targets: Vec<f64>) -> Self {
            let n = targets.len();
            let order = ColumnOrderIndex::build(observations.view(), Parallelism::Sequential);
            Self {
                observations,
                residuals: targets.clone(),
                targets,
                predictions: vec![0.0; n],
                order,
                in_sample: vec![true; n],
            }
        }

        fn inputs(&self) -> TreeInputs<'_> {
            TreeInputs {
                observations: self.observations.view(),
                targets: &self.targets,
                residuals: &self.residuals,
                predictions: &self.predictions,
                order: &self.order,
                in_sample: &self.in_sample,
                residual_update: ResidualUpdate::default(),
            }
        }
    }

    fn learner(max_depth: usize, min_split_size: usize) -> TreeLearner {
        TreeLearner::new(
            SplitParams { max_depth, min_split_size, min_information_gain: 1e-6 },
            Parallelism::Sequential,
        )
    }

    #[test]
    fn finds_single_threshold() {
        let fx = Fixture::new(array![[1.0], [2.0], [3.0], [4.0]], vec![-0.5, -0.5, 0.5, 0.5]);
        let tree = learner(1, 1).learn(&SquaredLoss, &fx.inputs());

        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.split_feature(0), 0);
        assert_eq!(tree.threshold(0), 2.5);
        assert_eq!(tree.leaf_value(tree.left_child(0)), -0.5);
        assert_eq!(tree.leaf_value(tree.right_child(0)), 0.5);
        assert_eq!(tree.gains()[0], 1.0);
    }

    #[test]
    fn identical_features_tie_to_lowest_id() {
        let fx = Fixture::new(
            array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]],
            vec![0.0, 0.0, 1.0, 1.0],
        );
        let tree = learner(1, 1).learn(&SquaredLoss, &fx.inputs());
        assert_eq!(tree.split_feature(0), 0);
    }

    #[test]
    fn equal_gain_thresholds_tie_to_lowest() {
        let fx = Fixture::new(array![[1.0], [2.0], [3.0]], vec![1.0, 0.0, 1.0]);
        let tree = learner(1, 1).learn(&SquaredLoss, &fx.inputs());
        assert_eq!(tree.threshold(0), 1.5);
    }

    #[test]
    fn min_split_size_bounds_leaves() {
        let x = Array2::from_shape_fn((10, 1), |(r, _)| r as f64);
        let targets: Vec<f64> = (0..10).map(|i| (i * i) as f64).collect();
        let fx = Fixture::new(x, targets);
        let tree = learner(5, 3).learn(&SquaredLoss, &fx.inputs());

        for node in 0..tree.n_nodes() as NodeId {
            if tree.is_leaf(node) {
                assert!(tree.covers()[node as usize] >= 3);
            }
        }
        assert!(tree.n_leaves() <= 3);
    }

    #[test]
    fn no_split_for_constant_residuals() {
        let fx = Fixture::new(array![[1.0], [2.0], [3.0]], vec![2.0, 2.0, 2.0]);
        let tree = learner(3, 1).learn(&SquaredLoss, &fx.inputs());
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.leaf_value(0), 2.0);
    }

    #[test]
    fn no_split_for_constant_feature() {
        let fx = Fixture::new(array![[7.0], [7.0], [7.0]], vec![1.0, 5.0, 9.0]);
        let tree = learner(3, 1).learn(&SquaredLoss, &fx.inputs());
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.leaf_value(0), 5.0);
    }

    #[test]
    fn out_of_sample_rows_are_ignored() {
        let mut fx = Fixture::new(array![[1.0], [2.0], [3.0], [4.0]], vec![0.0, 0.0, 1.0, 100.0]);
        fx.in_sample[3] = false;
        let tree = learner(1, 1).learn(&SquaredLoss, &fx.inputs());

        assert_eq!(tree.threshold(0), 2.5);
        assert_eq!(tree.leaf_value(tree.right_child(0)), 1.0);
        assert_eq!(tree.covers()[0], 3);
    }

    #[test]
    fn depth_is_bounded() {
        let x = Array2::from_shape_fn((32, 2), |(r, c)| ((r * (c + 3)) % 17) as f64);
        let targets: Vec<f64> = (0..32).map(|i| ((i * 7) % 5) as f64).collect();
        let fx = Fixture::new(x, targets);
        for depth in 1..=4 {
            let tree = learner(depth, 1).learn(&SquaredLoss, &fx.inputs());
            assert!(tree.depth() <= depth);
            assert!(tree.validate(2).is_ok());
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let x = Array2::from_shape_fn((64, 5), |(r, c)| ((r * 31 + c * 17) % 23) as f64);
        let targets: Vec<f64> = (0..64).map(|i| ((i * 13) % 7) as f64 - 3.0).collect();
        let fx = Fixture::new(x, targets);
        let params = SplitParams { max_depth: 4, min_split_size: 2, min_information_gain: 1e-6 };

        let seq = TreeLearner::new(params.clone(), Parallelism::Sequential).learn(&SquaredLoss, &fx.inputs());
        let par = TreeLearner::new(params, Parallelism::Parallel).learn(&SquaredLoss, &fx.inputs());
        assert_eq!(seq, par);
    }
}

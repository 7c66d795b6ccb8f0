//! Stage-wise boosting orchestrator.
//!
//! Runs the iterations x outputs loop shared by the classification and
//! regression learners: residual updates, optional row subsampling, one tree
//! fit per output per iteration, shrinkage and tree storage. Use
//! [`Booster::train`] on already validated inputs.

use ndarray::ArrayView2;

use crate::data::{mask_from_indices, ColumnOrderIndex};
use crate::repr::{Ensemble, RegressionTree};
use crate::training::callback::{EarlyStopAction, EarlyStopping};
use crate::training::logger::{TrainingLogger, Verbosity};
use crate::training::loss::LossFn;
use crate::training::sampling::{sample_size, RowSampler};
use crate::training::split::SplitParams;
use crate::training::tree::{TreeInputs, TreeLearner};
use crate::utils::Parallelism;

// =============================================================================
// BoostParams
// =============================================================================

/// Parameters for boosting.
#[derive(Clone, Debug)]
pub struct BoostParams {
    /// Number of boosting iterations (trees per output).
    pub iterations: usize,
    /// Shrinkage applied to every tree's output.
    pub learning_rate: f64,
    /// Fraction of the training rows drawn for each tree; 1.0 disables
    /// subsampling.
    pub subsample_ratio: f64,
    /// Tree growth constraints.
    pub split: SplitParams,
    /// Seed of the row sampler.
    pub seed: u64,
    pub verbosity: Verbosity,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            iterations: 100,
            learning_rate: 0.1,
            subsample_ratio: 1.0,
            split: SplitParams::default(),
            seed: 42,
            verbosity: Verbosity::default(),
        }
    }
}

// =============================================================================
// ValidationSet
// =============================================================================

/// Scores raw validation margins (one vector per output).
pub type MarginScorer<'a> = Box<dyn Fn(&[Vec<f64>]) -> f64 + 'a>;

/// Held-out rows monitored for early stopping.
///
/// Margins are maintained incrementally: after each iteration the new trees
/// are added, then the scorer turns the margins into a metric value.
pub struct ValidationSet<'a> {
    observations: ArrayView2<'a, f64>,
    scorer: MarginScorer<'a>,
    metric_name: &'static str,
    early_stopping: EarlyStopping,
    margins: Vec<Vec<f64>>,
}

impl<'a> ValidationSet<'a> {
    pub fn new(
        observations: ArrayView2<'a, f64>,
        scorer: MarginScorer<'a>,
        metric_name: &'static str,
        higher_is_better: bool,
        patience: usize,
    ) -> Self {
        Self {
            observations,
            scorer,
            metric_name,
            early_stopping: EarlyStopping::new(patience, higher_is_better),
            margins: Vec::new(),
        }
    }

    fn start(&mut self, initial_values: &[f64]) {
        let n_rows = self.observations.nrows();
        self.margins = initial_values.iter().map(|&v| vec![v; n_rows]).collect();
    }

    /// Add one iteration's trees and score the result.
    fn update(&mut self, trees: &[&RegressionTree], learning_rate: f64, parallelism: Parallelism) -> f64 {
        for (margins, tree) in self.margins.iter_mut().zip(trees) {
            tree.accumulate_into(self.observations, margins, learning_rate, parallelism);
        }
        (self.scorer)(&self.margins)
    }

    /// Zero-based best iteration seen so far.
    pub fn best_round(&self) -> usize {
        self.early_stopping.best_round()
    }
}

// =============================================================================
// Booster
// =============================================================================

/// Boosting orchestrator over a loss strategy.
pub struct Booster<'l, L: LossFn + ?Sized> {
    loss: &'l L,
    params: BoostParams,
}

impl<'l, L: LossFn + ?Sized> Booster<'l, L> {
    pub fn new(loss: &'l L, params: BoostParams) -> Self {
        Self { loss, params }
    }

    pub fn params(&self) -> &BoostParams {
        &self.params
    }

    /// Fit one tree sequence per entry of `output_targets`.
    ///
    /// `indices` is the non-empty, in-bounds training subset; inputs must
    /// already be validated. Outputs are fitted in order within each
    /// iteration, and one seeded sampler is consumed sequentially, so the
    /// result is a deterministic function of the inputs and the seed.
    ///
    /// With a validation set, training stops once its metric fails to improve
    /// for the configured patience, and the ensemble is truncated to the best
    /// iteration.
    pub fn train(
        &self,
        observations: ArrayView2<f64>,
        output_targets: &[Vec<f64>],
        indices: &[usize],
        mut validation: Option<&mut ValidationSet<'_>>,
        parallelism: Parallelism,
    ) -> Ensemble {
        let (n_rows, n_features) = observations.dim();
        let n_outputs = output_targets.len();
        let params = &self.params;

        let mut logger = TrainingLogger::new(params.verbosity);
        logger.start_training(params.iterations, indices.len(), n_features, n_outputs);

        let order = ColumnOrderIndex::build(observations, parallelism);
        let base_mask = mask_from_indices(indices, n_rows);

        let initial_values: Vec<f64> = output_targets
            .iter()
            .map(|targets| self.loss.initial_value(targets, &base_mask))
            .collect();
        let mut predictions: Vec<Vec<f64>> = initial_values.iter().map(|&v| vec![v; n_rows]).collect();
        let mut residuals = vec![0.0; n_rows];

        let subsample = params.subsample_ratio < 1.0;
        let mut sampler = subsample.then(|| RowSampler::new(params.seed, indices, n_rows));
        let n_sampled = sample_size(params.subsample_ratio, indices.len());
        if subsample && n_sampled < 2 * params.split.min_split_size {
            logger.warn(&format!(
                "subsample of {n_sampled} rows is below 2 * min_split_size; every tree will be a single leaf"
            ));
        }

        let tree_learner = TreeLearner::new(params.split.clone(), parallelism);
        let mut trees: Vec<Vec<RegressionTree>> =
            (0..n_outputs).map(|_| Vec::with_capacity(params.iterations)).collect();

        if let Some(validation) = validation.as_deref_mut() {
            validation.start(&initial_values);
        }

        for round in 0..params.iterations {
            for output in 0..n_outputs {
                let targets = &output_targets[output];
                let residual_update =
                    self.loss.update_residuals(targets, &predictions[output], &mut residuals, &base_mask);

                let sampled;
                let in_sample: &[bool] = match sampler.as_mut() {
                    Some(sampler) => {
                        sampled = sampler.sample(n_sampled);
                        &sampled
                    }
                    None => &base_mask,
                };

                let tree = tree_learner.learn(
                    self.loss,
                    &TreeInputs {
                        observations: observations.reborrow(),
                        targets,
                        residuals: &residuals,
                        predictions: &predictions[output],
                        order: &order,
                        in_sample,
                        residual_update,
                    },
                );
                logger.log_tree(round, output, tree.n_nodes(), tree.n_leaves(), tree.depth());

                tree.accumulate_into(observations, &mut predictions[output], params.learning_rate, parallelism);
                trees[output].push(tree);
            }

            if let Some(validation) = validation.as_deref_mut() {
                let latest: Vec<&RegressionTree> = trees.iter().filter_map(|seq| seq.last()).collect();
                let value = validation.update(&latest, params.learning_rate, parallelism);
                logger.log_metric(round, validation.metric_name, value);

                if validation.early_stopping.update(value) == EarlyStopAction::Stop {
                    logger.log_early_stopping(round, validation.best_round(), validation.metric_name);
                    break;
                }
            }
        }

        let mut ensemble = Ensemble::new(trees, initial_values, params.learning_rate, n_features);
        if let Some(validation) = validation {
            ensemble.truncate(validation.best_round() + 1);
        }
        logger.finish_training(ensemble.n_iterations() * n_outputs);
        ensemble
    }
}

//! Gradient boosting regression.

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{FeatureImportance, GbmConfig, ModelValidationError};
use crate::data::{check_feature_count, validate_training_inputs};
use crate::error::ConfigError;
use crate::learner::{Learner, Predictor};
use crate::repr::Ensemble;
use crate::training::{Booster, Loss, LossFn, MarginScorer, RegressionMetric, TaskKind, ValidationSet};
use crate::utils::{run_with_threads, Parallelism};
use crate::Result;

// =============================================================================
// RegressionModel
// =============================================================================

/// Trained boosting regressor: `initial + learning_rate * sum(tree(row))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionModel {
    loss: Loss,
    ensemble: Ensemble,
}

impl RegressionModel {
    pub(crate) fn new(loss: Loss, ensemble: Ensemble) -> Self {
        Self { loss, ensemble }
    }

    pub fn loss(&self) -> &Loss {
        &self.loss
    }

    pub fn ensemble(&self) -> &Ensemble {
        &self.ensemble
    }

    pub fn n_features(&self) -> usize {
        self.ensemble.n_features()
    }

    pub fn n_iterations(&self) -> usize {
        self.ensemble.n_iterations()
    }

    pub fn feature_importance(&self) -> FeatureImportance {
        FeatureImportance::from_ensemble(&self.ensemble)
    }

    /// Check structural consistency (used after loading).
    pub fn validate(&self) -> std::result::Result<(), ModelValidationError> {
        if self.loss.task() != TaskKind::Regression {
            return Err(ModelValidationError::LossTaskMismatch {
                loss: self.loss.name(),
                task: TaskKind::Regression.name(),
            });
        }
        if self.ensemble.n_outputs() != 1 {
            return Err(ModelValidationError::OutputCount(self.ensemble.n_outputs()));
        }
        self.ensemble.validate()?;
        Ok(())
    }
}

impl Predictor for RegressionModel {
    fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64> {
        check_feature_count(self.n_features(), row.len())?;
        Ok(self.loss.output_transform().apply(self.ensemble.margin_row(0, row)))
    }

    fn predict(&self, observations: ArrayView2<f64>) -> Result<Array1<f64>> {
        check_feature_count(self.n_features(), observations.ncols())?;
        let transform = self.loss.output_transform();
        let margins = self.ensemble.margins(observations, Parallelism::from_threads(0));
        Ok(margins[0].iter().map(|&m| transform.apply(m)).collect())
    }
}

// =============================================================================
// RegressionLearner
// =============================================================================

/// Gradient boosting regression learner.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use sgboost::{GbmConfig, Loss, Predictor, RegressionLearner};
///
/// let x = array![[0.0], [1.0], [2.0], [3.0]];
/// let y = [1.0, 1.0, 5.0, 5.0];
/// let config = GbmConfig::builder()
///     .loss(Loss::squared())
///     .iterations(1)
///     .learning_rate(1.0)
///     .build()
///     .unwrap();
///
/// let model = RegressionLearner::new(config).unwrap().learn(x.view(), &y, None).unwrap();
/// assert_eq!(model.predict_row(array![3.0].view()).unwrap(), 5.0);
/// ```
#[derive(Debug, Clone)]
pub struct RegressionLearner {
    config: GbmConfig,
}

impl RegressionLearner {
    /// # Errors
    ///
    /// Fails if the configuration is invalid or its loss is not a regression
    /// loss.
    pub fn new(config: GbmConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        config.loss.expect_task(TaskKind::Regression)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GbmConfig {
        &self.config
    }

    /// Fit on the rows in `indices` (all rows when `None`).
    pub fn learn(
        &self,
        observations: ArrayView2<f64>,
        targets: &[f64],
        indices: Option<&[usize]>,
    ) -> Result<RegressionModel> {
        self.fit(observations, targets, indices, None)
    }

    /// Fit while monitoring `metric` on a validation set; stops after
    /// `patience` iterations without improvement and keeps the best
    /// iteration count.
    pub fn learn_with_early_stopping(
        &self,
        observations: ArrayView2<f64>,
        targets: &[f64],
        valid_observations: ArrayView2<f64>,
        valid_targets: &[f64],
        metric: RegressionMetric,
        patience: usize,
    ) -> Result<RegressionModel> {
        self.fit(
            observations,
            targets,
            None,
            Some((valid_observations, valid_targets, metric, patience)),
        )
    }

    fn fit(
        &self,
        observations: ArrayView2<f64>,
        targets: &[f64],
        indices: Option<&[usize]>,
        validation: Option<(ArrayView2<f64>, &[f64], RegressionMetric, usize)>,
    ) -> Result<RegressionModel> {
        let indices = validate_training_inputs(observations, targets, indices)?;
        if let Some((valid_observations, valid_targets, _, _)) = validation {
            check_feature_count(observations.ncols(), valid_observations.ncols())?;
            validate_training_inputs(valid_observations, valid_targets, None)?;
        }

        let loss = self.config.loss;
        let booster = Booster::new(&loss, self.config.boost_params());
        let transform = loss.output_transform();
        let output_targets = [targets.to_vec()];

        let ensemble = run_with_threads(self.config.thread_count(), |parallelism| {
            let mut validation_set = validation.map(|(valid_observations, valid_targets, metric, patience)| {
                let scorer: MarginScorer<'_> = Box::new(move |margins: &[Vec<f64>]| {
                    let predictions: Vec<f64> = margins[0].iter().map(|&m| transform.apply(m)).collect();
                    metric.compute(&predictions, valid_targets)
                });
                ValidationSet::new(valid_observations.reborrow(), scorer, metric.name(), metric.higher_is_better(), patience)
            });
            booster.train(observations, &output_targets, &indices, validation_set.as_mut(), parallelism)
        })?;

        Ok(RegressionModel::new(loss, ensemble))
    }
}

impl Learner for RegressionLearner {
    type Model = RegressionModel;

    fn learn(
        &self,
        observations: ArrayView2<f64>,
        targets: &[f64],
        indices: Option<&[usize]>,
    ) -> Result<RegressionModel> {
        RegressionLearner::learn(self, observations, targets, indices)
    }
}

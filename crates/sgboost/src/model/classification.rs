//! One-vs-all gradient boosting classification.
//!
//! Class labels are the distinct in-sample target values, sorted ascending.
//! With exactly two labels a single tree sequence is fitted for the larger
//! label and `P(larger) = sigmoid(margin)`. Otherwise one sequence per label is
//! fitted on 0/1 membership targets; each label's sigmoid output is then
//! renormalized so the probabilities sum to 1.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{FeatureImportance, GbmConfig, ModelValidationError};
use crate::data::{check_feature_count, distinct_sorted, mask_from_indices, validate_training_inputs};
use crate::error::ConfigError;
use crate::learner::{Learner, Predictor, ProbabilityPrediction, ProbabilityPredictor};
use crate::repr::Ensemble;
use crate::training::{
    argmax, Booster, ClassificationMetric, Loss, LossFn, MarginScorer, OutputTransform, TaskKind,
    ValidationSet,
};
use crate::utils::{run_with_threads, Parallelism};
use crate::Result;

// =============================================================================
// Margin -> probability
// =============================================================================

/// Class probabilities (in label order) from the raw margins of one row.
fn probabilities_from_margins(margins: &[f64], n_labels: usize, transform: OutputTransform) -> Vec<f64> {
    if n_labels == 2 && margins.len() == 1 {
        let p = transform.apply(margins[0]);
        return vec![1.0 - p, p];
    }
    let mut probabilities: Vec<f64> = margins.iter().map(|&m| transform.apply(m)).collect();
    let total: f64 = probabilities.iter().sum();
    if total > 0.0 {
        probabilities.iter_mut().for_each(|p| *p /= total);
    } else {
        let uniform = 1.0 / probabilities.len() as f64;
        probabilities.iter_mut().for_each(|p| *p = uniform);
    }
    probabilities
}

/// Probability matrix (rows x labels) from per-output margin vectors.
fn probability_matrix(margins: &[Vec<f64>], n_rows: usize, n_labels: usize, transform: OutputTransform) -> Array2<f64> {
    let mut out = Array2::zeros((n_rows, n_labels));
    let mut row_margins = vec![0.0; margins.len()];
    for (row, mut out_row) in out.rows_mut().into_iter().enumerate() {
        for (m, output) in row_margins.iter_mut().zip(margins) {
            *m = output[row];
        }
        let probabilities = probabilities_from_margins(&row_margins, n_labels, transform);
        out_row.iter_mut().zip(probabilities).for_each(|(o, p)| *o = p);
    }
    out
}

/// One-vs-all target vectors for the fitted tree sequences.
fn one_vs_all_targets(targets: &[f64], labels: &[f64]) -> Vec<Vec<f64>> {
    let membership = |label: f64| -> Vec<f64> {
        targets.iter().map(|&t| if t == label { 1.0 } else { 0.0 }).collect()
    };
    if labels.len() == 2 {
        vec![membership(labels[1])]
    } else {
        labels.iter().map(|&label| membership(label)).collect()
    }
}

// =============================================================================
// ClassificationModel
// =============================================================================

/// Trained one-vs-all boosting classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationModel {
    labels: Vec<f64>,
    loss: Loss,
    ensemble: Ensemble,
}

impl ClassificationModel {
    pub(crate) fn new(labels: Vec<f64>, loss: Loss, ensemble: Ensemble) -> Self {
        Self { labels, loss, ensemble }
    }

    /// Class labels in ascending order.
    pub fn labels(&self) -> &[f64] {
        &self.labels
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

    /// Trees per fitted class.
    pub fn n_iterations(&self) -> usize {
        self.ensemble.n_iterations()
    }

    pub fn feature_importance(&self) -> FeatureImportance {
        FeatureImportance::from_ensemble(&self.ensemble)
    }

    /// Raw margins, one column per fitted tree sequence.
    pub fn predict_margin(&self, observations: ArrayView2<f64>) -> Result<Array2<f64>> {
        check_feature_count(self.n_features(), observations.ncols())?;
        let margins = self.ensemble.margins(observations, Parallelism::from_threads(0));
        Ok(Array2::from_shape_fn((observations.nrows(), margins.len()), |(row, k)| margins[k][row]))
    }

    /// Class probabilities, one column per label in ascending label order.
    pub fn predict_probability_matrix(&self, observations: ArrayView2<f64>) -> Result<Array2<f64>> {
        check_feature_count(self.n_features(), observations.ncols())?;
        let margins = self.ensemble.margins(observations, Parallelism::from_threads(0));
        Ok(probability_matrix(
            &margins,
            observations.nrows(),
            self.labels.len(),
            self.loss.output_transform(),
        ))
    }

    fn row_prediction(&self, probabilities: &[f64]) -> ProbabilityPrediction {
        let best = argmax(probabilities.iter().copied());
        ProbabilityPrediction {
            prediction: self.labels[best],
            probabilities: self.labels.iter().copied().zip(probabilities.iter().copied()).collect(),
        }
    }

    /// Check structural consistency (used after loading).
    pub fn validate(&self) -> std::result::Result<(), ModelValidationError> {
        if self.loss.task() != TaskKind::Classification {
            return Err(ModelValidationError::LossTaskMismatch {
                loss: self.loss.name(),
                task: TaskKind::Classification.name(),
            });
        }
        let sorted = self.labels.iter().all(|l| l.is_finite())
            && self.labels.windows(2).all(|w| w[0] < w[1]);
        if !sorted {
            return Err(ModelValidationError::UnsortedLabels);
        }
        let outputs = self.ensemble.n_outputs();
        let expected = if self.labels.len() == 2 { 1 } else { self.labels.len() };
        if outputs != expected {
            return Err(ModelValidationError::LabelCountMismatch { labels: self.labels.len(), outputs });
        }
        self.ensemble.validate()?;
        Ok(())
    }
}

impl Predictor for ClassificationModel {
    /// The most probable label.
    fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64> {
        Ok(self.predict_probability_row(row)?.prediction)
    }

    fn predict(&self, observations: ArrayView2<f64>) -> Result<Array1<f64>> {
        let probabilities = self.predict_probability_matrix(observations)?;
        Ok(probabilities
            .rows()
            .into_iter()
            .map(|row| self.labels[argmax(row.iter().copied())])
            .collect())
    }
}

impl ProbabilityPredictor for ClassificationModel {
    fn predict_probability_row(&self, row: ArrayView1<f64>) -> Result<ProbabilityPrediction> {
        check_feature_count(self.n_features(), row.len())?;
        let margins = self.ensemble.margins_row(row);
        let probabilities =
            probabilities_from_margins(&margins, self.labels.len(), self.loss.output_transform());
        Ok(self.row_prediction(&probabilities))
    }

    fn predict_probability(&self, observations: ArrayView2<f64>) -> Result<Vec<ProbabilityPrediction>> {
        let probabilities = self.predict_probability_matrix(observations)?;
        Ok(probabilities
            .rows()
            .into_iter()
            .map(|row| self.row_prediction(&row.to_vec()))
            .collect())
    }
}

// =============================================================================
// ClassificationLearner
// =============================================================================

/// Gradient boosting classification learner.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use sgboost::{ClassificationLearner, GbmConfig, Loss, Predictor};
///
/// let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]];
/// let y = [1.0, 1.0, 2.0, 2.0, 3.0, 3.0];
/// let config = GbmConfig::builder().loss(Loss::binomial()).iterations(20).build().unwrap();
///
/// let model = ClassificationLearner::new(config).unwrap().learn(x.view(), &y, None).unwrap();
/// assert_eq!(model.labels(), &[1.0, 2.0, 3.0]);
/// assert_eq!(model.predict(x.view()).unwrap().to_vec(), y.to_vec());
/// ```
#[derive(Debug, Clone)]
pub struct ClassificationLearner {
    config: GbmConfig,
}

impl ClassificationLearner {
    /// # Errors
    ///
    /// Fails if the configuration is invalid or its loss is not a
    /// classification loss.
    pub fn new(config: GbmConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        config.loss.expect_task(TaskKind::Classification)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GbmConfig {
        &self.config
    }

    /// Fit on the rows in `indices` (all rows when `None`).
    ///
    /// Rows outside `indices` never influence the model: not through labels,
    /// initial values, residuals or splits.
    pub fn learn(
        &self,
        observations: ArrayView2<f64>,
        targets: &[f64],
        indices: Option<&[usize]>,
    ) -> Result<ClassificationModel> {
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
        metric: ClassificationMetric,
        patience: usize,
    ) -> Result<ClassificationModel> {
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
        validation: Option<(ArrayView2<f64>, &[f64], ClassificationMetric, usize)>,
    ) -> Result<ClassificationModel> {
        let indices = validate_training_inputs(observations, targets, indices)?;
        if let Some((valid_observations, valid_targets, _, _)) = validation {
            check_feature_count(observations.ncols(), valid_observations.ncols())?;
            validate_training_inputs(valid_observations, valid_targets, None)?;
        }

        let mask = mask_from_indices(&indices, observations.nrows());
        let labels = distinct_sorted(targets, &mask);
        let class_targets = one_vs_all_targets(targets, &labels);

        let loss = self.config.loss;
        let booster = Booster::new(&loss, self.config.boost_params());
        let transform = loss.output_transform();

        let ensemble = run_with_threads(self.config.thread_count(), |parallelism| {
            let labels = &labels;
            let mut validation_set = validation.map(|(valid_observations, valid_targets, metric, patience)| {
                let scorer: MarginScorer<'_> = Box::new(move |margins: &[Vec<f64>]| {
                    let probabilities = probability_matrix(margins, valid_targets.len(), labels.len(), transform);
                    metric.compute(labels, probabilities.view(), valid_targets)
                });
                ValidationSet::new(valid_observations.reborrow(), scorer, metric.name(), metric.higher_is_better(), patience)
            });
            booster.train(observations, &class_targets, &indices, validation_set.as_mut(), parallelism)
        })?;

        Ok(ClassificationModel::new(labels, loss, ensemble))
    }
}

impl Learner for ClassificationLearner {
    type Model = ClassificationModel;

    fn learn(
        &self,
        observations: ArrayView2<f64>,
        targets: &[f64],
        indices: Option<&[usize]>,
    ) -> Result<ClassificationModel> {
        ClassificationLearner::learn(self, observations, targets, indices)
    }
}

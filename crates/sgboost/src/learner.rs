//! Learner and predictor contracts.
//!
//! These traits let generic code (such as [`cross_validate`]) train and query
//! models without knowing whether they classify or regress.
//!
//! [`cross_validate`]: crate::evaluation::cv::cross_validate

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Something that fits a model to observations and targets.
pub trait Learner {
    type Model: Predictor;

    /// Fit on the rows in `indices` (all rows when `None`).
    fn learn(
        &self,
        observations: ArrayView2<f64>,
        targets: &[f64],
        indices: Option<&[usize]>,
    ) -> Result<Self::Model>;
}

/// Point predictions.
pub trait Predictor {
    /// Prediction for one row.
    fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64>;

    /// Predictions for every row.
    fn predict(&self, observations: ArrayView2<f64>) -> Result<Array1<f64>>;
}

/// Predicted label together with the probability of every label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityPrediction {
    /// Most probable label (the lowest one on ties).
    pub prediction: f64,
    /// `(label, probability)` pairs in ascending label order, summing to 1.
    pub probabilities: Vec<(f64, f64)>,
}

impl ProbabilityPrediction {
    /// Probability of `label`, if it is a known label.
    pub fn probability_of(&self, label: f64) -> Option<f64> {
        self.probabilities
            .iter()
            .find(|(l, _)| *l == label)
            .map(|&(_, p)| p)
    }
}

/// Class probability predictions.
pub trait ProbabilityPredictor: Predictor {
    fn predict_probability_row(&self, row: ArrayView1<f64>) -> Result<ProbabilityPrediction>;

    fn predict_probability(&self, observations: ArrayView2<f64>) -> Result<Vec<ProbabilityPrediction>>;
}

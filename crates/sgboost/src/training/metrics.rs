//! Evaluation metrics.
//!
//! Used for early stopping on a validation set and for cross-validation
//! summaries.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Probabilities are clamped away from 0 before taking logs.
const LOG_EPS: f64 = 1e-15;

// =============================================================================
// Regression
// =============================================================================

/// Regression metric over predicted values. Lower is better for all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RegressionMetric {
    /// Mean squared error.
    Mse,
    /// Root mean squared error.
    #[default]
    Rmse,
    /// Mean absolute error.
    Mae,
}

impl RegressionMetric {
    pub fn compute(self, predictions: &[f64], targets: &[f64]) -> f64 {
        debug_assert_eq!(predictions.len(), targets.len());
        let n = predictions.len();
        if n == 0 {
            return 0.0;
        }
        let sum: f64 = predictions
            .iter()
            .zip(targets)
            .map(|(&p, &t)| match self {
                RegressionMetric::Mse | RegressionMetric::Rmse => (p - t) * (p - t),
                RegressionMetric::Mae => (p - t).abs(),
            })
            .sum();
        let mean = sum / n as f64;
        match self {
            RegressionMetric::Rmse => mean.sqrt(),
            _ => mean,
        }
    }

    pub fn higher_is_better(self) -> bool {
        false
    }

    pub fn name(self) -> &'static str {
        match self {
            RegressionMetric::Mse => "mse",
            RegressionMetric::Rmse => "rmse",
            RegressionMetric::Mae => "mae",
        }
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Classification metric over class probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClassificationMetric {
    /// Mean negative log-probability of the true label.
    #[default]
    LogLoss,
    /// Fraction of rows whose most probable label is wrong.
    Error,
}

impl ClassificationMetric {
    /// Evaluate `probabilities` (rows x labels, columns in `labels` order)
    /// against `targets`.
    ///
    /// A target that is not one of `labels` counts as probability 0.
    pub fn compute(self, labels: &[f64], probabilities: ArrayView2<f64>, targets: &[f64]) -> f64 {
        debug_assert_eq!(probabilities.nrows(), targets.len());
        let n = targets.len();
        if n == 0 {
            return 0.0;
        }
        let total: f64 = probabilities
            .rows()
            .into_iter()
            .zip(targets)
            .map(|(row, &target)| {
                let true_col = labels.iter().position(|&l| l == target);
                match self {
                    ClassificationMetric::LogLoss => {
                        let p = true_col.map_or(0.0, |c| row[c]);
                        -p.max(LOG_EPS).ln()
                    }
                    ClassificationMetric::Error => {
                        let predicted = argmax(row.iter().copied());
                        if Some(predicted) == true_col {
                            0.0
                        } else {
                            1.0
                        }
                    }
                }
            })
            .sum();
        total / n as f64
    }

    pub fn higher_is_better(self) -> bool {
        false
    }

    pub fn name(self) -> &'static str {
        match self {
            ClassificationMetric::LogLoss => "logloss",
            ClassificationMetric::Error => "error",
        }
    }
}

/// Index of the largest value; the first one on ties.
pub(crate) fn argmax(values: impl IntoIterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, v) in values.into_iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

//! Loss strategies for gradient boosting.
//!
//! A loss strategy supplies the four pieces the booster and tree learner need:
//! the optimal constant start value, the pseudo-residuals of the current
//! predictions, the loss-specific output of a leaf, and the transform mapping
//! a raw margin to the model output.
//!
//! # Available Losses
//!
//! ## Classification
//! - [`BinomialLoss`]: binomial deviance, Newton-step leaves
//!
//! ## Regression
//! - [`SquaredLoss`]: least squares
//! - [`AbsoluteLoss`]: least absolute deviation
//! - [`HuberLoss`]: Huber loss with a quantile-based transition point
//! - [`QuantileLoss`]: pinball loss for quantile regression
//!
//! All per-row buffers are indexed by global row id. Only rows whose mask
//! entry is `true` are read or written.

mod classification;
mod regression;

pub use classification::BinomialLoss;
pub use regression::{AbsoluteLoss, HuberLoss, QuantileLoss, SquaredLoss};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// =============================================================================
// Supporting Types
// =============================================================================

/// High-level task implied by a loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    Classification,
    Regression,
}

impl TaskKind {
    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Classification => "classification",
            TaskKind::Regression => "regression",
        }
    }
}

/// Mapping from a raw margin to the model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputTransform {
    #[default]
    Identity,
    Sigmoid,
}

impl OutputTransform {
    #[inline]
    pub fn apply(self, margin: f64) -> f64 {
        match self {
            OutputTransform::Identity => margin,
            OutputTransform::Sigmoid => sigmoid(margin),
        }
    }
}

/// Logistic function.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Auxiliary state produced by a residual update and consumed by leaf fits
/// of the same tree.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResidualUpdate {
    /// Huber transition point for the current stage.
    pub delta: Option<f64>,
}

/// Per-row buffers available to [`LossFn::leaf_value`].
#[derive(Debug, Clone, Copy)]
pub struct LeafInputs<'a> {
    pub targets: &'a [f64],
    pub predictions: &'a [f64],
    pub residuals: &'a [f64],
    pub update: ResidualUpdate,
}

// =============================================================================
// LossFn Trait
// =============================================================================

/// A loss strategy.
///
/// Implementations are pure: no hidden randomness and no side effects beyond
/// the residual buffer handed to [`update_residuals`](Self::update_residuals).
pub trait LossFn: Send + Sync {
    /// Optimal constant prediction over the masked rows.
    fn initial_value(&self, targets: &[f64], mask: &[bool]) -> f64;

    /// Write the pseudo-residuals of `predictions` for every masked row.
    fn update_residuals(
        &self,
        targets: &[f64],
        predictions: &[f64],
        residuals: &mut [f64],
        mask: &[bool],
    ) -> ResidualUpdate;

    /// Output of a leaf containing `rows` (non-empty, all in-sample).
    fn leaf_value(&self, rows: &[u32], inputs: &LeafInputs<'_>) -> f64;

    fn output_transform(&self) -> OutputTransform;

    fn task(&self) -> TaskKind;

    /// Name of the loss (for logging and errors).
    fn name(&self) -> &'static str;
}

// =============================================================================
// Loss Enum
// =============================================================================

/// Loss selection for [`GbmConfig`](crate::GbmConfig).
///
/// Wraps every concrete loss and implements [`LossFn`] by delegating.
///
/// # Example
///
/// ```
/// use sgboost::{Loss, LossFn, TaskKind};
///
/// let loss = Loss::huber(0.9);
/// assert_eq!(loss.task(), TaskKind::Regression);
/// assert!(loss.validate().is_ok());
/// assert!(Loss::quantile(1.5).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Loss {
    Binomial(BinomialLoss),
    Squared(SquaredLoss),
    Absolute(AbsoluteLoss),
    Huber(HuberLoss),
    Quantile(QuantileLoss),
}

impl Loss {
    /// Binomial deviance for classification.
    pub fn binomial() -> Self {
        Self::Binomial(BinomialLoss)
    }

    /// Least squares for regression.
    pub fn squared() -> Self {
        Self::Squared(SquaredLoss)
    }

    /// Least absolute deviation for regression.
    pub fn absolute() -> Self {
        Self::Absolute(AbsoluteLoss)
    }

    /// Huber loss; `alpha` selects the quantile of absolute residuals used as
    /// transition point.
    pub fn huber(alpha: f64) -> Self {
        Self::Huber(HuberLoss::new(alpha))
    }

    /// Pinball loss for the `alpha` quantile.
    pub fn quantile(alpha: f64) -> Self {
        Self::Quantile(QuantileLoss::new(alpha))
    }

    /// Check loss parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let check_alpha = |loss: &'static str, value: f64| {
            if value > 0.0 && value < 1.0 {
                Ok(())
            } else {
                Err(ConfigError::InvalidLossParameter { loss, value })
            }
        };
        match self {
            Self::Huber(inner) => check_alpha("huber", inner.alpha),
            Self::Quantile(inner) => check_alpha("quantile", inner.alpha),
            Self::Binomial(_) | Self::Squared(_) | Self::Absolute(_) => Ok(()),
        }
    }

    /// Fail unless the loss serves `task`.
    pub fn expect_task(&self, task: TaskKind) -> Result<(), ConfigError> {
        if self.task() == task {
            Ok(())
        } else {
            Err(ConfigError::LossTaskMismatch { loss: self.name(), task: task.name() })
        }
    }
}

impl LossFn for Loss {
    fn initial_value(&self, targets: &[f64], mask: &[bool]) -> f64 {
        match self {
            Self::Binomial(inner) => inner.initial_value(targets, mask),
            Self::Squared(inner) => inner.initial_value(targets, mask),
            Self::Absolute(inner) => inner.initial_value(targets, mask),
            Self::Huber(inner) => inner.initial_value(targets, mask),
            Self::Quantile(inner) => inner.initial_value(targets, mask),
        }
    }

    fn update_residuals(
        &self,
        targets: &[f64],
        predictions: &[f64],
        residuals: &mut [f64],
        mask: &[bool],
    ) -> ResidualUpdate {
        match self {
            Self::Binomial(inner) => inner.update_residuals(targets, predictions, residuals, mask),
            Self::Squared(inner) => inner.update_residuals(targets, predictions, residuals, mask),
            Self::Absolute(inner) => inner.update_residuals(targets, predictions, residuals, mask),
            Self::Huber(inner) => inner.update_residuals(targets, predictions, residuals, mask),
            Self::Quantile(inner) => inner.update_residuals(targets, predictions, residuals, mask),
        }
    }

    fn leaf_value(&self, rows: &[u32], inputs: &LeafInputs<'_>) -> f64 {
        match self {
            Self::Binomial(inner) => inner.leaf_value(rows, inputs),
            Self::Squared(inner) => inner.leaf_value(rows, inputs),
            Self::Absolute(inner) => inner.leaf_value(rows, inputs),
            Self::Huber(inner) => inner.leaf_value(rows, inputs),
            Self::Quantile(inner) => inner.leaf_value(rows, inputs),
        }
    }

    fn output_transform(&self) -> OutputTransform {
        match self {
            Self::Binomial(inner) => inner.output_transform(),
            Self::Squared(inner) => inner.output_transform(),
            Self::Absolute(inner) => inner.output_transform(),
            Self::Huber(inner) => inner.output_transform(),
            Self::Quantile(inner) => inner.output_transform(),
        }
    }

    fn task(&self) -> TaskKind {
        match self {
            Self::Binomial(inner) => inner.task(),
            Self::Squared(inner) => inner.task(),
            Self::Absolute(inner) => inner.task(),
            Self::Huber(inner) => inner.task(),
            Self::Quantile(inner) => inner.task(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Binomial(inner) => inner.name(),
            Self::Squared(inner) => inner.name(),
            Self::Absolute(inner) => inner.name(),
            Self::Huber(inner) => inner.name(),
            Self::Quantile(inner) => inner.name(),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Values of masked rows, in row order.
pub(crate) fn masked_values(values: &[f64], mask: &[bool]) -> Vec<f64> {
    values
        .iter()
        .zip(mask)
        .filter_map(|(&v, &m)| m.then_some(v))
        .collect()
}

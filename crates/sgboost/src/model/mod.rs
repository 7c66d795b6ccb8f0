//! High-level learners and trained models.
//!
//! - [`ClassificationLearner`] fits a [`ClassificationModel`] (one-vs-all,
//!   probability output)
//! - [`RegressionLearner`] fits a [`RegressionModel`]
//! - [`GbmConfig`] configures both
//! - [`FeatureImportance`] summarizes split gains of a trained model

mod classification;
mod config;
mod importance;
mod regression;

pub use classification::{ClassificationLearner, ClassificationModel};
pub use config::{GbmConfig, GbmConfigBuilder};
pub use importance::FeatureImportance;
pub use regression::{RegressionLearner, RegressionModel};

use crate::repr::EnsembleValidationError;

/// Structural errors of a trained (or loaded) model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Ensemble(#[from] EnsembleValidationError),

    #[error("loss `{loss}` does not produce a {task} model")]
    LossTaskMismatch { loss: &'static str, task: &'static str },

    #[error("{labels} class labels cannot be served by {outputs} tree sequences")]
    LabelCountMismatch { labels: usize, outputs: usize },

    #[error("class labels must be finite and strictly ascending")]
    UnsortedLabels,

    #[error("regression model must have exactly one tree sequence, got {0}")]
    OutputCount(usize),
}

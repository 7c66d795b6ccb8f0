//! sgboost: stage-wise gradient boosting with presorted regression trees.
//!
//! An additive ensemble of shallow regression trees is fitted to the
//! pseudo-residuals of a loss function, one stage at a time. Trees are grown
//! with an exact-greedy split search over per-feature presorted row orders,
//! multiclass problems use one-vs-all targets, and stochastic gradient
//! boosting is available through seeded row subsampling.
//!
//! # Key Types
//!
//! - [`ClassificationLearner`] / [`ClassificationModel`] - one-vs-all classification
//! - [`RegressionLearner`] / [`RegressionModel`] - regression
//! - [`GbmConfig`] - validated configuration builder
//! - [`Loss`] / [`LossFn`] - loss strategies
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use sgboost::{ClassificationLearner, GbmConfig, Loss, ProbabilityPredictor};
//!
//! let observations = array![[1.0], [2.0], [3.0], [4.0]];
//! let targets = [0.0, 0.0, 1.0, 1.0];
//!
//! let config = GbmConfig::builder()
//!     .loss(Loss::binomial())
//!     .iterations(1)
//!     .learning_rate(1.0)
//!     .max_tree_depth(1)
//!     .build()
//!     .unwrap();
//!
//! let learner = ClassificationLearner::new(config).unwrap();
//! let model = learner.learn(observations.view(), &targets, None).unwrap();
//! let prediction = model.predict_probability_row(array![4.0].view()).unwrap();
//! assert_eq!(prediction.prediction, 1.0);
//! ```

// Re-export approx traits for users who want to compare predictions
pub use approx;

pub mod data;
pub mod error;
pub mod evaluation;
pub mod learner;
pub mod model;
pub mod persist;
pub mod repr;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use error::{ConfigError, GbmError, Result, ShapeError, ValidationError};
pub use learner::{Learner, ProbabilityPrediction, Predictor, ProbabilityPredictor};
pub use model::{
    ClassificationLearner, ClassificationModel, FeatureImportance, GbmConfig,
    RegressionLearner, RegressionModel,
};
pub use repr::RegressionTree;
pub use training::{ClassificationMetric, Loss, LossFn, RegressionMetric, TaskKind, Verbosity};
pub use utils::{run_with_threads, Parallelism};

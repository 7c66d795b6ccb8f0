//! Training infrastructure for gradient boosting.
//!
//! ## Shared Infrastructure
//!
//! - [`Booster`], [`BoostParams`]: stage-wise boosting loop
//! - [`TreeLearner`]: presorted exact-greedy regression tree growth
//! - [`RowSampler`]: seeded row subsampling
//! - [`EarlyStopping`]: stops when a validation metric plateaus
//! - [`TrainingLogger`], [`Verbosity`]: `tracing`-based progress logging
//!
//! ## Losses
//!
//! - [`Loss`]: configuration enum over every loss strategy
//! - [`LossFn`]: the loss strategy trait
//!
//! ## Metrics
//!
//! - [`RegressionMetric`]: MSE, RMSE, MAE
//! - [`ClassificationMetric`]: log loss, error rate

pub mod booster;
mod callback;
mod logger;
pub mod loss;
mod metrics;
pub mod sampling;
pub mod split;
pub mod tree;

pub use booster::{BoostParams, Booster, MarginScorer, ValidationSet};
pub use callback::{EarlyStopAction, EarlyStopping};
pub use logger::{TrainingLogger, Verbosity};
pub use loss::{
    AbsoluteLoss, BinomialLoss, HuberLoss, Loss, LossFn, OutputTransform, QuantileLoss,
    SquaredLoss, TaskKind,
};
pub(crate) use metrics::argmax;
pub use metrics::{ClassificationMetric, RegressionMetric};
pub use sampling::RowSampler;
pub use split::SplitParams;
pub use tree::{TreeInputs, TreeLearner};

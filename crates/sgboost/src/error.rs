//! Error types.
//!
//! Configuration problems surface when a [`GbmConfig`](crate::GbmConfig) is
//! built or a learner is constructed, before any data is touched. Shape and
//! validation problems surface at the start of a fit or predict call, before
//! any partial work is done. Degenerate numerics (no valid split, vanishing
//! Newton denominators) never surface: the tree learner falls back to a leaf.

use thiserror::Error;

use crate::persist::PersistError;

/// Crate-wide result alias.
pub type Result<T, E = GbmError> = std::result::Result<T, E>;

/// Invalid hyperparameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("iterations must be at least 1")]
    InvalidIterations,

    #[error("learning_rate must be finite and positive, got {0}")]
    InvalidLearningRate(f64),

    #[error("max_tree_depth must be at least 1")]
    InvalidMaxTreeDepth,

    #[error("min_split_size must be at least 1")]
    InvalidMinSplitSize,

    #[error("min_information_gain must be finite and positive, got {0}")]
    InvalidMinInformationGain(f64),

    #[error("subsample_ratio must be in (0, 1], got {0}")]
    InvalidSubsampleRatio(f64),

    #[error("{loss} alpha must be in (0, 1), got {value}")]
    InvalidLossParameter { loss: &'static str, value: f64 },

    #[error("loss `{loss}` cannot be used for {task}")]
    LossTaskMismatch { loss: &'static str, task: &'static str },

    #[error("n_folds must be at least 2, got {0}")]
    InvalidFoldCount(usize),
}

/// Mismatched array shapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("number of targets ({targets}) does not match number of rows ({rows})")]
    TargetLenMismatch { rows: usize, targets: usize },

    #[error("expected {expected} features, got {got}")]
    FeatureCountMismatch { expected: usize, got: usize },

    #[error("observation matrix has no rows")]
    NoRows,

    #[error("observation matrix has no feature columns")]
    NoFeatures,
}

/// Malformed input values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("index set is empty")]
    EmptyIndices,

    #[error("row index {index} is out of bounds for {rows} rows")]
    IndexOutOfBounds { index: usize, rows: usize },

    #[error("non-finite feature value {value} at row {row}, column {col}")]
    NonFiniteFeature { row: usize, col: usize, value: f64 },

    #[error("non-finite target value {value} at row {row}")]
    NonFiniteTarget { row: usize, value: f64 },

    #[error("fold count {n_folds} exceeds number of rows {rows}")]
    TooFewRowsForFolds { n_folds: usize, rows: usize },
}

/// Top-level error for fit, predict and persistence calls.
#[derive(Debug, Error)]
pub enum GbmError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("shape mismatch: {0}")]
    Shape(#[from] ShapeError),

    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("persistence failed: {0}")]
    Persist(#[from] PersistError),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

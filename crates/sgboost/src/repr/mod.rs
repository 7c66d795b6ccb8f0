//! Model representation shared by training, inference and persistence.

mod ensemble;
mod tree;

pub use ensemble::{Ensemble, EnsembleValidationError};
pub use tree::{NodeId, RegressionTree, TreeBuilder, TreeValidationError};

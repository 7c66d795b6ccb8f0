//! Model evaluation.
//!
//! - [`cv`] - seeded k-fold splitting and out-of-fold predictions

pub mod cv;

pub use cv::{cross_validate, CrossValidation, KFold};

//! Boosting configuration with builder pattern.
//!
//! [`GbmConfig`] holds every hyperparameter of a fit. The builder is generated
//! by `bon`; `build()` validates the values before any data is touched.
//!
//! # Example
//!
//! ```
//! use sgboost::{GbmConfig, Loss};
//!
//! let config = GbmConfig::builder()
//!     .loss(Loss::squared())
//!     .iterations(200)
//!     .learning_rate(0.05)
//!     .max_tree_depth(4)
//!     .subsample_ratio(0.8)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.seed, 42);
//!
//! assert!(GbmConfig::builder().loss(Loss::squared()).iterations(0).build().is_err());
//! ```

use std::num::NonZeroUsize;

use bon::Builder;

use crate::error::ConfigError;
use crate::training::{BoostParams, Loss, SplitParams, Verbosity};

/// Configuration for gradient boosting.
///
/// The loss has no default: classification and regression need different
/// losses, and each learner checks that the loss fits its task.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct GbmConfig {
    /// Loss strategy.
    pub loss: Loss,

    /// Number of boosting iterations. Default: 100.
    #[builder(default = 100)]
    pub iterations: usize,

    /// Shrinkage applied to each tree. Default: 0.1.
    #[builder(default = 0.1)]
    pub learning_rate: f64,

    /// Maximum tree depth (root = depth 0). Default: 3.
    #[builder(default = 3)]
    pub max_tree_depth: usize,

    /// Minimum in-sample rows in each child of a split. Default: 1.
    #[builder(default = 1)]
    pub min_split_size: usize,

    /// Minimum gain for a split to be accepted. Default: 1e-6.
    #[builder(default = 1e-6)]
    pub min_information_gain: f64,

    /// Fraction of training rows drawn for each tree. Default: 1.0 (no
    /// subsampling).
    #[builder(default = 1.0)]
    pub subsample_ratio: f64,

    /// Number of threads. `None` uses all available cores.
    pub n_threads: Option<NonZeroUsize>,

    /// Seed of the row sampler. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    /// Verbosity level. Default: `Warning`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the config.
impl<S: gbm_config_builder::IsComplete> GbmConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is invalid:
    /// - `iterations == 0`
    /// - `learning_rate` not finite and positive
    /// - `max_tree_depth == 0` or `min_split_size == 0`
    /// - `min_information_gain` not finite and positive
    /// - `subsample_ratio` outside (0, 1]
    /// - loss parameters out of range
    pub fn build(self) -> Result<GbmConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl GbmConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::InvalidIterations);
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::InvalidLearningRate(self.learning_rate));
        }
        if self.max_tree_depth == 0 {
            return Err(ConfigError::InvalidMaxTreeDepth);
        }
        if self.min_split_size == 0 {
            return Err(ConfigError::InvalidMinSplitSize);
        }
        if !(self.min_information_gain.is_finite() && self.min_information_gain > 0.0) {
            return Err(ConfigError::InvalidMinInformationGain(self.min_information_gain));
        }
        if !(self.subsample_ratio > 0.0 && self.subsample_ratio <= 1.0) {
            return Err(ConfigError::InvalidSubsampleRatio(self.subsample_ratio));
        }
        self.loss.validate()
    }

    /// Thread count for [`run_with_threads`](crate::run_with_threads)
    /// (0 = all cores).
    pub fn thread_count(&self) -> usize {
        self.n_threads.map_or(0, NonZeroUsize::get)
    }

    pub(crate) fn boost_params(&self) -> BoostParams {
        BoostParams {
            iterations: self.iterations,
            learning_rate: self.learning_rate,
            subsample_ratio: self.subsample_ratio,
            split: SplitParams {
                max_depth: self.max_tree_depth,
                min_split_size: self.min_split_size,
                min_information_gain: self.min_information_gain,
            },
            seed: self.seed,
            verbosity: self.verbosity,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults() {
        let config = GbmConfig::builder().loss(Loss::binomial()).build().unwrap();
        assert_eq!(config.iterations, 100);
        assert_eq!(config.learning_rate, 0.1);
        assert_eq!(config.max_tree_depth, 3);
        assert_eq!(config.min_split_size, 1);
        assert_eq!(config.min_information_gain, 1e-6);
        assert_eq!(config.subsample_ratio, 1.0);
        assert_eq!(config.seed, 42);
        assert_eq!(config.thread_count(), 0);
    }

    #[test]
    fn invalid_iterations() {
        let result = GbmConfig::builder().loss(Loss::squared()).iterations(0).build();
        assert!(matches!(result, Err(ConfigError::InvalidIterations)));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-0.1)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn invalid_learning_rate(#[case] lr: f64) {
        let result = GbmConfig::builder().loss(Loss::squared()).learning_rate(lr).build();
        assert!(matches!(result, Err(ConfigError::InvalidLearningRate(_))));
    }

    #[test]
    fn invalid_tree_shape() {
        let result = GbmConfig::builder().loss(Loss::squared()).max_tree_depth(0).build();
        assert!(matches!(result, Err(ConfigError::InvalidMaxTreeDepth)));

        let result = GbmConfig::builder().loss(Loss::squared()).min_split_size(0).build();
        assert!(matches!(result, Err(ConfigError::InvalidMinSplitSize)));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::NAN)]
    fn invalid_min_information_gain(#[case] gain: f64) {
        let result = GbmConfig::builder()
            .loss(Loss::squared())
            .min_information_gain(gain)
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidMinInformationGain(_))));
    }

    #[rstest]
    #[case(0.0, false)]
    #[case(1e-9, true)]
    #[case(1.0, true)]
    #[case(1.0001, false)]
    #[case(f64::NAN, false)]
    fn subsample_ratio_range(#[case] ratio: f64, #[case] valid: bool) {
        let result = GbmConfig::builder().loss(Loss::squared()).subsample_ratio(ratio).build();
        assert_eq!(result.is_ok(), valid);
    }

    #[test]
    fn invalid_loss_parameter() {
        let result = GbmConfig::builder().loss(Loss::huber(1.0)).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidLossParameter { loss: "huber", .. })
        ));
    }

    #[test]
    fn boost_params_mirror_config() {
        let config = GbmConfig::builder()
            .loss(Loss::squared())
            .max_tree_depth(5)
            .min_split_size(4)
            .n_threads(NonZeroUsize::new(2).unwrap())
            .build()
            .unwrap();
        let params = config.boost_params();
        assert_eq!(params.split.max_depth, 5);
        assert_eq!(params.split.min_split_size, 4);
        assert_eq!(config.thread_count(), 2);
    }
}

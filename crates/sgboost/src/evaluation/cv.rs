//! K-fold cross-validation.
//!
//! Rows are shuffled once with a seeded [`Xoshiro256PlusPlus`] and dealt into
//! `n_folds` contiguous chunks whose sizes differ by at most one. Each fold is
//! held out in turn: the learner fits on the remaining rows through its index
//! set (the observation matrix is never copied) and the held-out rows are
//! predicted by the resulting model.
//!
//! Training and test rows are disjoint in every fold, and every row is held
//! out exactly once.

use ndarray::{Array1, ArrayView2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::data::validate_training_inputs;
use crate::error::{ConfigError, ValidationError};
use crate::learner::{Learner, Predictor};
use crate::Result;

// ============================================================================
// Fold splitting
// ============================================================================

/// Seeded k-fold splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KFold {
    n_folds: usize,
    seed: u64,
}

impl KFold {
    /// # Errors
    ///
    /// [`ConfigError::InvalidFoldCount`] when `n_folds < 2`.
    pub fn new(n_folds: usize, seed: u64) -> std::result::Result<Self, ConfigError> {
        if n_folds < 2 {
            return Err(ConfigError::InvalidFoldCount(n_folds));
        }
        Ok(Self { n_folds, seed })
    }

    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Held-out rows of each fold, each sorted ascending.
    ///
    /// # Errors
    ///
    /// [`ValidationError::TooFewRowsForFolds`] when a fold would be empty.
    pub fn split(&self, n_rows: usize) -> std::result::Result<Vec<Vec<usize>>, ValidationError> {
        if n_rows < self.n_folds {
            return Err(ValidationError::TooFewRowsForFolds { n_folds: self.n_folds, rows: n_rows });
        }

        let mut rows: Vec<usize> = (0..n_rows).collect();
        rows.shuffle(&mut Xoshiro256PlusPlus::seed_from_u64(self.seed));

        let folds = (0..self.n_folds)
            .map(|fold| {
                let start = fold * n_rows / self.n_folds;
                let end = (fold + 1) * n_rows / self.n_folds;
                let mut test = rows[start..end].to_vec();
                test.sort_unstable();
                test
            })
            .collect();
        Ok(folds)
    }
}

/// Rows not held out in `test` (`test` must be sorted).
fn complement(test: &[usize], n_rows: usize) -> Vec<usize> {
    let mut held_out = vec![false; n_rows];
    for &row in test {
        held_out[row] = true;
    }
    (0..n_rows).filter(|&row| !held_out[row]).collect()
}

// ============================================================================
// Cross-validation
// ============================================================================

/// Out-of-fold predictions of a cross-validation run.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidation {
    /// Prediction for every row, made by the model that did not see it.
    pub predictions: Array1<f64>,
    /// Held-out rows of each fold.
    pub folds: Vec<Vec<usize>>,
}

impl CrossValidation {
    /// Score the out-of-fold predictions with `metric(predictions, targets)`.
    pub fn score<F>(&self, targets: &[f64], metric: F) -> f64
    where
        F: Fn(&[f64], &[f64]) -> f64,
    {
        metric(&self.predictions.to_vec(), targets)
    }
}

/// Fit one model per fold and collect out-of-fold predictions.
///
/// # Errors
///
/// Input validation errors, fold splitting errors and any error returned by
/// the learner or its models.
pub fn cross_validate<L: Learner>(
    learner: &L,
    observations: ArrayView2<f64>,
    targets: &[f64],
    kfold: &KFold,
) -> Result<CrossValidation> {
    validate_training_inputs(observations, targets, None)?;
    let n_rows = observations.nrows();
    let folds = kfold.split(n_rows)?;

    let mut predictions = Array1::zeros(n_rows);
    for (fold, test) in folds.iter().enumerate() {
        let train = complement(test, n_rows);
        tracing::debug!(fold, train = train.len(), test = test.len(), "cross-validation fold");

        let model = learner.learn(observations, targets, Some(&train))?;
        for &row in test {
            predictions[row] = model.predict_row(observations.row(row))?;
        }
    }

    Ok(CrossValidation { predictions, folds })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GbmError;
    use crate::{ClassificationLearner, GbmConfig, Loss, RegressionLearner, RegressionMetric};
    use ndarray::Array2;
    use rstest::rstest;

    #[rstest]
    #[case(0)]
    #[case(1)]
    fn rejects_fewer_than_two_folds(#[case] n_folds: usize) {
        assert_eq!(KFold::new(n_folds, 0), Err(ConfigError::InvalidFoldCount(n_folds)));
    }

    #[test]
    fn folds_partition_rows() {
        let folds = KFold::new(3, 7).unwrap().split(10).unwrap();
        let sizes: Vec<usize> = folds.iter().map(Vec::len).collect();
        assert_eq!(sizes.iter().sum::<usize>(), 10);
        assert!(sizes.iter().all(|&s| s == 3 || s == 4));

        let mut all: Vec<usize> = folds.concat();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn split_is_seeded() {
        let a = KFold::new(4, 1).unwrap().split(40).unwrap();
        let b = KFold::new(4, 1).unwrap().split(40).unwrap();
        let c = KFold::new(4, 2).unwrap().split(40).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn too_few_rows() {
        assert_eq!(
            KFold::new(5, 0).unwrap().split(4),
            Err(ValidationError::TooFewRowsForFolds { n_folds: 5, rows: 4 })
        );
    }

    #[test]
    fn complement_excludes_test_rows() {
        assert_eq!(complement(&[1, 3], 5), vec![0, 2, 4]);
    }

    #[test]
    fn regression_out_of_fold_predictions() {
        let x = Array2::from_shape_fn((40, 1), |(r, _)| r as f64);
        let y: Vec<f64> = (0..40).map(|i| if i < 20 { 1.0 } else { 5.0 }).collect();
        let config = GbmConfig::builder()
            .loss(Loss::squared())
            .iterations(20)
            .learning_rate(0.5)
            .verbosity(crate::Verbosity::Silent)
            .build()
            .unwrap();
        let learner = RegressionLearner::new(config).unwrap();

        let cv = cross_validate(&learner, x.view(), &y, &KFold::new(4, 3).unwrap()).unwrap();
        assert_eq!(cv.predictions.len(), 40);
        assert_eq!(cv.folds.len(), 4);

        let mse = cv.score(&y, |p, t| RegressionMetric::Mse.compute(p, t));
        assert!(mse < 1.0, "out-of-fold mse too large: {mse}");
    }

    #[test]
    fn classification_out_of_fold_labels() {
        let x = Array2::from_shape_fn((30, 1), |(r, _)| r as f64);
        let y: Vec<f64> = (0..30).map(|i| if i < 15 { 2.0 } else { 7.0 }).collect();
        let config = GbmConfig::builder()
            .loss(Loss::binomial())
            .iterations(10)
            .verbosity(crate::Verbosity::Silent)
            .build()
            .unwrap();
        let learner = ClassificationLearner::new(config).unwrap();

        let cv = cross_validate(&learner, x.view(), &y, &KFold::new(3, 11).unwrap()).unwrap();
        assert!(cv.predictions.iter().all(|&p| p == 2.0 || p == 7.0));
        let correct = cv.predictions.iter().zip(&y).filter(|(p, t)| p == t).count();
        assert!(correct >= 27, "only {correct} of 30 rows correct");
    }

    #[test]
    fn propagates_input_errors() {
        let x = Array2::<f64>::zeros((3, 1));
        let config = GbmConfig::builder().loss(Loss::squared()).build().unwrap();
        let learner = RegressionLearner::new(config).unwrap();
        let result = cross_validate(&learner, x.view(), &[1.0, 2.0], &KFold::new(2, 0).unwrap());
        assert!(matches!(result, Err(GbmError::Shape(_))));
    }
}

//! Training data handling.
//!
//! Observations are plain `ndarray` views (rows = examples, columns =
//! features) borrowed for the duration of a call. This module validates them
//! against targets and row subsets, derives in-sample masks, and builds the
//! per-feature [`ColumnOrderIndex`] used by the presorted split search.

mod order;

pub use order::{ColumnOrderIndex, FeatureOrder};

use ndarray::ArrayView2;

use crate::error::{ShapeError, ValidationError};
use crate::Result;

/// Validate a training call and resolve its row subset.
///
/// Checks, in order: non-empty matrix, target length, index set non-empty
/// and in bounds, all feature values finite, in-sample targets finite.
///
/// Returns the index set to train on (all rows when `indices` is `None`).
pub fn validate_training_inputs(
    observations: ArrayView2<f64>,
    targets: &[f64],
    indices: Option<&[usize]>,
) -> Result<Vec<usize>> {
    let (n_rows, n_features) = observations.dim();
    if n_rows == 0 {
        return Err(ShapeError::NoRows.into());
    }
    if n_features == 0 {
        return Err(ShapeError::NoFeatures.into());
    }
    if targets.len() != n_rows {
        return Err(ShapeError::TargetLenMismatch { rows: n_rows, targets: targets.len() }.into());
    }

    let indices = match indices {
        Some(indices) => {
            if indices.is_empty() {
                return Err(ValidationError::EmptyIndices.into());
            }
            if let Some(&index) = indices.iter().find(|&&i| i >= n_rows) {
                return Err(ValidationError::IndexOutOfBounds { index, rows: n_rows }.into());
            }
            indices.to_vec()
        }
        None => (0..n_rows).collect(),
    };

    // The column order index spans every row, so every row must be finite.
    for ((row, col), &value) in observations.indexed_iter() {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteFeature { row, col, value }.into());
        }
    }

    for &row in &indices {
        let value = targets[row];
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteTarget { row, value }.into());
        }
    }

    Ok(indices)
}

/// Check an inference input against the feature count a model was trained on.
#[inline]
pub fn check_feature_count(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(ShapeError::FeatureCountMismatch { expected, got }.into());
    }
    Ok(())
}

/// Build an in-sample mask of length `n_rows` marking every row in `indices`.
pub fn mask_from_indices(indices: &[usize], n_rows: usize) -> Vec<bool> {
    let mut mask = vec![false; n_rows];
    for &i in indices {
        mask[i] = true;
    }
    mask
}

/// Distinct values among masked rows, sorted ascending.
///
/// `-0.0` is folded into `0.0`, matching the `==` comparison used for class
/// membership.
pub fn distinct_sorted(values: &[f64], mask: &[bool]) -> Vec<f64> {
    let mut distinct: Vec<f64> = values
        .iter()
        .zip(mask)
        .filter_map(|(&v, &m)| m.then_some(v + 0.0))
        .collect();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup_by(|a, b| a.total_cmp(b).is_eq());
    distinct
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GbmError;
    use ndarray::array;

    #[test]
    fn all_rows_when_no_indices() {
        let x = array![[1.0], [2.0], [3.0]];
        let rows = validate_training_inputs(x.view(), &[0.0, 1.0, 0.0], None).unwrap();
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn rejects_target_length_mismatch() {
        let x = array![[1.0], [2.0], [3.0]];
        let err = validate_training_inputs(x.view(), &[0.0, 1.0], None).unwrap_err();
        assert!(matches!(
            err,
            GbmError::Shape(ShapeError::TargetLenMismatch { rows: 3, targets: 2 })
        ));
    }

    #[test]
    fn rejects_empty_and_out_of_range_indices() {
        let x = array![[1.0], [2.0]];
        let err = validate_training_inputs(x.view(), &[0.0, 1.0], Some(&[])).unwrap_err();
        assert!(matches!(err, GbmError::Validation(ValidationError::EmptyIndices)));

        let err = validate_training_inputs(x.view(), &[0.0, 1.0], Some(&[0, 2])).unwrap_err();
        assert!(matches!(
            err,
            GbmError::Validation(ValidationError::IndexOutOfBounds { index: 2, rows: 2 })
        ));
    }

    #[test]
    fn rejects_non_finite_features() {
        let x = array![[1.0, 2.0], [f64::NAN, 3.0]];
        let err = validate_training_inputs(x.view(), &[0.0, 1.0], None).unwrap_err();
        assert!(matches!(
            err,
            GbmError::Validation(ValidationError::NonFiniteFeature { row: 1, col: 0, .. })
        ));
    }

    #[test]
    fn non_finite_target_outside_subset_is_ignored() {
        let x = array![[1.0], [2.0], [3.0]];
        let targets = [0.0, f64::INFINITY, 1.0];
        assert!(validate_training_inputs(x.view(), &targets, Some(&[0, 2])).is_ok());
        assert!(validate_training_inputs(x.view(), &targets, None).is_err());
    }

    #[test]
    fn rejects_empty_matrix() {
        let x = ndarray::Array2::<f64>::zeros((0, 2));
        let err = validate_training_inputs(x.view(), &[], None).unwrap_err();
        assert!(matches!(err, GbmError::Shape(ShapeError::NoRows)));
    }

    #[test]
    fn distinct_sorted_respects_mask() {
        let values = [3.0, 1.0, 2.0, 1.0, 9.0];
        let mask = [true, true, true, true, false];
        assert_eq!(distinct_sorted(&values, &mask), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn distinct_sorted_merges_signed_zeros() {
        let values = [-0.0, 0.0, 1.0, -0.0];
        let distinct = distinct_sorted(&values, &[true; 4]);
        assert_eq!(distinct, vec![0.0, 1.0]);
        assert!(distinct[0].is_sign_positive());
    }

    #[test]
    fn mask_collapses_duplicates() {
        assert_eq!(mask_from_indices(&[2, 0, 2], 4), vec![true, false, true, false]);
    }
}

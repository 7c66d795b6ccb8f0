//! Presorted per-feature row orders.
//!
//! For every feature column the index stores the row permutation that sorts
//! observations ascending by that feature, together with the sorted values.
//! Split search walks these orders once per tree level instead of re-sorting
//! rows at every node.
//!
//! ```text
//! feature values: [3.0, 1.0, 2.0, 1.0]
//! rows:           [1, 3, 2, 0]
//! values:         [1.0, 1.0, 2.0, 3.0]
//! ```
//!
//! The sort is stable: rows with equal values keep ascending row order.

use ndarray::ArrayView2;

use crate::utils::Parallelism;

/// Sorted row order of a single feature.
#[derive(Debug, Clone)]
pub struct FeatureOrder {
    rows: Box<[u32]>,
    values: Box<[f64]>,
}

impl FeatureOrder {
    /// Row indices, ascending by feature value.
    #[inline]
    pub fn rows(&self) -> &[u32] {
        &self.rows
    }

    /// Feature values in the same order as [`rows`](Self::rows).
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterate `(row, value)` pairs in ascending value order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.rows.iter().zip(self.values.iter()).map(|(&r, &v)| (r as usize, v))
    }
}

/// Per-feature sorted row orders over all rows of an observation matrix.
///
/// Built once per learn call and shared read-only by every iteration, every
/// class and every split-search thread.
#[derive(Debug, Clone)]
pub struct ColumnOrderIndex {
    features: Vec<FeatureOrder>,
    n_rows: usize,
}

impl ColumnOrderIndex {
    /// Build the index. Values must be finite (checked by input validation).
    pub fn build(observations: ArrayView2<f64>, parallelism: Parallelism) -> Self {
        let (n_rows, n_features) = observations.dim();

        let features = parallelism.maybe_par_map(0..n_features, |feature| {
            let column = observations.column(feature);
            let mut rows: Vec<u32> = (0..n_rows as u32).collect();
            rows.sort_by(|&a, &b| column[a as usize].total_cmp(&column[b as usize]));
            let values: Box<[f64]> = rows.iter().map(|&r| column[r as usize]).collect();
            FeatureOrder { rows: rows.into_boxed_slice(), values }
        });

        Self { features, n_rows }
    }

    /// Sorted order for one feature.
    #[inline]
    pub fn feature(&self, feature: usize) -> &FeatureOrder {
        &self.features[feature]
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }
}

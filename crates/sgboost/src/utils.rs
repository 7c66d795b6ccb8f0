//! Common utilities used across the crate.
//!
//! Quantile helpers for the robust losses, the parallelism flag threaded
//! through training components, and thread pool setup.

use rayon::prelude::*;

// =============================================================================
// Statistical Utilities
// =============================================================================

/// Compute the weighted quantile of a slice using a step function.
///
/// No interpolation: returns the value at the point where the cumulative
/// weight first reaches `alpha * total_weight`.
///
/// # Arguments
/// * `values` - The values to compute the quantile over
/// * `weights` - Optional weights for each value (None = uniform weights)
/// * `alpha` - The quantile level in [0, 1]
/// * `scratch` - Scratch space for sorting indices (resized as needed)
///
/// # Returns
/// The weighted quantile value. Returns `f64::NAN` if values is empty.
#[inline]
pub fn weighted_quantile(
    values: &[f64],
    weights: Option<&[f64]>,
    alpha: f64,
    scratch: &mut Vec<usize>,
) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return values[0];
    }

    scratch.clear();
    scratch.extend(0..n);

    // Stable sort keeps equal values in input order
    scratch.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let total_weight: f64 = match weights {
        Some(w) => w.iter().sum(),
        None => n as f64,
    };
    let threshold = total_weight * alpha;

    let mut cumulative = 0.0f64;
    for &idx in scratch.iter() {
        cumulative += weights.map_or(1.0, |ws| ws[idx]);
        if cumulative >= threshold {
            return values[idx];
        }
    }

    values[scratch[n - 1]]
}

/// Unweighted median (lower median for even lengths).
#[inline]
pub fn median(values: &[f64], scratch: &mut Vec<usize>) -> f64 {
    weighted_quantile(values, None, 0.5, scratch)
}

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// When `Parallel`, components may use `rayon` parallel iterators; when
/// `Sequential`, they must iterate on the calling thread. The thread pool
/// itself is set up once at the learner level via [`run_with_threads`].
///
/// Every parallel section in the crate writes disjoint outputs or reduces in
/// a fixed order, so results never depend on this flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Map over an iterator, preserving input order in the output.
    #[inline]
    pub fn maybe_par_map<T, B, I, F>(self, iter: I, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map(f).collect()
        } else {
            iter.into_iter().map(f).collect()
        }
    }

    /// Apply `f(index, &mut element)` to every element of a slice.
    #[inline]
    pub fn maybe_par_for_each_indexed<T, F>(self, slice: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync + Send,
    {
        if self.is_parallel() {
            slice.par_iter_mut().enumerate().for_each(|(i, x)| f(i, x));
        } else {
            slice.iter_mut().enumerate().for_each(|(i, x)| f(i, x));
        }
    }
}

// =============================================================================
// Thread Pool Setup
// =============================================================================

/// Run a closure with the appropriate thread pool.
///
/// Thread count semantics:
/// - `0` = auto (use all available cores)
/// - `1` = sequential (no thread pool)
/// - `n > 1` = use exactly `n` threads
///
/// # Errors
///
/// Returns the rayon error if a dedicated pool cannot be created.
#[inline]
pub fn run_with_threads<T: Send>(
    n_threads: usize,
    f: impl FnOnce(Parallelism) -> T + Send,
) -> Result<T, rayon::ThreadPoolBuildError> {
    match Parallelism::from_threads(n_threads) {
        Parallelism::Sequential => Ok(f(Parallelism::Sequential)),
        Parallelism::Parallel => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .build()?;
            Ok(pool.install(|| f(Parallelism::Parallel)))
        }
    }
}

//! Row subsampling for stochastic gradient boosting.
//!
//! Each tree may be fit on a random subset of the training rows. The sampler
//! owns a seeded [`Xoshiro256PlusPlus`] and a working copy of the candidate
//! rows; every draw shuffles that copy further and marks its first
//! `sample_size` entries. Draws within one fit are therefore a deterministic
//! function of the seed and the draw count.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Number of rows to draw for a subsample ratio: at least one.
#[inline]
pub fn sample_size(ratio: f64, n_candidates: usize) -> usize {
    ((ratio * n_candidates as f64).round() as usize).clamp(1, n_candidates.max(1))
}

/// Seeded sampler of in-sample masks.
#[derive(Debug, Clone)]
pub struct RowSampler {
    rng: Xoshiro256PlusPlus,
    candidates: Vec<usize>,
    n_rows: usize,
}

impl RowSampler {
    /// Sampler over `candidates` (row ids below `n_rows`).
    pub fn new(seed: u64, candidates: &[usize], n_rows: usize) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            candidates: candidates.to_vec(),
            n_rows,
        }
    }

    /// Shuffle the candidates and mark the first `sample_size` of them.
    ///
    /// Duplicate candidates collapse, so the mask may hold fewer rows.
    pub fn sample(&mut self, sample_size: usize) -> Vec<bool> {
        self.candidates.shuffle(&mut self.rng);
        let mut mask = vec![false; self.n_rows];
        for &row in self.candidates.iter().take(sample_size) {
            mask[row] = true;
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(mask: &[bool]) -> usize {
        mask.iter().filter(|&&m| m).count()
    }

    #[test]
    fn sample_size_rounds_and_clamps() {
        assert_eq!(sample_size(0.5, 10), 5);
        assert_eq!(sample_size(0.25, 10), 3);
        assert_eq!(sample_size(0.01, 10), 1);
        assert_eq!(sample_size(1.0, 7), 7);
    }

    #[test]
    fn mask_has_requested_size_within_candidates() {
        let candidates: Vec<usize> = (0..20).step_by(2).collect();
        let mut sampler = RowSampler::new(42, &candidates, 20);
        let mask = sampler.sample(4);
        assert_eq!(mask.len(), 20);
        assert_eq!(count(&mask), 4);
        assert!(mask.iter().enumerate().all(|(row, &m)| !m || row % 2 == 0));
    }

    #[test]
    fn same_seed_same_sequence() {
        let candidates: Vec<usize> = (0..50).collect();
        let mut a = RowSampler::new(7, &candidates, 50);
        let mut b = RowSampler::new(7, &candidates, 50);
        for _ in 0..5 {
            assert_eq!(a.sample(10), b.sample(10));
        }
    }

    #[test]
    fn successive_draws_differ() {
        let candidates: Vec<usize> = (0..100).collect();
        let mut sampler = RowSampler::new(1, &candidates, 100);
        let first = sampler.sample(50);
        let second = sampler.sample(50);
        assert_ne!(first, second);
    }

    #[test]
    fn different_seeds_differ() {
        let candidates: Vec<usize> = (0..100).collect();
        let a = RowSampler::new(1, &candidates, 100).sample(50);
        let b = RowSampler::new(2, &candidates, 100).sample(50);
        assert_ne!(a, b);
    }
}

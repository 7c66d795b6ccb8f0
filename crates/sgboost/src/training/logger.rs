//! Training progress logging.
//!
//! [`TrainingLogger`] forwards progress to `tracing` events, gated by a
//! [`Verbosity`] level so silent training emits nothing at all. Install any
//! `tracing` subscriber to see the output.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Verbosity level for training output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// No output.
    Silent,
    /// Warnings only.
    #[default]
    Warning,
    /// Start, per-round metrics and summary.
    Info,
    /// Per-tree details.
    Debug,
}

/// Emits training progress at the configured verbosity.
#[derive(Debug)]
pub struct TrainingLogger {
    verbosity: Verbosity,
    start: Option<Instant>,
    n_rounds: usize,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity, start: None, n_rounds: 0 }
    }

    #[inline]
    pub fn enabled(&self, level: Verbosity) -> bool {
        self.verbosity != Verbosity::Silent && self.verbosity >= level
    }

    pub fn start_training(&mut self, n_rounds: usize, n_rows: usize, n_features: usize, n_classes: usize) {
        self.start = Some(Instant::now());
        self.n_rounds = n_rounds;
        if self.enabled(Verbosity::Info) {
            tracing::info!(n_rounds, n_rows, n_features, n_classes, "training started");
        }
    }

    /// Per-tree details.
    pub fn log_tree(&self, round: usize, class: usize, n_nodes: usize, n_leaves: usize, depth: usize) {
        if self.enabled(Verbosity::Debug) {
            tracing::debug!(round, class, n_nodes, n_leaves, depth, "tree fitted");
        }
    }

    /// Validation metric for a round.
    pub fn log_metric(&self, round: usize, metric: &str, value: f64) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(round, metric, value, "[{}/{}] {} = {:.6}", round + 1, self.n_rounds, metric, value);
        }
    }

    pub fn log_early_stopping(&self, round: usize, best_round: usize, metric: &str) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(round, best_round, metric, "early stopping: no improvement in {metric}");
        }
    }

    pub fn warn(&self, message: &str) {
        if self.enabled(Verbosity::Warning) {
            tracing::warn!("{message}");
        }
    }

    pub fn finish_training(&self, n_trees: usize) {
        if self.enabled(Verbosity::Info) {
            let elapsed_ms = self.start.map_or(0, |s| s.elapsed().as_millis() as u64);
            tracing::info!(n_trees, elapsed_ms, "training finished");
        }
    }

    pub fn n_rounds(&self) -> usize {
        self.n_rounds
    }
}

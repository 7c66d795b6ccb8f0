//! Split-gain feature importance.

use crate::repr::Ensemble;

/// Total split gain attributed to each feature over every tree of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureImportance {
    values: Vec<f64>,
}

impl FeatureImportance {
    pub fn from_ensemble(ensemble: &Ensemble) -> Self {
        let mut values = vec![0.0; ensemble.n_features()];
        for tree in ensemble.iter_trees() {
            for node in 0..tree.n_nodes() as u32 {
                if !tree.is_leaf(node) {
                    values[tree.split_feature(node) as usize] += tree.gains()[node as usize];
                }
            }
        }
        Self { values }
    }

    /// Raw gain sums, indexed by feature.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, feature: usize) -> Option<f64> {
        self.values.get(feature).copied()
    }

    /// Importances scaled to sum to 1 (all zero when no split was made).
    pub fn normalized(&self) -> Vec<f64> {
        let total: f64 = self.values.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.values.len()];
        }
        self.values.iter().map(|v| v / total).collect()
    }

    /// The `k` most important `(feature, gain)` pairs, highest first; equal
    /// gains keep ascending feature order.
    pub fn top_k(&self, k: usize) -> Vec<(usize, f64)> {
        let mut ranked: Vec<(usize, f64)> = self.values.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);
        ranked
    }
}

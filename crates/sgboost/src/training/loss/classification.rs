//! Classification losses.

use serde::{Deserialize, Serialize};

use super::{sigmoid, LeafInputs, LossFn, OutputTransform, ResidualUpdate, TaskKind};

/// Probabilities are clamped to this distance from 0 and 1 before taking
/// log-odds.
const PROB_EPS: f64 = 1e-7;

/// Newton leaves whose hessian sum falls below this output 0.
const NEWTON_DENOMINATOR_FLOOR: f64 = 1e-150;

/// Binomial deviance for 0/1 targets.
///
/// - Initial value: log-odds of the positive frequency
/// - Residual: `t - sigmoid(f)`
/// - Leaf: one Newton step, `sum r / sum p(1 - p)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BinomialLoss;

impl LossFn for BinomialLoss {
    fn initial_value(&self, targets: &[f64], mask: &[bool]) -> f64 {
        let (count, positives) = targets
            .iter()
            .zip(mask)
            .filter(|(_, &m)| m)
            .fold((0usize, 0.0f64), |(n, s), (&t, _)| (n + 1, s + t));
        if count == 0 {
            return 0.0;
        }
        let p = (positives / count as f64).clamp(PROB_EPS, 1.0 - PROB_EPS);
        (p / (1.0 - p)).ln()
    }

    fn update_residuals(
        &self,
        targets: &[f64],
        predictions: &[f64],
        residuals: &mut [f64],
        mask: &[bool],
    ) -> ResidualUpdate {
        for (((r, &t), &f), &m) in residuals.iter_mut().zip(targets).zip(predictions).zip(mask) {
            if m {
                *r = t - sigmoid(f);
            }
        }
        ResidualUpdate::default()
    }

    fn leaf_value(&self, rows: &[u32], inputs: &LeafInputs<'_>) -> f64 {
        let (numerator, denominator) = rows.iter().fold((0.0f64, 0.0f64), |(num, den), &row| {
            let row = row as usize;
            let r = inputs.residuals[row];
            // t - r recovers sigmoid(f)
            let p = inputs.targets[row] - r;
            (num + r, den + p * (1.0 - p))
        });
        if denominator.abs() < NEWTON_DENOMINATOR_FLOOR {
            0.0
        } else {
            numerator / denominator
        }
    }

    fn output_transform(&self) -> OutputTransform {
        OutputTransform::Sigmoid
    }

    fn task(&self) -> TaskKind {
        TaskKind::Classification
    }

    fn name(&self) -> &'static str {
        "binomial"
    }
}

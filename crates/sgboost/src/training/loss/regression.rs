//! Regression losses.
//!
//! Robust losses (absolute, Huber, quantile) take quantiles with the
//! step-function [`weighted_quantile`]: no interpolation, so the result is
//! always one of the input values.

use serde::{Deserialize, Serialize};

use super::{masked_values, LeafInputs, LossFn, OutputTransform, ResidualUpdate, TaskKind};
use crate::utils::{median, weighted_quantile};

/// `t - f` for every row of a leaf.
fn leaf_deviations(rows: &[u32], inputs: &LeafInputs<'_>) -> Vec<f64> {
    rows.iter()
        .map(|&row| inputs.targets[row as usize] - inputs.predictions[row as usize])
        .collect()
}

#[inline]
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

// =============================================================================
// Squared Loss
// =============================================================================

/// Least squares.
///
/// - Initial value: mean target
/// - Residual: `t - f`
/// - Leaf: mean residual
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SquaredLoss;

impl LossFn for SquaredLoss {
    fn initial_value(&self, targets: &[f64], mask: &[bool]) -> f64 {
        let (count, sum) = targets
            .iter()
            .zip(mask)
            .filter(|(_, &m)| m)
            .fold((0usize, 0.0f64), |(n, s), (&t, _)| (n + 1, s + t));
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
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
                *r = t - f;
            }
        }
        ResidualUpdate::default()
    }

    fn leaf_value(&self, rows: &[u32], inputs: &LeafInputs<'_>) -> f64 {
        if rows.is_empty() {
            return 0.0;
        }
        let sum: f64 = rows.iter().map(|&row| inputs.residuals[row as usize]).sum();
        sum / rows.len() as f64
    }

    fn output_transform(&self) -> OutputTransform {
        OutputTransform::Identity
    }

    fn task(&self) -> TaskKind {
        TaskKind::Regression
    }

    fn name(&self) -> &'static str {
        "squared"
    }
}

// =============================================================================
// Absolute Loss
// =============================================================================

/// Least absolute deviation.
///
/// - Initial value: median target
/// - Residual: `sign(t - f)`
/// - Leaf: median of `t - f`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AbsoluteLoss;

impl LossFn for AbsoluteLoss {
    fn initial_value(&self, targets: &[f64], mask: &[bool]) -> f64 {
        let values = masked_values(targets, mask);
        if values.is_empty() {
            return 0.0;
        }
        median(&values, &mut Vec::new())
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
                *r = sign(t - f);
            }
        }
        ResidualUpdate::default()
    }

    fn leaf_value(&self, rows: &[u32], inputs: &LeafInputs<'_>) -> f64 {
        if rows.is_empty() {
            return 0.0;
        }
        median(&leaf_deviations(rows, inputs), &mut Vec::new())
    }

    fn output_transform(&self) -> OutputTransform {
        OutputTransform::Identity
    }

    fn task(&self) -> TaskKind {
        TaskKind::Regression
    }

    fn name(&self) -> &'static str {
        "absolute"
    }
}

// =============================================================================
// Huber Loss
// =============================================================================

/// Huber loss.
///
/// The transition point `delta` is recomputed each stage as the
/// `alpha`-quantile of `|t - f|` over in-sample rows. Residuals are `t - f`
/// clipped to `[-delta, delta]`. A leaf takes the median `m` of `t - f` and
/// adds the mean of `sign(d - m) * min(delta, |d - m|)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HuberLoss {
    pub alpha: f64,
}

impl HuberLoss {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }
}

impl Default for HuberLoss {
    fn default() -> Self {
        Self::new(0.9)
    }
}

impl LossFn for HuberLoss {
    fn initial_value(&self, targets: &[f64], mask: &[bool]) -> f64 {
        AbsoluteLoss.initial_value(targets, mask)
    }

    fn update_residuals(
        &self,
        targets: &[f64],
        predictions: &[f64],
        residuals: &mut [f64],
        mask: &[bool],
    ) -> ResidualUpdate {
        let abs_deviations: Vec<f64> = targets
            .iter()
            .zip(predictions)
            .zip(mask)
            .filter_map(|((&t, &f), &m)| m.then_some((t - f).abs()))
            .collect();
        let delta = if abs_deviations.is_empty() {
            0.0
        } else {
            weighted_quantile(&abs_deviations, None, self.alpha, &mut Vec::new())
        };

        for (((r, &t), &f), &m) in residuals.iter_mut().zip(targets).zip(predictions).zip(mask) {
            if m {
                let d = t - f;
                *r = if d.abs() <= delta { d } else { delta * sign(d) };
            }
        }
        ResidualUpdate { delta: Some(delta) }
    }

    fn leaf_value(&self, rows: &[u32], inputs: &LeafInputs<'_>) -> f64 {
        if rows.is_empty() {
            return 0.0;
        }
        let deviations = leaf_deviations(rows, inputs);
        let m = median(&deviations, &mut Vec::new());
        let delta = inputs.update.delta.unwrap_or(f64::INFINITY);
        let correction: f64 = deviations
            .iter()
            .map(|&d| sign(d - m) * delta.min((d - m).abs()))
            .sum();
        m + correction / deviations.len() as f64
    }

    fn output_transform(&self) -> OutputTransform {
        OutputTransform::Identity
    }

    fn task(&self) -> TaskKind {
        TaskKind::Regression
    }

    fn name(&self) -> &'static str {
        "huber"
    }
}

// =============================================================================
// Quantile Loss
// =============================================================================

/// Pinball loss for the `alpha` quantile.
///
/// - Initial value: `alpha`-quantile of targets
/// - Residual: `alpha` if `t > f`, else `-(1 - alpha)`
/// - Leaf: `alpha`-quantile of `t - f`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantileLoss {
    pub alpha: f64,
}

impl QuantileLoss {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }
}

impl Default for QuantileLoss {
    fn default() -> Self {
        Self::new(0.9)
    }
}

impl LossFn for QuantileLoss {
    fn initial_value(&self, targets: &[f64], mask: &[bool]) -> f64 {
        let values = masked_values(targets, mask);
        if values.is_empty() {
            return 0.0;
        }
        weighted_quantile(&values, None, self.alpha, &mut Vec::new())
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
                *r = if t > f { self.alpha } else { -(1.0 - self.alpha) };
            }
        }
        ResidualUpdate::default()
    }

    fn leaf_value(&self, rows: &[u32], inputs: &LeafInputs<'_>) -> f64 {
        if rows.is_empty() {
            return 0.0;
        }
        weighted_quantile(&leaf_deviations(rows, inputs), None, self.alpha, &mut Vec::new())
    }

    fn output_transform(&self) -> OutputTransform {
        OutputTransform::Identity
    }

    fn task(&self) -> TaskKind {
        TaskKind::Regression
    }

    fn name(&self) -> &'static str {
        "quantile"
    }
}

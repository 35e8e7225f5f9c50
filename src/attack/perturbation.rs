//! Trainable perturbation for one batch and its constraint projection

use crate::data::PaddedBatch;
use ndarray::{Array3, ArrayView3, Zip};
use serde::{Deserialize, Serialize};

/// Box constraint on perturbed input values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureBounds {
    pub lower: f32,
    pub upper: f32,
}

impl Default for FeatureBounds {
    fn default() -> Self {
        Self { lower: 0.0, upper: 1.0 }
    }
}

/// Perturbation tensor added to a batch's inputs
///
/// Shape `[batch, max_length, feature_dim]`. Cells at or beyond a sample's
/// true length are held at zero by [`project`](Self::project).
#[derive(Debug, Clone)]
pub struct PerturbationState {
    values: Array3<f32>,
    mask: Array3<f32>,
}

impl PerturbationState {
    /// Zero perturbation sized to `batch`
    pub fn zeros(batch: &PaddedBatch) -> Self {
        Self { values: Array3::zeros(batch.inputs().raw_dim()), mask: batch.validity_mask() }
    }

    pub fn values(&self) -> &Array3<f32> {
        &self.values
    }

    /// Mutable access for the optimizer step
    pub fn values_mut(&mut self) -> &mut Array3<f32> {
        &mut self.values
    }

    /// 1.0 inside each sample's true length, 0.0 for padding
    pub fn mask(&self) -> &Array3<f32> {
        &self.mask
    }

    /// `inputs + perturbation`
    pub fn apply(&self, inputs: ArrayView3<f32>) -> Array3<f32> {
        &inputs + &self.values
    }

    /// L1 norm per sample over valid cells
    pub fn l1_norms(&self) -> Vec<f32> {
        let masked = &self.values.mapv(f32::abs) * &self.mask;
        masked.outer_iter().map(|row| row.sum()).collect()
    }

    /// Proximal step for the L1 term, clipped to the feature bounds
    ///
    /// A cell with `|p| <= lambda_1` becomes zero; otherwise it shrinks toward
    /// zero by `lambda_1` and is clipped so that `x + p` stays in
    /// `[bounds.lower, bounds.upper]`. Padded cells are forced to zero.
    pub fn project(&mut self, inputs: ArrayView3<f32>, lambda_1: f32, bounds: FeatureBounds) {
        Zip::from(&mut self.values).and(&inputs).and(&self.mask).for_each(|p, &x, &m| {
            *p = if m == 0.0 { 0.0 } else { soft_bounded_threshold(*p, x, lambda_1, bounds) };
        });
    }
}

/// Soft threshold of one cell, bounded by how far `x` can move
pub fn soft_bounded_threshold(p: f32, x: f32, lambda_1: f32, bounds: FeatureBounds) -> f32 {
    if p > lambda_1 {
        (p - lambda_1).min(bounds.upper - x)
    } else if p < -lambda_1 {
        (p + lambda_1).max(bounds.lower - x)
    } else if p.is_nan() {
        p
    } else {
        0.0
    }
}

/// Replace non-finite cells of `values` with zero
pub(crate) fn zero_non_finite(values: &mut Array3<f32>) -> usize {
    let mut replaced = 0;
    values.iter_mut().filter(|v| !v.is_finite()).for_each(|v| {
        *v = 0.0;
        replaced += 1;
    });
    replaced
}

//! Optimizer trait

use ndarray::Array3;

/// Trait for optimization algorithms over a perturbation tensor
///
/// State (moments, velocities) is sized lazily from the first gradient, so an
/// optimizer must be rebuilt for every batch.
pub trait Optimizer {
    /// Perform a single descent step: `param` moves against `grad`
    fn step(&mut self, param: &mut Array3<f32>, grad: &Array3<f32>);

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);

    /// Short name for logging
    fn name(&self) -> &'static str;
}

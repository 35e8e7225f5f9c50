//! Frozen sequence classifiers under attack
//!
//! The attack only needs two things from a model: logits for a padded batch
//! and the vector-Jacobian product of those logits with respect to the inputs.
//! Weights are never updated here.

mod io;
mod lstm;

pub use io::{load_classifier, save_classifier};
pub use lstm::LstmClassifier;

use crate::Result;
use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayView3, Axis};

/// Differentiable classifier over padded, variable-length sequences
pub trait Classifier {
    /// Number of output classes
    fn num_classes(&self) -> usize;

    /// Expected feature width of each time step
    fn input_size(&self) -> usize;

    /// Logits of shape `[batch, num_classes]`
    ///
    /// Cells at or beyond a sample's length must not affect its logits.
    fn forward(&self, inputs: ArrayView3<f32>, lengths: &[usize]) -> Result<Array2<f32>>;

    /// Gradient of `sum(logit_grad * logits)` with respect to `inputs`
    ///
    /// Returns an array shaped like `inputs`, zero beyond each sample's length.
    fn input_gradient(
        &self,
        inputs: ArrayView3<f32>,
        lengths: &[usize],
        logit_grad: ArrayView2<f32>,
    ) -> Result<Array3<f32>>;

    /// Predicted class per sample
    fn predict(&self, inputs: ArrayView3<f32>, lengths: &[usize]) -> Result<Vec<usize>> {
        let logits = self.forward(inputs, lengths)?;
        Ok(logits.axis_iter(Axis(0)).map(|row| argmax(row.to_owned())).collect())
    }
}

/// Index of the largest value; NaN entries never win
pub fn argmax(values: Array1<f32>) -> usize {
    let mut best = 0;
    let mut best_val = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_val {
            best = i;
            best_val = v;
        }
    }
    best
}

//! Per-epoch success detection

use crate::model::argmax;
use ndarray::{Array3, ArrayView2, Axis};

/// Marks samples whose prediction no longer matches the original label
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochSuccessDetector;

impl EpochSuccessDetector {
    /// `mask[i] = argmax(logits[i]) != labels[i]`
    pub fn detect(&self, logits: ArrayView2<f32>, labels: &[usize]) -> Vec<bool> {
        logits
            .outer_iter()
            .zip(labels)
            .map(|(row, &label)| argmax(row.to_owned()) != label)
            .collect()
    }
}

/// Samples that succeeded at one epoch, with their losses and perturbations
///
/// `indices` are batch-local. All three fields come from the same
/// post-step state.
#[derive(Debug, Clone)]
pub struct EpochSuccesses {
    pub epoch: usize,
    pub indices: Vec<usize>,
    pub losses: Vec<f32>,
    /// `[indices.len(), max_length, feature_dim]`
    pub perturbations: Array3<f32>,
}

impl EpochSuccesses {
    /// Gather the successful rows of one epoch
    pub fn gather(epoch: usize, mask: &[bool], losses: &[f32], perturbation: &Array3<f32>) -> Self {
        let indices: Vec<usize> =
            mask.iter().enumerate().filter(|(_, &hit)| hit).map(|(i, _)| i).collect();
        Self {
            epoch,
            losses: indices.iter().map(|&i| losses[i]).collect(),
            perturbations: perturbation.select(Axis(0), &indices),
            indices,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }
}

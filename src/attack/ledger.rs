//! Per-batch record of successful perturbations

use super::detector::EpochSuccesses;
use crate::{Error, Result};
use ndarray::{s, Array3};
use serde::{Deserialize, Serialize};

/// Epoch value of a slot with no recorded success
pub const NO_EPOCH: i64 = -1;

/// Loss value of a slot with no recorded success
pub const NO_LOSS: f32 = f32::INFINITY;

/// Which success a ledger slot keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordPolicy {
    /// Keep the earliest successful epoch
    FirstWins,
    /// Keep the lowest-loss successful epoch
    BestWins,
}

impl RecordPolicy {
    fn accepts(self, current_epoch: i64, current_loss: f32, new_loss: f32) -> bool {
        let empty = current_epoch == NO_EPOCH;
        match self {
            Self::FirstWins => empty,
            Self::BestWins => empty || new_loss < current_loss,
        }
    }
}

/// Fixed-capacity ledger, one slot per sample of a batch
///
/// Slots start at `(-1, +inf, 0)` and change only through
/// [`update`](Self::update), which writes epoch, loss and perturbation
/// together.
#[derive(Debug, Clone)]
pub struct RecordedBatchExamples {
    policy: RecordPolicy,
    epochs: Vec<i64>,
    losses: Vec<f32>,
    perturbations: Array3<f32>,
}

impl RecordedBatchExamples {
    pub fn new(
        policy: RecordPolicy,
        batch_size: usize,
        max_length: usize,
        feature_dim: usize,
    ) -> Self {
        Self {
            policy,
            epochs: vec![NO_EPOCH; batch_size],
            losses: vec![NO_LOSS; batch_size],
            perturbations: Array3::zeros((batch_size, max_length, feature_dim)),
        }
    }

    /// Apply the policy to every success, returning how many slots changed
    pub fn update(&mut self, successes: &EpochSuccesses) -> Result<usize> {
        let (_, max_length, feature_dim) = self.perturbations.dim();
        let (rows, t, f) = successes.perturbations.dim();
        if rows != successes.indices.len()
            || successes.losses.len() != rows
            || (t, f) != (max_length, feature_dim)
        {
            return Err(Error::ShapeMismatch {
                context: "ledger update".into(),
                expected: vec![successes.indices.len(), max_length, feature_dim],
                actual: vec![rows, t, f],
            });
        }
        if let Some(&slot) = successes.indices.iter().find(|&&i| i >= self.epochs.len()) {
            return Err(Error::ShapeMismatch {
                context: "ledger slot".into(),
                expected: vec![self.epochs.len()],
                actual: vec![slot],
            });
        }

        let epoch = successes.epoch as i64;
        let mut replaced = 0;
        for (row, (&slot, &loss)) in successes.indices.iter().zip(&successes.losses).enumerate() {
            if self.policy.accepts(self.epochs[slot], self.losses[slot], loss) {
                self.epochs[slot] = epoch;
                self.losses[slot] = loss;
                self.perturbations
                    .slice_mut(s![slot, .., ..])
                    .assign(&successes.perturbations.slice(s![row, .., ..]));
                replaced += 1;
            }
        }
        Ok(replaced)
    }

    pub fn policy(&self) -> RecordPolicy {
        self.policy
    }

    pub fn epochs(&self) -> &[i64] {
        &self.epochs
    }

    pub fn losses(&self) -> &[f32] {
        &self.losses
    }

    pub fn perturbations(&self) -> &Array3<f32> {
        &self.perturbations
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Batch-local indices with a recorded success
    pub fn successful(&self) -> Vec<usize> {
        self.epochs.iter().enumerate().filter(|(_, &e)| e != NO_EPOCH).map(|(i, _)| i).collect()
    }

    pub(crate) fn into_parts(self) -> (Vec<i64>, Vec<f32>, Array3<f32>) {
        (self.epochs, self.losses, self.perturbations)
    }
}

//! Aggregation of batch results into one dataset-indexed result

use super::batch::BatchResult;
use super::ledger::{RecordedBatchExamples, NO_EPOCH};
use crate::{Error, Result};
use ndarray::{s, Array3, Axis};
use std::collections::HashSet;

/// Concatenated ledgers of every attacked batch
///
/// Perturbations share one time axis: blocks from shorter batches are
/// zero-padded to the longest `max_length` seen so far.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTrainerExamples {
    epochs: Vec<i64>,
    losses: Vec<f32>,
    perturbations: Array3<f32>,
}

impl Default for RecordedTrainerExamples {
    fn default() -> Self {
        Self { epochs: Vec::new(), losses: Vec::new(), perturbations: Array3::zeros((0, 0, 0)) }
    }
}

impl RecordedTrainerExamples {
    /// Rebuild from stored columns, checking they line up
    pub fn from_parts(
        epochs: Vec<i64>,
        losses: Vec<f32>,
        perturbations: Array3<f32>,
    ) -> Result<Self> {
        let rows = perturbations.shape()[0];
        if epochs.len() != rows || losses.len() != rows {
            return Err(Error::ShapeMismatch {
                context: "recorded examples".into(),
                expected: vec![rows, rows],
                actual: vec![epochs.len(), losses.len()],
            });
        }
        Ok(Self { epochs, losses, perturbations })
    }

    fn append(&mut self, block: RecordedBatchExamples) -> Result<()> {
        let (epochs, losses, perts) = block.into_parts();
        let (rows, t_cur, f_cur) = self.perturbations.dim();
        let (_, t_new, f_new) = perts.dim();

        if rows == 0 && t_cur <= t_new {
            self.perturbations = perts;
        } else {
            if f_cur != f_new {
                return Err(Error::ShapeMismatch {
                    context: "feature width across batches".into(),
                    expected: vec![f_cur],
                    actual: vec![f_new],
                });
            }
            // Grows in place; the history is only rewritten when max_length grows
            let t = t_cur.max(t_new);
            let mut acc = pad_time(std::mem::take(&mut self.perturbations), t);
            let appended = acc.append(Axis(0), pad_time(perts, t).view());
            self.perturbations = acc;
            appended.map_err(|_| Error::ShapeMismatch {
                context: "appending perturbations".into(),
                expected: vec![t, f_cur],
                actual: vec![t_new, f_new],
            })?;
        }
        self.epochs.extend(epochs);
        self.losses.extend(losses);
        Ok(())
    }

    pub fn epochs(&self) -> &[i64] {
        &self.epochs
    }

    pub fn losses(&self) -> &[f32] {
        &self.losses
    }

    /// `[rows, max_length, feature_dim]`
    pub fn perturbations(&self) -> &Array3<f32> {
        &self.perturbations
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Row indices with a recorded success, ascending
    pub fn successful(&self) -> Vec<usize> {
        self.epochs.iter().enumerate().filter(|(_, &e)| e != NO_EPOCH).map(|(i, _)| i).collect()
    }

    fn select(&self, rows: &[usize]) -> Self {
        Self {
            epochs: rows.iter().map(|&r| self.epochs[r]).collect(),
            losses: rows.iter().map(|&r| self.losses[r]).collect(),
            perturbations: self.perturbations.select(Axis(0), rows),
        }
    }
}

fn pad_time(block: Array3<f32>, length: usize) -> Array3<f32> {
    let (n, t, f) = block.dim();
    if t == length {
        return block;
    }
    let mut padded = Array3::zeros((n, length, f));
    padded.slice_mut(s![.., ..t, ..]).assign(&block);
    padded
}

/// Outcome of a whole attack run
///
/// Row `i` of every field describes the same sample. Rows are appended in
/// batch processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainerResult {
    dataset_indices: Vec<usize>,
    input_seq_lengths: Vec<usize>,
    orig_labels: Vec<usize>,
    epochs_run: Vec<usize>,
    first: RecordedTrainerExamples,
    best: RecordedTrainerExamples,
}

impl TrainerResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored columns, checking index correspondence
    pub fn from_parts(
        dataset_indices: Vec<usize>,
        input_seq_lengths: Vec<usize>,
        orig_labels: Vec<usize>,
        epochs_run: Vec<usize>,
        first: RecordedTrainerExamples,
        best: RecordedTrainerExamples,
    ) -> Result<Self> {
        let n = dataset_indices.len();
        let lens =
            [input_seq_lengths.len(), orig_labels.len(), epochs_run.len(), first.len(), best.len()];
        if lens.iter().any(|&l| l != n) {
            return Err(Error::ShapeMismatch {
                context: "trainer result columns".into(),
                expected: vec![n; lens.len()],
                actual: lens.to_vec(),
            });
        }
        Ok(Self { dataset_indices, input_seq_lengths, orig_labels, epochs_run, first, best })
    }

    /// Append one batch
    pub fn update(&mut self, batch: BatchResult) -> Result<()> {
        let (indices, lengths, labels, epochs_run, first, best) = batch.into_parts();
        let n = indices.len();
        self.first.append(first)?;
        self.best.append(best)?;
        self.dataset_indices.extend(indices);
        self.input_seq_lengths.extend(lengths);
        self.orig_labels.extend(labels);
        self.epochs_run.extend(std::iter::repeat_n(epochs_run, n));
        Ok(())
    }

    pub fn dataset_indices(&self) -> &[usize] {
        &self.dataset_indices
    }

    pub fn input_seq_lengths(&self) -> &[usize] {
        &self.input_seq_lengths
    }

    pub fn orig_labels(&self) -> &[usize] {
        &self.orig_labels
    }

    pub fn epochs_run(&self) -> &[usize] {
        &self.epochs_run
    }

    pub fn first(&self) -> &RecordedTrainerExamples {
        &self.first
    }

    pub fn best(&self) -> &RecordedTrainerExamples {
        &self.best
    }

    pub fn len(&self) -> usize {
        self.dataset_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset_indices.is_empty()
    }

    /// Dataset indices already attacked
    pub fn attacked(&self) -> HashSet<usize> {
        self.dataset_indices.iter().copied().collect()
    }

    /// Subset of rows, in the given order
    pub fn select(&self, rows: &[usize]) -> Self {
        let pick = |v: &[usize]| rows.iter().map(|&r| v[r]).collect::<Vec<_>>();
        Self {
            dataset_indices: pick(&self.dataset_indices),
            input_seq_lengths: pick(&self.input_seq_lengths),
            orig_labels: pick(&self.orig_labels),
            epochs_run: pick(&self.epochs_run),
            first: self.first.select(rows),
            best: self.best.select(rows),
        }
    }
}

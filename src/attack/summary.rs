//! Read-only views over a finished attack result

use super::result::{RecordedTrainerExamples, TrainerResult};
use crate::{Error, Result};
use ndarray::{s, Array3, Axis};
use serde::Serialize;

/// Which ledger a view is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordedExampleType {
    First,
    Best,
}

/// Statistics of one sample's perturbation over its valid cells
#[derive(Debug, Clone, Copy, PartialEq)]
struct ExampleStats {
    sum_abs: f32,
    min_abs: f32,
    max_abs: f32,
    num_nonzero: usize,
    num_elements: usize,
}

/// Sample mean and standard deviation (n - 1 denominator)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Moments {
    pub mean: f32,
    pub std: f32,
}

impl Moments {
    /// `None` for an empty slice; a single value has zero spread
    pub fn of(values: &[f32]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f32;
        let mean = values.iter().sum::<f32>() / n;
        let std = if values.len() < 2 {
            0.0
        } else {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / (n - 1.0)).sqrt()
        };
        Some(Self { mean, std })
    }
}

/// Masked perturbation statistics for a set of recorded examples
///
/// Only cells with `timestep < seq_length` contribute, so every statistic
/// equals the one computed on each perturbation sliced to its true length.
#[derive(Debug, Clone)]
pub struct ExamplesSummary {
    epochs: Vec<i64>,
    losses: Vec<f32>,
    seq_lengths: Vec<usize>,
    perturbations: Array3<f32>,
    stats: Vec<ExampleStats>,
}

impl ExamplesSummary {
    pub fn new(
        epochs: Vec<i64>,
        losses: Vec<f32>,
        seq_lengths: Vec<usize>,
        perturbations: Array3<f32>,
    ) -> Result<Self> {
        let (rows, max_length, _) = perturbations.dim();
        if epochs.len() != rows || losses.len() != rows || seq_lengths.len() != rows {
            return Err(Error::ShapeMismatch {
                context: "examples summary".into(),
                expected: vec![rows; 3],
                actual: vec![epochs.len(), losses.len(), seq_lengths.len()],
            });
        }
        if let Some(&len) = seq_lengths.iter().find(|&&l| l > max_length) {
            return Err(Error::MalformedBatch(format!(
                "sequence length {len} beyond padded length {max_length}"
            )));
        }

        let stats = seq_lengths
            .iter()
            .enumerate()
            .map(|(i, &len)| {
                let valid = perturbations.slice(s![i, ..len, ..]);
                let (mut sum_abs, mut min_abs, mut max_abs, mut num_nonzero) =
                    (0.0f32, f32::INFINITY, 0.0f32, 0usize);
                for &v in valid.iter() {
                    let a = v.abs();
                    sum_abs += a;
                    min_abs = min_abs.min(a);
                    max_abs = max_abs.max(a);
                    num_nonzero += usize::from(v != 0.0);
                }
                ExampleStats {
                    sum_abs,
                    min_abs: if valid.is_empty() { 0.0 } else { min_abs },
                    max_abs,
                    num_nonzero,
                    num_elements: valid.len(),
                }
            })
            .collect();
        Ok(Self { epochs, losses, seq_lengths, perturbations, stats })
    }

    fn from_recorded(
        examples: &RecordedTrainerExamples,
        seq_lengths: &[usize],
        rows: &[usize],
    ) -> Result<Self> {
        Self::new(
            rows.iter().map(|&r| examples.epochs()[r]).collect(),
            rows.iter().map(|&r| examples.losses()[r]).collect(),
            rows.iter().map(|&r| seq_lengths[r]).collect(),
            examples.perturbations().select(Axis(0), rows),
        )
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Epoch at which each example was recorded
    pub fn discovery_epochs(&self) -> &[i64] {
        &self.epochs
    }

    pub fn losses(&self) -> &[f32] {
        &self.losses
    }

    pub fn seq_lengths(&self) -> &[usize] {
        &self.seq_lengths
    }

    pub fn padded_perturbations(&self) -> &Array3<f32> {
        &self.perturbations
    }

    /// 1.0 where `timestep < seq_length`
    pub fn mask(&self) -> Array3<f32> {
        let (_, t, f) = self.perturbations.dim();
        crate::data::length_mask(&self.seq_lengths, t, f)
    }

    pub fn sum_abs(&self) -> Vec<f32> {
        self.stats.iter().map(|s| s.sum_abs).collect()
    }

    pub fn mean_abs(&self) -> Vec<f32> {
        self.stats
            .iter()
            .map(|s| if s.num_elements == 0 { 0.0 } else { s.sum_abs / s.num_elements as f32 })
            .collect()
    }

    pub fn min_abs(&self) -> Vec<f32> {
        self.stats.iter().map(|s| s.min_abs).collect()
    }

    pub fn max_abs(&self) -> Vec<f32> {
        self.stats.iter().map(|s| s.max_abs).collect()
    }

    /// Mean over examples of the per-example maximum magnitude
    pub fn mean_max_abs(&self) -> Option<f32> {
        Moments::of(&self.max_abs()).map(|m| m.mean)
    }

    pub fn num_nonzero(&self) -> Vec<usize> {
        self.stats.iter().map(|s| s.num_nonzero).collect()
    }

    pub fn num_examples_with_num_nonzero_less_than(&self, cutoff: usize) -> usize {
        self.stats.iter().filter(|s| s.num_nonzero < cutoff).count()
    }

    pub fn fraction_nonzero(&self) -> Vec<f32> {
        self.stats
            .iter()
            .map(|s| {
                if s.num_elements == 0 {
                    0.0
                } else {
                    s.num_nonzero as f32 / s.num_elements as f32
                }
            })
            .collect()
    }

    /// `1 - fraction_nonzero`
    pub fn sparsity(&self) -> Vec<f32> {
        self.fraction_nonzero().into_iter().map(|f| 1.0 - f).collect()
    }

    /// Sparsity divided by total magnitude; high for sparse, small perturbations
    pub fn sparse_small_scores(&self) -> Vec<f32> {
        self.sparsity().into_iter().zip(self.sum_abs()).map(|(sp, sum)| sp / sum).collect()
    }

    pub fn fraction_nonzero_moments(&self) -> Option<Moments> {
        Moments::of(&self.fraction_nonzero())
    }

    pub fn sparsity_moments(&self) -> Option<Moments> {
        Moments::of(&self.sparsity())
    }

    pub fn mean_abs_moments(&self) -> Option<Moments> {
        Moments::of(&self.mean_abs())
    }
}

/// Success bookkeeping over a [`TrainerResult`]
///
/// Construction fails if the first and best ledgers disagree on which
/// samples succeeded. Success is read from the epoch sentinel only.
#[derive(Debug, Clone)]
pub struct TrainerSuccessSummary {
    result: TrainerResult,
    success: Vec<usize>,
}

impl TrainerSuccessSummary {
    pub fn new(result: TrainerResult) -> Result<Self> {
        let first = result.first().successful();
        let best = result.best().successful();
        if first != best {
            return Err(Error::LedgerMismatch { first: first.len(), best: best.len() });
        }
        Ok(Self { result, success: best })
    }

    pub fn result(&self) -> &TrainerResult {
        &self.result
    }

    pub fn num_attacked(&self) -> usize {
        self.result.len()
    }

    pub fn num_successful(&self) -> usize {
        self.success.len()
    }

    /// Fraction of attacked samples with a recorded success, 0 when none attacked
    pub fn success_rate(&self) -> f32 {
        if self.result.is_empty() {
            0.0
        } else {
            self.success.len() as f32 / self.result.len() as f32
        }
    }

    pub fn attacked_trainer_indices(&self) -> Vec<usize> {
        (0..self.result.len()).collect()
    }

    pub fn attacked_dataset_indices(&self) -> &[usize] {
        self.result.dataset_indices()
    }

    /// Row indices into the result with a recorded success
    pub fn successful_trainer_indices(&self) -> &[usize] {
        &self.success
    }

    pub fn successful_dataset_indices(&self) -> Vec<usize> {
        self.pick(self.result.dataset_indices())
    }

    pub fn orig_labels_attacked(&self) -> &[usize] {
        self.result.orig_labels()
    }

    pub fn orig_labels_successful(&self) -> Vec<usize> {
        self.pick(self.result.orig_labels())
    }

    pub fn seq_lengths_attacked(&self) -> &[usize] {
        self.result.input_seq_lengths()
    }

    pub fn seq_lengths_successful(&self) -> Vec<usize> {
        self.pick(self.result.input_seq_lengths())
    }

    fn pick(&self, column: &[usize]) -> Vec<usize> {
        self.success.iter().map(|&r| column[r]).collect()
    }

    /// Perturbation statistics of the successful samples from one ledger
    pub fn examples(&self, kind: RecordedExampleType) -> Result<ExamplesSummary> {
        let recorded = match kind {
            RecordedExampleType::First => self.result.first(),
            RecordedExampleType::Best => self.result.best(),
        };
        ExamplesSummary::from_recorded(recorded, self.result.input_seq_lengths(), &self.success)
    }

    /// Summary restricted to samples of one sequence length
    pub fn with_seq_length(&self, seq_length: usize) -> Result<Self> {
        self.filtered(|row| self.result.input_seq_lengths()[row] == seq_length)
    }

    /// Summary restricted to samples with one original label
    pub fn with_orig_label(&self, label: usize) -> Result<Self> {
        self.filtered(|row| self.result.orig_labels()[row] == label)
    }

    fn filtered(&self, keep: impl Fn(usize) -> bool) -> Result<Self> {
        let rows: Vec<usize> = (0..self.result.len()).filter(|&r| keep(r)).collect();
        Self::new(self.result.select(&rows))
    }

    /// Serializable digest for reports
    pub fn report(&self) -> Result<SummaryReport> {
        let kind_report = |kind| -> Result<ExamplesReport> {
            let ex = self.examples(kind)?;
            Ok(ExamplesReport {
                kind,
                count: ex.len(),
                mean_abs: ex.mean_abs_moments(),
                mean_max_abs: ex.mean_max_abs(),
                fraction_nonzero: ex.fraction_nonzero_moments(),
                sparsity: ex.sparsity_moments(),
                mean_discovery_epoch: Moments::of(
                    &ex.discovery_epochs().iter().map(|&e| e as f32).collect::<Vec<_>>(),
                )
                .map(|m| m.mean),
            })
        };
        Ok(SummaryReport {
            num_attacked: self.num_attacked(),
            num_successful: self.num_successful(),
            success_rate: self.success_rate(),
            first: kind_report(RecordedExampleType::First)?,
            best: kind_report(RecordedExampleType::Best)?,
        })
    }
}

/// Per-ledger part of a [`SummaryReport`]
#[derive(Debug, Clone, Serialize)]
pub struct ExamplesReport {
    pub kind: RecordedExampleType,
    pub count: usize,
    pub mean_abs: Option<Moments>,
    pub mean_max_abs: Option<f32>,
    pub fraction_nonzero: Option<Moments>,
    pub sparsity: Option<Moments>,
    pub mean_discovery_epoch: Option<f32>,
}

/// Headline numbers of an attack run
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub num_attacked: usize,
    pub num_successful: usize,
    pub success_rate: f32,
    pub first: ExamplesReport,
    pub best: ExamplesReport,
}

//! Per-batch optimization loop

use super::detector::{EpochSuccessDetector, EpochSuccesses};
use super::ledger::{RecordPolicy, RecordedBatchExamples};
use super::objective::{MarginLoss, MarginMode};
use super::perturbation::{zero_non_finite, FeatureBounds, PerturbationState};
use crate::data::PaddedBatch;
use crate::model::Classifier;
use crate::optim::OptimizerSpec;
use crate::{Error, Result};
use ndarray::Array3;
use serde::{Deserialize, Serialize};

/// What to do when a gradient or perturbation contains NaN or infinity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonFinitePolicy {
    /// No checks
    Propagate,
    /// Replace offending cells with zero and keep going
    #[default]
    Zero,
    /// Stop the batch at the first offending epoch
    Abort,
}

/// Hyperparameters shared by every batch of an attack
#[derive(Debug, Clone, PartialEq)]
pub struct AttackParams {
    pub kappa: f32,
    pub lambda_1: f32,
    pub margin: MarginMode,
    pub optimizer: OptimizerSpec,
    pub epochs_per_batch: usize,
    pub bounds: FeatureBounds,
    pub non_finite: NonFinitePolicy,
}

impl Default for AttackParams {
    fn default() -> Self {
        Self {
            kappa: 0.0,
            lambda_1: 1e-4,
            margin: MarginMode::Clamped,
            optimizer: OptimizerSpec::default(),
            epochs_per_batch: 100,
            bounds: FeatureBounds::default(),
            non_finite: NonFinitePolicy::Zero,
        }
    }
}

impl AttackParams {
    pub fn objective(&self) -> MarginLoss {
        MarginLoss::new(self.kappa, self.lambda_1, self.margin)
    }
}

/// Lifecycle of a batch attack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Initialized,
    Running { epoch: usize },
    Done,
    /// Stopped by [`NonFinitePolicy::Abort`] during `epoch`
    Aborted { epoch: usize },
}

/// Outcome of attacking one batch
#[derive(Debug, Clone)]
pub struct BatchResult {
    dataset_indices: Vec<usize>,
    input_seq_lengths: Vec<usize>,
    orig_labels: Vec<usize>,
    epochs_run: usize,
    first: RecordedBatchExamples,
    best: RecordedBatchExamples,
    state: BatchState,
}

impl BatchResult {
    /// Empty result with sentinel ledgers sized to `batch`
    pub fn new(batch: &PaddedBatch) -> Self {
        let (n, t, f) = (batch.size(), batch.max_length(), batch.feature_dim());
        Self {
            dataset_indices: batch.indices().to_vec(),
            input_seq_lengths: batch.lengths().to_vec(),
            orig_labels: batch.labels().to_vec(),
            epochs_run: 0,
            first: RecordedBatchExamples::new(RecordPolicy::FirstWins, n, t, f),
            best: RecordedBatchExamples::new(RecordPolicy::BestWins, n, t, f),
            state: BatchState::Initialized,
        }
    }

    /// Attack `batch` for `params.epochs_per_batch` epochs
    ///
    /// Each epoch takes one optimizer step on the perturbation, projects it,
    /// then records successes of the post-step state in both ledgers. The loop
    /// does not stop early when every sample has flipped.
    pub fn run<C: Classifier + ?Sized>(
        batch: &PaddedBatch,
        model: &C,
        params: &AttackParams,
    ) -> Result<Self> {
        if batch.feature_dim() != model.input_size() {
            return Err(Error::ShapeMismatch {
                context: "batch feature width".into(),
                expected: vec![model.input_size()],
                actual: vec![batch.feature_dim()],
            });
        }

        let mut result = Self::new(batch);
        let objective = params.objective();
        let detector = EpochSuccessDetector;
        let mut optimizer = params.optimizer.build();
        let mut perturbation = PerturbationState::zeros(batch);
        let inputs = batch.inputs().view();
        let (lengths, labels) = (batch.lengths(), batch.labels());

        // The post-step objective of one epoch drives the next epoch's step
        let logits = model.forward(inputs, lengths)?;
        let mut loss = objective.evaluate(logits.view(), labels, &perturbation.l1_norms())?;
        for epoch in 0..params.epochs_per_batch {
            result.state = BatchState::Running { epoch };

            let perturbed = perturbation.apply(inputs);
            let mut grad =
                model.input_gradient(perturbed.view(), lengths, loss.logit_grad.view())?;
            grad *= perturbation.mask();

            if let Err(e) = screen(&mut grad, "gradient", epoch, params.non_finite) {
                result.abort(epoch, &e);
                break;
            }
            optimizer.step(perturbation.values_mut(), &grad);
            perturbation.project(inputs, params.lambda_1, params.bounds);
            let values = perturbation.values_mut();
            if let Err(e) = screen(values, "perturbation", epoch, params.non_finite) {
                result.abort(epoch, &e);
                break;
            }

            let perturbed = perturbation.apply(inputs);
            let logits = model.forward(perturbed.view(), lengths)?;
            loss = objective.evaluate(logits.view(), labels, &perturbation.l1_norms())?;
            let mask = detector.detect(logits.view(), labels);
            let successes =
                EpochSuccesses::gather(epoch, &mask, &loss.losses, perturbation.values());
            result.first.update(&successes)?;
            result.best.update(&successes)?;
            result.epochs_run += 1;

            tracing::debug!(
                epoch,
                successes = successes.len(),
                recorded = result.best.successful().len(),
                optimizer = optimizer.name(),
                "epoch complete"
            );
        }

        if !matches!(result.state, BatchState::Aborted { .. }) {
            result.state = BatchState::Done;
        }
        Ok(result)
    }

    fn abort(&mut self, epoch: usize, cause: &Error) {
        tracing::warn!(epoch, error = %cause, "aborting batch");
        self.state = BatchState::Aborted { epoch };
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

    /// Epochs completed, including the final recorded one
    pub fn epochs_run(&self) -> usize {
        self.epochs_run
    }

    pub fn first(&self) -> &RecordedBatchExamples {
        &self.first
    }

    pub fn best(&self) -> &RecordedBatchExamples {
        &self.best
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn size(&self) -> usize {
        self.dataset_indices.len()
    }

    /// Number of samples with at least one recorded success
    pub fn num_successful(&self) -> usize {
        self.first.successful().len()
    }

    pub(crate) fn into_parts(
        self,
    ) -> (Vec<usize>, Vec<usize>, Vec<usize>, usize, RecordedBatchExamples, RecordedBatchExamples) {
        (
            self.dataset_indices,
            self.input_seq_lengths,
            self.orig_labels,
            self.epochs_run,
            self.first,
            self.best,
        )
    }
}

/// Apply the non-finite policy to `values`
///
/// Returns [`Error::NonFinite`] only under [`NonFinitePolicy::Abort`].
fn screen(
    values: &mut Array3<f32>,
    what: &'static str,
    epoch: usize,
    policy: NonFinitePolicy,
) -> Result<()> {
    match policy {
        NonFinitePolicy::Propagate => Ok(()),
        NonFinitePolicy::Zero => {
            let replaced = zero_non_finite(values);
            if replaced > 0 {
                tracing::warn!(epoch, what, replaced, "replaced non-finite values with zero");
            }
            Ok(())
        }
        NonFinitePolicy::Abort => {
            if values.iter().any(|v| !v.is_finite()) {
                Err(Error::NonFinite { what, epoch })
            } else {
                Ok(())
            }
        }
    }
}

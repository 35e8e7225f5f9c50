//! Adversarial perturbation search against a frozen classifier
//!
//! A batch is attacked by optimizing an additive perturbation for a fixed
//! number of epochs. After every optimizer step the post-step state is checked
//! for misclassification, and two ledgers keep the first and the lowest-loss
//! success per sample. [`AdversarialAttackTrainer`] runs this over a dataset
//! and folds every batch into one [`TrainerResult`].

mod batch;
mod detector;
mod ledger;
mod objective;
mod perturbation;
mod result;
mod summary;
mod trainer;

#[cfg(test)]
mod test_utils;

pub use batch::{AttackParams, BatchResult, BatchState, NonFinitePolicy};
pub use detector::{EpochSuccessDetector, EpochSuccesses};
pub use ledger::{RecordPolicy, RecordedBatchExamples, NO_EPOCH, NO_LOSS};
pub use objective::{MarginLoss, MarginMode, ObjectiveOutput};
pub use perturbation::{soft_bounded_threshold, FeatureBounds, PerturbationState};
pub use result::{RecordedTrainerExamples, TrainerResult};
pub use summary::{
    ExamplesReport, ExamplesSummary, Moments, RecordedExampleType, SummaryReport,
    TrainerSuccessSummary,
};
pub use trainer::{AdversarialAttackTrainer, TrainerConfig};

//! Orchestration of a full attack run over a dataset

use super::batch::{AttackParams, BatchResult, BatchState};
use super::result::TrainerResult;
use crate::data::{collate, Sample, SequenceDataset};
use crate::io::CheckpointWriter;
use crate::model::Classifier;
use crate::{Error, Result};
use std::collections::HashSet;

/// Settings of an attack run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    pub batch_size: usize,
    pub params: AttackParams,
    /// When false, samples the clean classifier already gets wrong are skipped
    pub attack_misclassified_samples: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            batch_size: 128,
            params: AttackParams::default(),
            attack_misclassified_samples: false,
        }
    }
}

/// Attacks a dataset batch by batch and folds the outcomes into one result
pub struct AdversarialAttackTrainer<'a, C: Classifier + ?Sized> {
    model: &'a C,
    config: TrainerConfig,
    checkpoints: Option<CheckpointWriter<'a>>,
    previous: TrainerResult,
}

impl<'a, C: Classifier + ?Sized> AdversarialAttackTrainer<'a, C> {
    pub fn new(model: &'a C, config: TrainerConfig) -> Self {
        Self { model, config, checkpoints: None, previous: TrainerResult::new() }
    }

    /// Write a checkpoint through `writer` as batches complete
    pub fn with_checkpoints(mut self, writer: CheckpointWriter<'a>) -> Self {
        self.checkpoints = Some(writer);
        self
    }

    /// Continue from an earlier result; its samples are not attacked again
    pub fn resume_from(mut self, previous: TrainerResult) -> Self {
        self.previous = previous;
        self
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Run the attack over `dataset`
    pub fn train(&mut self, dataset: &SequenceDataset) -> Result<TrainerResult> {
        if self.config.batch_size == 0 {
            return Err(Error::Config("batch_size must be positive".into()));
        }
        if dataset.feature_dim() != self.model.input_size() {
            return Err(Error::ShapeMismatch {
                context: "dataset feature width".into(),
                expected: vec![self.model.input_size()],
                actual: vec![dataset.feature_dim()],
            });
        }

        let done = self.previous.attacked();
        let pending = dataset.filter_by_index(|i| !done.contains(&i));
        if !done.is_empty() {
            tracing::info!(
                resumed = self.previous.len(),
                remaining = pending.len(),
                "resuming from previous result"
            );
        }

        let targets = if self.config.attack_misclassified_samples {
            pending
        } else {
            let keep = self.correctly_classified(&pending)?;
            let skipped = pending.len() - keep.len();
            if skipped > 0 {
                tracing::warn!(skipped, "skipping samples the clean classifier misclassifies");
            }
            pending.filter_by_index(|i| keep.contains(&i))
        };

        let samples: Vec<&Sample> = targets.iter().collect();
        let num_batches = samples.len().div_ceil(self.config.batch_size);
        let mut result = self.previous.clone();
        for (batch_num, chunk) in samples.chunks(self.config.batch_size).enumerate() {
            let batch = collate(chunk)?;
            let batch_result = BatchResult::run(&batch, self.model, &self.config.params)?;
            if let BatchState::Aborted { epoch } = batch_result.state() {
                tracing::warn!(batch = batch_num, epoch, "batch aborted on non-finite values");
            }
            tracing::info!(
                batch = batch_num + 1,
                of = num_batches,
                size = batch_result.size(),
                successes = batch_result.num_successful(),
                epochs_run = batch_result.epochs_run(),
                "batch complete"
            );
            result.update(batch_result)?;

            if let Some(writer) = self.checkpoints.as_mut() {
                writer.on_batch_end(batch_num + 1, &result)?;
            }
        }

        tracing::info!(attacked = result.len(), "attack complete");
        Ok(result)
    }

    /// Dataset indices the unperturbed classifier labels correctly
    fn correctly_classified(&self, dataset: &SequenceDataset) -> Result<HashSet<usize>> {
        let samples: Vec<&Sample> = dataset.iter().collect();
        let mut keep = HashSet::new();
        for chunk in samples.chunks(self.config.batch_size) {
            let batch = collate(chunk)?;
            let predictions = self.model.predict(batch.inputs().view(), batch.lengths())?;
            keep.extend(
                predictions
                    .iter()
                    .zip(batch.labels())
                    .zip(batch.indices())
                    .filter(|((pred, label), _)| pred == label)
                    .map(|(_, &index)| index),
            );
        }
        Ok(keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack::ledger::NO_EPOCH;
    use crate::attack::objective::MarginMode;
    use crate::attack::test_utils::ScriptedClassifier;
    use crate::io::{ResultStore, SafeTensorsStore};
    use crate::model::LstmClassifier;
    use ndarray::{array, Array2};
    use tempfile::TempDir;

    fn dataset(lengths: &[usize], labels: &[usize], feature_dim: usize) -> SequenceDataset {
        let samples = lengths
            .iter()
            .zip(labels)
            .enumerate()
            .map(|(i, (&len, &label))| {
                let features = Array2::from_shape_fn((len, feature_dim), |(t, f)| {
                    ((i + t * 2 + f) % 7) as f32 / 7.0
                });
                Sample::new(i, features, label)
            })
            .collect();
        SequenceDataset::new(samples, feature_dim).unwrap()
    }

    fn config(batch_size: usize, epochs: usize, attack_misclassified: bool) -> TrainerConfig {
        TrainerConfig {
            batch_size,
            params: AttackParams {
                lambda_1: 0.0,
                margin: MarginMode::Unbounded,
                epochs_per_batch: epochs,
                ..AttackParams::default()
            },
            attack_misclassified_samples: attack_misclassified,
        }
    }

    #[test]
    fn test_batches_fold_in_order() {
        let data = dataset(&[3, 1, 4, 2, 2], &[0; 5], 2);
        let model = LstmClassifier::seeded(2, 4, 2, 3);
        let mut trainer = AdversarialAttackTrainer::new(&model, config(2, 3, true));
        let result = trainer.train(&data).unwrap();
        assert_eq!(result.dataset_indices(), &[0, 1, 2, 3, 4]);
        assert_eq!(result.input_seq_lengths(), &[3, 1, 4, 2, 2]);
        assert_eq!(result.epochs_run(), &[3; 5]);
        assert_eq!(result.first().perturbations().shape(), &[5, 4, 2]);
        assert_eq!(result.first().successful(), result.best().successful());
    }

    #[test]
    fn test_skips_misclassified_when_disabled() {
        // Scripted logits always predict class 0, so label-1 samples start misclassified
        let data = dataset(&[2, 2, 2], &[0, 1, 0], 1);
        let model = ScriptedClassifier::new(vec![array![[1.0, 0.0], [1.0, 0.0], [1.0, 0.0]]], 1);
        let mut trainer = AdversarialAttackTrainer::new(&model, config(4, 1, false));
        let result = trainer.train(&data).unwrap();
        assert_eq!(result.dataset_indices(), &[0, 2]);
    }

    #[test]
    fn test_attacks_misclassified_when_enabled() {
        let data = dataset(&[2, 2, 2], &[0, 1, 0], 1);
        let model = ScriptedClassifier::new(vec![array![[1.0, 0.0], [1.0, 0.0], [1.0, 0.0]]], 1);
        let mut trainer = AdversarialAttackTrainer::new(&model, config(4, 1, true));
        let result = trainer.train(&data).unwrap();
        assert_eq!(result.dataset_indices(), &[0, 1, 2]);
        // Already wrong at epoch 0, so it is recorded immediately
        assert_eq!(result.first().epochs(), &[NO_EPOCH, 0, NO_EPOCH]);
    }

    #[test]
    fn test_resume_skips_attacked_indices() {
        let data = dataset(&[2, 3, 1, 2], &[0; 4], 2);
        let model = LstmClassifier::seeded(2, 3, 2, 5);
        let first_half = AdversarialAttackTrainer::new(&model, config(2, 2, true))
            .train(&data.filter_by_index(|i| i < 2))
            .unwrap();
        let resumed = AdversarialAttackTrainer::new(&model, config(2, 2, true))
            .resume_from(first_half)
            .train(&data)
            .unwrap();
        assert_eq!(resumed.dataset_indices(), &[0, 1, 2, 3]);
        assert_eq!(resumed.len(), resumed.best().len());
    }

    #[test]
    fn test_checkpoints_every_interval() {
        let dir = TempDir::new().unwrap();
        let store = SafeTensorsStore;
        let data = dataset(&[2, 2, 2, 2, 2], &[0; 5], 1);
        let model = LstmClassifier::seeded(1, 3, 2, 9);
        let writer = CheckpointWriter::new(dir.path(), 2, &store);
        let mut trainer =
            AdversarialAttackTrainer::new(&model, config(1, 1, true)).with_checkpoints(writer);
        let result = trainer.train(&data).unwrap();

        let mut files: Vec<_> =
            std::fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().path()).collect();
        files.sort();
        // Five batches with interval 2 checkpoint after batches 2 and 4
        assert_eq!(files.len(), 2);
        let latest = store.load(files.last().unwrap()).unwrap();
        assert_eq!(latest.len(), 4);
        assert_eq!(latest.dataset_indices(), &result.dataset_indices()[..4]);
    }

    #[test]
    fn test_resumed_checkpoints_named_by_total_rows() {
        let dir = TempDir::new().unwrap();
        let store = SafeTensorsStore;
        let data = dataset(&[2, 2, 2, 2, 2], &[0; 5], 1);
        let model = LstmClassifier::seeded(1, 3, 2, 9);
        let previous = AdversarialAttackTrainer::new(&model, config(1, 1, true))
            .train(&data.filter_by_index(|i| i < 3))
            .unwrap();

        let writer = CheckpointWriter::new(dir.path(), 1, &store);
        let mut trainer = AdversarialAttackTrainer::new(&model, config(1, 1, true))
            .resume_from(previous)
            .with_checkpoints(writer);
        trainer.train(&data).unwrap();

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names.len(), 2);
        assert!(names[0].starts_with("checkpoint_r000004_"));
        assert!(names[1].starts_with("checkpoint_r000005_"));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let data = dataset(&[1], &[0], 1);
        let model = LstmClassifier::seeded(1, 2, 2, 1);
        let mut trainer = AdversarialAttackTrainer::new(&model, config(0, 1, true));
        assert!(matches!(trainer.train(&data), Err(Error::Config(_))));
    }

    #[test]
    fn test_feature_width_mismatch() {
        let data = dataset(&[1], &[0], 3);
        let model = LstmClassifier::seeded(2, 2, 2, 1);
        let mut trainer = AdversarialAttackTrainer::new(&model, config(1, 1, true));
        assert!(matches!(trainer.train(&data), Err(Error::ShapeMismatch { .. })));
    }
}

//! Configuration validation logic

use super::error::ValidationError;
use crate::config::schema::AttackSpec;
use crate::optim::OptimizerSpec;
use std::cmp::Ordering;

/// Validate numeric ranges of an attack specification
///
/// Paths are checked separately by [`validate_paths`].
pub fn validate_config(spec: &AttackSpec) -> Result<(), ValidationError> {
    let attack = &spec.attack;

    if attack.batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize(attack.batch_size));
    }

    if attack.epochs_per_batch == 0 {
        return Err(ValidationError::InvalidEpochs(attack.epochs_per_batch));
    }

    let lr = attack.optimizer.lr();
    if !(lr.is_finite() && lr > 0.0) {
        return Err(ValidationError::InvalidLearningRate(lr));
    }
    validate_optimizer(&attack.optimizer)?;

    if attack.kappa.is_nan() || attack.kappa < 0.0 {
        return Err(ValidationError::InvalidKappa(attack.kappa));
    }

    if attack.lambda_1.is_nan() || attack.lambda_1 < 0.0 {
        return Err(ValidationError::InvalidLambda(attack.lambda_1));
    }

    if attack.bounds.lower.partial_cmp(&attack.bounds.upper) != Some(Ordering::Less) {
        return Err(ValidationError::InvalidBounds(attack.bounds.lower, attack.bounds.upper));
    }

    if spec.checkpoint_interval == Some(0) {
        return Err(ValidationError::InvalidCheckpointInterval(0));
    }

    if spec.sample_selection.max_num_samples == Some(0) {
        return Err(ValidationError::InvalidMaxSamples(0));
    }

    Ok(())
}

fn validate_optimizer(spec: &OptimizerSpec) -> Result<(), ValidationError> {
    let unit = |name: &'static str, value: f32| {
        if (0.0..1.0).contains(&value) {
            Ok(())
        } else {
            Err(ValidationError::InvalidOptimizerParam { name, value })
        }
    };
    match *spec {
        OptimizerSpec::Adam { beta1, beta2, eps, .. } => {
            unit("beta1", beta1)?;
            unit("beta2", beta2)?;
            positive("eps", eps)
        }
        OptimizerSpec::Rmsprop { alpha, eps, momentum, .. } => {
            unit("alpha", alpha)?;
            unit("momentum", momentum)?;
            positive("eps", eps)
        }
        OptimizerSpec::Sgd { momentum, .. } => unit("momentum", momentum),
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ValidationError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidOptimizerParam { name, value })
    }
}

/// Check that the model and dataset files exist
pub fn validate_paths(spec: &AttackSpec) -> Result<(), ValidationError> {
    if !spec.model.exists() {
        return Err(ValidationError::ModelPathNotFound(spec.model.display().to_string()));
    }
    if !spec.dataset.exists() {
        return Err(ValidationError::DatasetNotFound(spec.dataset.display().to_string()));
    }
    Ok(())
}

//! Validation error types

/// Validation error type
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Model path does not exist: {0}")]
    ModelPathNotFound(String),

    #[error("Dataset path does not exist: {0}")]
    DatasetNotFound(String),

    #[error("Invalid learning rate: {0} (must be > 0.0 and finite)")]
    InvalidLearningRate(f32),

    #[error("Invalid batch size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("Invalid epochs per batch: {0} (must be > 0)")]
    InvalidEpochs(usize),

    #[error("Invalid kappa: {0} (must be >= 0.0)")]
    InvalidKappa(f32),

    #[error("Invalid lambda_1: {0} (must be >= 0.0)")]
    InvalidLambda(f32),

    #[error("Invalid feature bounds: [{0}, {1}] (lower must be below upper)")]
    InvalidBounds(f32, f32),

    #[error("Invalid checkpoint interval: {0} (must be > 0)")]
    InvalidCheckpointInterval(usize),

    #[error("Invalid max_num_samples: {0} (must be > 0)")]
    InvalidMaxSamples(usize),

    #[error("Invalid optimizer parameter {name}: {value}")]
    InvalidOptimizerParam { name: &'static str, value: f32 },
}

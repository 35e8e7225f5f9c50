//! Error types with actionable diagnostics.
//!
//! Configuration and input problems carry a remedy line so a failed run can be
//! fixed without reading the source.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for lstm-attack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading inputs, running an attack or summarizing results.
#[derive(Error, Debug)]
pub enum Error {
    /// Attack specification is invalid.
    #[error("Invalid configuration: {0}\n  \
        → Fix the attack spec and re-run `lstm-attack validate`")]
    Config(String),

    /// Requested compute device is not available to this build.
    #[error("Unsupported device '{device}'\n  \
        → Only 'cpu' is supported; tensors live in host memory")]
    UnsupportedDevice { device: String },

    /// A batch could not be assembled from the given samples.
    #[error("Malformed batch: {0}")]
    MalformedBatch(String),

    /// Two samples in one dataset share a dataset index.
    #[error("Duplicate dataset index {index}\n  \
        → Every sample needs a unique `index` in the dataset file")]
    DuplicateIndex { index: usize },

    /// Tensor shapes disagree.
    #[error("Tensor shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { context: String, expected: Vec<usize>, actual: Vec<usize> },

    /// A label is outside the classifier's output range.
    #[error("Label {label} out of range for classifier with {num_classes} classes")]
    LabelOutOfRange { label: usize, num_classes: usize },

    /// First-success and best-success ledgers disagree on which samples succeeded.
    #[error("Ledger mismatch: first ledger has {first} successes, best ledger has {best}\n  \
        → This is a bug in result aggregation")]
    LedgerMismatch { first: usize, best: usize },

    /// Non-finite values appeared and the configured policy forbids them.
    #[error("Non-finite {what} at epoch {epoch}")]
    NonFinite { what: &'static str, epoch: usize },

    /// File not found at expected path.
    #[error("File not found: {path}\n  → Check the path in the attack spec")]
    NotFound { path: PathBuf },

    /// IO error with context.
    #[error("IO error: {context}\n  Cause: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Check if this error is caused by user input rather than an internal fault.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::UnsupportedDevice { .. }
                | Self::MalformedBatch(_)
                | Self::DuplicateIndex { .. }
                | Self::LabelOutOfRange { .. }
                | Self::NotFound { .. }
        )
    }

    /// Get the error code for structured output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "E001",
            Self::UnsupportedDevice { .. } => "E002",
            Self::MalformedBatch(_) => "E010",
            Self::ShapeMismatch { .. } => "E011",
            Self::DuplicateIndex { .. } => "E013",
            Self::LabelOutOfRange { .. } => "E012",
            Self::LedgerMismatch { .. } => "E020",
            Self::NonFinite { .. } => "E030",
            Self::NotFound { .. } => "E040",
            Self::Io { .. } => "E050",
            Self::Serialization(_) => "E051",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::io("unspecified file operation", source)
    }
}

//! YAML schema for declarative attack configuration

use crate::attack::{AttackParams, FeatureBounds, MarginMode, NonFinitePolicy, TrainerConfig};
use crate::optim::OptimizerSpec;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Deserialize a bool from either a YAML boolean (`true`) or a quoted string (`"true"`).
fn deserialize_bool_lenient<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Str(s) => match s.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected 'true' or 'false', got '{other}'"
            ))),
        },
    }
}

/// Compute device for attack tensors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
}

impl Device {
    /// Resolve a device tag; anything but `cpu` is unsupported
    pub fn parse(tag: &str) -> Result<Self> {
        match tag.trim().to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            _ => Err(Error::UnsupportedDevice { device: tag.to_string() }),
        }
    }
}

/// Complete attack specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackSpec {
    /// Classifier weights (JSON)
    pub model: PathBuf,

    /// Dataset of labelled sequences (JSON)
    pub dataset: PathBuf,

    /// Optional random subset of the dataset
    #[serde(default)]
    pub sample_selection: SampleSelection,

    /// Attack hyperparameters
    #[serde(default)]
    pub attack: AttackHyperparams,

    /// Also attack samples the clean classifier already misclassifies
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub attack_misclassified_samples: bool,

    /// Batches between checkpoints (None = no checkpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_interval: Option<usize>,

    /// Directory for checkpoints and the final result
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Device tag; only `cpu` is accepted
    #[serde(default = "default_device")]
    pub device: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./attack_output")
}

fn default_device() -> String {
    "cpu".to_string()
}

/// Random sample selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_num_samples: Option<usize>,

    /// Fixed seed for reproducible selection (None = OS entropy)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Per-batch optimization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackHyperparams {
    #[serde(default)]
    pub kappa: f32,

    #[serde(default = "default_lambda_1")]
    pub lambda_1: f32,

    #[serde(default)]
    pub optimizer: OptimizerSpec,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_epochs_per_batch")]
    pub epochs_per_batch: usize,

    #[serde(default)]
    pub margin: MarginMode,

    #[serde(default)]
    pub non_finite: NonFinitePolicy,

    /// Allowed range of perturbed feature values
    #[serde(default)]
    pub bounds: FeatureBounds,
}

fn default_lambda_1() -> f32 {
    1e-4
}

fn default_batch_size() -> usize {
    128
}

fn default_epochs_per_batch() -> usize {
    100
}

impl Default for AttackHyperparams {
    fn default() -> Self {
        Self {
            kappa: 0.0,
            lambda_1: default_lambda_1(),
            optimizer: OptimizerSpec::default(),
            batch_size: default_batch_size(),
            epochs_per_batch: default_epochs_per_batch(),
            margin: MarginMode::default(),
            non_finite: NonFinitePolicy::default(),
            bounds: FeatureBounds::default(),
        }
    }
}

impl AttackSpec {
    /// Minimal spec with defaults for everything but the input paths
    pub fn new(model: impl Into<PathBuf>, dataset: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            dataset: dataset.into(),
            sample_selection: SampleSelection::default(),
            attack: AttackHyperparams::default(),
            attack_misclassified_samples: false,
            checkpoint_interval: None,
            output_dir: default_output_dir(),
            device: default_device(),
        }
    }

    pub fn device(&self) -> Result<Device> {
        Device::parse(&self.device)
    }

    pub fn trainer_config(&self) -> TrainerConfig {
        let a = &self.attack;
        TrainerConfig {
            batch_size: a.batch_size,
            params: AttackParams {
                kappa: a.kappa,
                lambda_1: a.lambda_1,
                margin: a.margin,
                optimizer: a.optimizer,
                epochs_per_batch: a.epochs_per_batch,
                bounds: a.bounds,
                non_finite: a.non_finite,
            },
            attack_misclassified_samples: self.attack_misclassified_samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let spec: AttackSpec = serde_yaml::from_str("model: m.json\ndataset: d.json\n").unwrap();
        assert_eq!(spec.attack, AttackHyperparams::default());
        assert_eq!(spec.device().unwrap(), Device::Cpu);
        assert!(!spec.attack_misclassified_samples);
        assert_eq!(spec.checkpoint_interval, None);
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
model: model.json
dataset: data.json
sample_selection:
  max_num_samples: 50
  seed: 2023
attack:
  kappa: 0.1
  lambda_1: 0.001
  optimizer:
    name: rmsprop
    lr: 0.05
  batch_size: 16
  epochs_per_batch: 40
  margin: unbounded
  non_finite: abort
  bounds: { lower: -1.0, upper: 1.0 }
attack_misclassified_samples: "true"
checkpoint_interval: 5
output_dir: out
"#;
        let spec: AttackSpec = serde_yaml::from_str(yaml).unwrap();
        assert!(spec.attack_misclassified_samples);
        assert_eq!(spec.sample_selection.max_num_samples, Some(50));
        assert_eq!(spec.attack.margin, MarginMode::Unbounded);
        assert_eq!(spec.attack.non_finite, NonFinitePolicy::Abort);
        assert_eq!(spec.attack.optimizer.name(), "rmsprop");

        let config = spec.trainer_config();
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.params.epochs_per_batch, 40);
        assert_eq!(config.params.bounds.lower, -1.0);
        assert!(config.attack_misclassified_samples);
    }

    #[test]
    fn test_bad_lenient_bool() {
        let yaml = "model: m\ndataset: d\nattack_misclassified_samples: maybe\n";
        assert!(serde_yaml::from_str::<AttackSpec>(yaml).is_err());
    }

    #[test]
    fn test_unknown_margin_mode_rejected() {
        let yaml = "model: m\ndataset: d\nattack:\n  margin: hinge\n";
        assert!(serde_yaml::from_str::<AttackSpec>(yaml).is_err());
    }

    #[test]
    fn test_device_parse() {
        assert_eq!(Device::parse("CPU").unwrap(), Device::Cpu);
        assert!(matches!(Device::parse("cuda:0"), Err(Error::UnsupportedDevice { .. })));
    }
}

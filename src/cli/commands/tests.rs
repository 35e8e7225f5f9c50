//! CLI command tests

use super::*;
use crate::config::{load_config, AttackArgs, OutputFormat, SummarizeArgs, ValidateArgs};
use crate::data::{Sample, SequenceDataset};
use crate::io::{ResultStore, SafeTensorsStore};
use crate::model::{save_classifier, LstmClassifier};
use ndarray::Array2;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Seeded model, four short samples and a spec pointing at both
fn create_test_config(dir: &TempDir, extra: &str) -> PathBuf {
    let model_path = dir.path().join("model.json");
    let data_path = dir.path().join("data.json");
    let output_path = dir.path().join("output");

    save_classifier(&LstmClassifier::seeded(2, 4, 2, 7), &model_path).unwrap();
    let samples = (0..4)
        .map(|i| Sample::new(i, Array2::from_elem((2 + i % 2, 2), 0.2 * i as f32), i % 2))
        .collect();
    let dataset = SequenceDataset::new(samples, 2).unwrap();
    std::fs::write(&data_path, serde_json::to_string(&dataset.to_file_repr()).unwrap()).unwrap();

    let config = format!(
        r#"
model: {}
dataset: {}
attack:
  batch_size: 2
  epochs_per_batch: 3
  optimizer:
    name: adam
    lr: 0.05
attack_misclassified_samples: true
output_dir: {}
"#,
        model_path.display(),
        data_path.display(),
        output_path.display()
    );
    let config_path = dir.path().join("spec.yaml");
    std::fs::write(&config_path, format!("{config}{extra}")).unwrap();
    config_path
}

fn attack_args(config: &Path) -> AttackArgs {
    AttackArgs {
        config: config.to_path_buf(),
        output_dir: None,
        resume: None,
        epochs: None,
        batch_size: None,
        seed: None,
    }
}

#[test]
fn test_validate_valid_config() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "");
    let args = ValidateArgs { config, check_paths: true };
    assert!(validate::run_validate(args, LogLevel::Quiet).is_ok());
}

#[test]
fn test_validate_invalid_config() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "checkpoint_interval: 0\n");
    let args = ValidateArgs { config, check_paths: false };
    let err = validate::run_validate(args, LogLevel::Quiet).unwrap_err();
    assert!(err.contains("checkpoint"));
}

#[test]
fn test_validate_missing_file() {
    let args = ValidateArgs { config: PathBuf::from("/nonexistent/spec.yaml"), check_paths: false };
    assert!(validate::run_validate(args, LogLevel::Quiet).is_err());
}

#[test]
fn test_format_attack_info() {
    let spec = crate::config::AttackSpec::new("m.json", "d.json");
    let info = validate::format_attack_info(&spec);
    assert!(info.contains("adam"));
    assert!(info.contains("Bounds: [0, 1]"));
}

#[test]
fn test_attack_then_summarize() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "checkpoint_interval: 1\n");
    let path = attack::run_attack(attack_args(&config), LogLevel::Quiet).unwrap().result;
    assert!(path.exists());

    let result = SafeTensorsStore.load(&path).unwrap();
    assert_eq!(result.len(), 4);
    assert!(result.epochs_run().iter().all(|&e| e == 3));

    let checkpoints = std::fs::read_dir(dir.path().join("output"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("checkpoint_r"))
        .count();
    assert_eq!(checkpoints, 2);

    for format in [OutputFormat::Text, OutputFormat::Json, OutputFormat::Yaml] {
        let args = SummarizeArgs { result: path.clone(), format, seq_length: None, label: None };
        assert!(summarize::run_summarize(args, LogLevel::Quiet).is_ok());
    }
}

#[test]
fn test_attack_overrides_and_resume() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "");
    let first = attack::run_attack(
        AttackArgs { epochs: Some(1), ..attack_args(&config) },
        LogLevel::Quiet,
    )
    .unwrap()
    .result;

    let resumed = attack::run_attack(
        AttackArgs { resume: Some(first.clone()), ..attack_args(&config) },
        LogLevel::Quiet,
    )
    .unwrap()
    .result;
    let result = SafeTensorsStore.load(&resumed).unwrap();
    assert_eq!(result.len(), 4);
    assert!(result.epochs_run().iter().all(|&e| e == 1));
}

#[test]
fn test_attack_saves_resolved_spec_with_result() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "");
    let args = AttackArgs { epochs: Some(2), seed: Some(17), ..attack_args(&config) };
    let outputs = attack::run_attack(args, LogLevel::Quiet).unwrap();
    assert!(outputs.spec.exists());

    let result_name = outputs.result.file_name().unwrap().to_str().unwrap();
    let spec_name = outputs.spec.file_name().unwrap().to_str().unwrap();
    let stamp = result_name.strip_prefix("final_result_").unwrap().strip_suffix(".safetensors");
    assert_eq!(spec_name.strip_prefix("attack_spec_").unwrap().strip_suffix(".yaml"), stamp);

    let saved = load_config(&outputs.spec).unwrap();
    let mut expected = load_config(&config).unwrap();
    expected.attack.epochs_per_batch = 2;
    expected.sample_selection.seed = Some(17);
    assert_eq!(saved, expected);
    assert_eq!(saved.attack.optimizer.lr(), 0.05);
}

#[test]
fn test_attack_rejects_unsupported_device() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "device: cuda:0\n");
    let err = attack::run_attack(attack_args(&config), LogLevel::Quiet).unwrap_err();
    assert!(err.contains("cuda:0"));
}

#[test]
fn test_summarize_missing_result() {
    let args = SummarizeArgs {
        result: PathBuf::from("/nonexistent/result.safetensors"),
        format: OutputFormat::Json,
        seq_length: None,
        label: None,
    };
    assert!(summarize::run_summarize(args, LogLevel::Quiet).is_err());
}

#[test]
fn test_render_empty_report() {
    let summary =
        crate::attack::TrainerSuccessSummary::new(crate::attack::TrainerResult::new()).unwrap();
    let report = summary.report().unwrap();
    let text = summarize::render(&report, OutputFormat::Text).unwrap();
    assert!(text.contains("Attacked: 0"));
    assert!(text.contains("n/a"));
    let json = summarize::render(&report, OutputFormat::Json).unwrap();
    assert!(json.contains("\"num_attacked\": 0"));
}

#[test]
fn test_run_command_dispatch() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "");
    let cli = crate::config::parse_args(["lstm-attack", "-q", "validate", config.to_str().unwrap()])
        .unwrap();
    assert!(run_command(cli).is_ok());
}

//! Attack command implementation

use crate::attack::{AdversarialAttackTrainer, TrainerSuccessSummary};
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{apply_overrides, check_spec, load_config, save_config, AttackArgs};
use crate::data::SequenceDataset;
use crate::io::{stamped_path, timestamp, CheckpointWriter, ResultStore, SafeTensorsStore};
use crate::model::load_classifier;
use std::path::PathBuf;

/// Files written at the end of an attack run
#[derive(Debug, Clone, PartialEq)]
pub struct AttackOutputs {
    pub result: PathBuf,
    /// Resolved spec the result was produced with
    pub spec: PathBuf,
}

/// Run an attack and save the final result with its resolved spec
pub fn run_attack(args: AttackArgs, level: LogLevel) -> Result<AttackOutputs, String> {
    log(level, LogLevel::Normal, &format!("Loading attack spec: {}", args.config.display()));

    let mut spec = load_config(&args.config).map_err(|e| e.to_string())?;
    apply_overrides(&mut spec, &args);
    check_spec(&spec, true).map_err(|e| e.to_string())?;

    let model = load_classifier(&spec.model).map_err(|e| e.to_string())?;
    let mut dataset = SequenceDataset::from_json_file(&spec.dataset).map_err(|e| e.to_string())?;
    if let Some(max) = spec.sample_selection.max_num_samples {
        dataset = dataset.random_subset(max, spec.sample_selection.seed);
    }
    log(
        level,
        LogLevel::Verbose,
        &format!(
            "  {} samples, {} features, optimizer {} (lr {})",
            dataset.len(),
            dataset.feature_dim(),
            spec.attack.optimizer.name(),
            spec.attack.optimizer.lr()
        ),
    );

    let store = SafeTensorsStore;
    let mut trainer = AdversarialAttackTrainer::new(&model, spec.trainer_config());
    if let Some(interval) = spec.checkpoint_interval {
        let writer = CheckpointWriter::new(&spec.output_dir, interval, &store);
        trainer = trainer.with_checkpoints(writer);
    }
    if let Some(resume) = &args.resume {
        let previous = store.load(resume).map_err(|e| e.to_string())?;
        log(
            level,
            LogLevel::Normal,
            &format!("Resuming from {} ({} samples done)", resume.display(), previous.len()),
        );
        trainer = trainer.resume_from(previous);
    }

    let result = trainer.train(&dataset).map_err(|e| e.to_string())?;

    std::fs::create_dir_all(&spec.output_dir)
        .map_err(|e| format!("Failed to create output dir {}: {e}", spec.output_dir.display()))?;
    let stamp = timestamp();
    let path = stamped_path(&spec.output_dir, "final_result", &stamp, "safetensors");
    store.save(&result, &path).map_err(|e| e.to_string())?;
    let spec_path = stamped_path(&spec.output_dir, "attack_spec", &stamp, "yaml");
    save_config(&spec, &spec_path).map_err(|e| e.to_string())?;

    let summary = TrainerSuccessSummary::new(result).map_err(|e| e.to_string())?;
    log(
        level,
        LogLevel::Normal,
        &format!(
            "Attack complete: {}/{} successful ({:.1}%)",
            summary.num_successful(),
            summary.num_attacked(),
            summary.success_rate() * 100.0
        ),
    );
    log(level, LogLevel::Normal, &format!("Result saved to {}", path.display()));
    log(level, LogLevel::Verbose, &format!("Spec saved to {}", spec_path.display()));
    Ok(AttackOutputs { result: path, spec: spec_path })
}

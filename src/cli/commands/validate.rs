//! Validate command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{check_spec, load_config, AttackSpec, ValidateArgs};

/// Format the attack hyperparameters as a string
pub fn format_attack_info(spec: &AttackSpec) -> String {
    let a = &spec.attack;
    [
        format!("  Model: {}", spec.model.display()),
        format!("  Dataset: {}", spec.dataset.display()),
        format!("  Optimizer: {} (lr {})", a.optimizer.name(), a.optimizer.lr()),
        format!("  kappa: {}  lambda_1: {}", a.kappa, a.lambda_1),
        format!("  Batch size: {}  Epochs per batch: {}", a.batch_size, a.epochs_per_batch),
        format!("  Bounds: [{}, {}]", a.bounds.lower, a.bounds.upper),
        format!("  Output dir: {}", spec.output_dir.display()),
    ]
    .join("\n")
}

pub fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(level, LogLevel::Normal, &format!("Validating spec: {}", args.config.display()));

    let spec = load_config(&args.config).map_err(|e| e.to_string())?;
    check_spec(&spec, args.check_paths).map_err(|e| e.to_string())?;

    log(level, LogLevel::Normal, "✓ Spec is valid");
    log(level, LogLevel::Verbose, &format_attack_info(&spec));
    Ok(())
}

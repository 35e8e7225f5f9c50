//! Core CLI types - Cli, Command, and argument structs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::types::OutputFormat;
use crate::config::AttackSpec;

/// lstm-attack: adversarial perturbation search against LSTM classifiers
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "lstm-attack")]
#[command(version)]
#[command(about = "Gradient-based adversarial attacks on recurrent time-series classifiers")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run an attack from a YAML specification
    Attack(AttackArgs),

    /// Validate a specification without attacking
    Validate(ValidateArgs),

    /// Summarize a saved attack result
    Summarize(SummarizeArgs),
}

/// Arguments for the attack command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct AttackArgs {
    /// Path to YAML attack specification
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Override output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Resume from a checkpointed result
    #[arg(short, long)]
    pub resume: Option<PathBuf>,

    /// Override epochs per batch
    #[arg(short, long)]
    pub epochs: Option<usize>,

    /// Override batch size
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Override sample selection seed
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML attack specification
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Also require model and dataset files to exist
    #[arg(long)]
    pub check_paths: bool,
}

/// Arguments for the summarize command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct SummarizeArgs {
    /// Saved result (SafeTensors)
    #[arg(value_name = "RESULT")]
    pub result: PathBuf,

    /// Output format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Only include samples of this sequence length
    #[arg(long)]
    pub seq_length: Option<usize>,

    /// Only include samples with this original label
    #[arg(long)]
    pub label: Option<usize>,
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to an AttackSpec
pub fn apply_overrides(spec: &mut AttackSpec, args: &AttackArgs) {
    if let Some(output_dir) = &args.output_dir {
        spec.output_dir = output_dir.clone();
    }
    if let Some(epochs) = args.epochs {
        spec.attack.epochs_per_batch = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        spec.attack.batch_size = batch_size;
    }
    if let Some(seed) = args.seed {
        spec.sample_selection.seed = Some(seed);
    }
}

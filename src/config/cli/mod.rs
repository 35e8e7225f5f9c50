//! CLI argument parsing
//!
//! ```bash
//! lstm-attack attack spec.yaml
//! lstm-attack attack spec.yaml --resume out/checkpoint_r001280_<stamp>.safetensors
//! lstm-attack validate spec.yaml --check-paths
//! lstm-attack summarize out/final_result_<stamp>.safetensors --format json
//! ```

mod core;
mod types;

pub use self::core::{
    apply_overrides, parse_args, AttackArgs, Cli, Command, SummarizeArgs, ValidateArgs,
};
pub use types::OutputFormat;

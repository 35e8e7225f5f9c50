//! lstm-attack CLI
//!
//! # Usage
//!
//! ```bash
//! # Attack from a spec
//! lstm-attack attack spec.yaml
//!
//! # Attack with overrides, continuing from a checkpoint
//! lstm-attack attack spec.yaml --epochs 50 --resume out/checkpoint_r000512_<stamp>.safetensors
//!
//! # Validate a spec
//! lstm-attack validate spec.yaml --check-paths
//!
//! # Summarize a result
//! lstm-attack summarize out/final_result_<stamp>.safetensors --format json
//! ```

use clap::Parser;
use lstm_attack::cli::{init_tracing, run_command, Cli, LogLevel};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(LogLevel::from_flags(cli.quiet, cli.verbose));

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

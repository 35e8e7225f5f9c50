//! CLI command implementations

mod attack;
mod summarize;
mod validate;

#[cfg(test)]
mod tests;

use crate::cli::LogLevel;
use crate::config::{Cli, Command};

/// Execute a CLI command based on the parsed arguments
pub fn run_command(cli: Cli) -> Result<(), String> {
    let log_level = LogLevel::from_flags(cli.quiet, cli.verbose);

    match cli.command {
        Command::Attack(args) => attack::run_attack(args, log_level).map(|_| ()),
        Command::Validate(args) => validate::run_validate(args, log_level),
        Command::Summarize(args) => summarize::run_summarize(args, log_level),
    }
}

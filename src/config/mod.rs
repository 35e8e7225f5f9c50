//! Declarative attack configuration
//!
//! An [`AttackSpec`] is parsed from YAML, overridden from the command line,
//! then validated before any model or data is loaded.

mod cli;
mod loader;
mod schema;
mod validate;

pub use cli::{
    apply_overrides, parse_args, AttackArgs, Cli, Command, OutputFormat, SummarizeArgs,
    ValidateArgs,
};
pub use loader::{check_spec, load_config, save_config};
pub use schema::{AttackHyperparams, AttackSpec, Device, SampleSelection};
pub use validate::{validate_config, validate_paths, ValidationError};

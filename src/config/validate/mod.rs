//! Configuration validation
//!
//! Validates attack specifications before any model or data is loaded.

mod error;
mod validator;

#[cfg(test)]
mod proptests;

pub use error::ValidationError;
pub use validator::{validate_config, validate_paths};

//! Gradient-based adversarial attacks on LSTM time-series classifiers
//!
//! Given a frozen [`model::Classifier`] and a dataset of labelled,
//! variable-length sequences, the attack searches per sample for a small,
//! sparse additive perturbation that flips the prediction. Every sample gets
//! two records: the first successful perturbation and the lowest-loss one.
//!
//! # Example
//!
//! ```no_run
//! use lstm_attack::attack::{AdversarialAttackTrainer, TrainerConfig, TrainerSuccessSummary};
//! use lstm_attack::data::SequenceDataset;
//! use lstm_attack::model::load_classifier;
//!
//! # fn main() -> lstm_attack::Result<()> {
//! let model = load_classifier("model.json")?;
//! let dataset = SequenceDataset::from_json_file("data.json")?;
//! let result = AdversarialAttackTrainer::new(&model, TrainerConfig::default()).train(&dataset)?;
//! let summary = TrainerSuccessSummary::new(result)?;
//! println!("success rate: {:.2}", summary.success_rate());
//! # Ok(())
//! # }
//! ```

pub mod attack;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod model;
pub mod optim;

pub use error::{Error, Result};

//! Persistence of attack results
//!
//! Results go through the [`ResultStore`] trait so the trainer and CLI never
//! depend on a particular file format.

mod checkpoint;
mod tensors;

pub use checkpoint::{stamped_path, timestamp, timestamped_path, CheckpointWriter};
pub use tensors::{decode, encode, SafeTensorsStore, FORMAT_VERSION};

use crate::attack::TrainerResult;
use crate::Result;
use std::path::Path;

/// Serialize a result to a path and back
pub trait ResultStore {
    fn save(&self, result: &TrainerResult, path: &Path) -> Result<()>;

    fn load(&self, path: &Path) -> Result<TrainerResult>;
}

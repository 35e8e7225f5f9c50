//! Periodic checkpointing of in-progress attack results

use super::ResultStore;
use crate::attack::TrainerResult;
use crate::{Error, Result};
use chrono::Local;
use std::path::{Path, PathBuf};

/// Local time as `YYYY-mm-dd_HH_MM_SS.ffffff`
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%d_%H_%M_%S%.6f").to_string()
}

/// `{dir}/{prefix}_{stamp}.{extension}`
///
/// Files written for one run share a stamp so they can be matched up later.
pub fn stamped_path(dir: &Path, prefix: &str, stamp: &str, extension: &str) -> PathBuf {
    dir.join(format!("{prefix}_{stamp}.{extension}"))
}

/// [`stamped_path`] with the current [`timestamp`]
pub fn timestamped_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    stamped_path(dir, prefix, &timestamp(), extension)
}

/// Saves the running result every `interval` batches
///
/// Files are named by the number of rows in the result, which keeps names
/// increasing across resumed runs.
pub struct CheckpointWriter<'a> {
    dir: PathBuf,
    interval: usize,
    store: &'a dyn ResultStore,
    written: Vec<PathBuf>,
}

impl<'a> CheckpointWriter<'a> {
    /// An `interval` of zero is treated as one
    pub fn new(dir: impl Into<PathBuf>, interval: usize, store: &'a dyn ResultStore) -> Self {
        Self { dir: dir.into(), interval: interval.max(1), store, written: Vec::new() }
    }

    /// Called after `batches_done` batches of this run have been folded into `result`
    pub fn on_batch_end(
        &mut self,
        batches_done: usize,
        result: &TrainerResult,
    ) -> Result<Option<PathBuf>> {
        if batches_done % self.interval != 0 {
            return Ok(None);
        }
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            Error::io(format!("creating checkpoint dir {}", self.dir.display()), e)
        })?;
        let prefix = format!("checkpoint_r{:06}", result.len());
        let path = timestamped_path(&self.dir, &prefix, "safetensors");
        self.store.save(result, &path)?;
        tracing::info!(path = %path.display(), rows = result.len(), "checkpoint written");
        self.written.push(path.clone());
        Ok(Some(path))
    }

    /// Most recent checkpoint, if any
    pub fn latest(&self) -> Option<&Path> {
        self.written.last().map(PathBuf::as_path)
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SafeTensorsStore;
    use tempfile::TempDir;

    #[test]
    fn test_timestamped_path_shape() {
        let path = timestamped_path(Path::new("/tmp/out"), "final_result", "safetensors");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("final_result_20"));
        assert!(name.ends_with(".safetensors"));
        assert_eq!(path.parent().unwrap(), Path::new("/tmp/out"));
    }

    #[test]
    fn test_stamped_paths_share_stamp() {
        let stamp = timestamp();
        let result = stamped_path(Path::new("out"), "final_result", &stamp, "safetensors");
        let spec = stamped_path(Path::new("out"), "attack_spec", &stamp, "yaml");
        assert_eq!(result, Path::new("out").join(format!("final_result_{stamp}.safetensors")));
        assert_eq!(spec, Path::new("out").join(format!("attack_spec_{stamp}.yaml")));
    }

    #[test]
    fn test_writes_on_interval_only() {
        let dir = TempDir::new().unwrap();
        let store = SafeTensorsStore;
        let mut writer = CheckpointWriter::new(dir.path().join("ckpt"), 3, &store);
        let result = TrainerResult::new();
        assert!(writer.on_batch_end(1, &result).unwrap().is_none());
        assert!(writer.on_batch_end(2, &result).unwrap().is_none());
        let path = writer.on_batch_end(3, &result).unwrap().unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("checkpoint_r000000_"));
        assert_eq!(writer.latest(), Some(path.as_path()));
        assert_eq!(writer.written().len(), 1);
    }

    #[test]
    fn test_zero_interval_writes_every_batch() {
        let dir = TempDir::new().unwrap();
        let store = SafeTensorsStore;
        let mut writer = CheckpointWriter::new(dir.path(), 0, &store);
        assert!(writer.on_batch_end(1, &TrainerResult::new()).unwrap().is_some());
    }
}

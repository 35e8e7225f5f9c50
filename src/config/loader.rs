//! Loading attack specifications from YAML

use super::schema::AttackSpec;
use super::validate::{validate_config, validate_paths};
use crate::{Error, Result};
use std::path::Path;

/// Read and parse a YAML attack specification
///
/// The device tag is resolved here so an unsupported device fails before
/// anything else is loaded. Ranges are not validated; see [`check_spec`].
pub fn load_config(path: impl AsRef<Path>) -> Result<AttackSpec> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::NotFound { path: path.to_path_buf() });
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("reading config {}", path.display()), e))?;
    let spec: AttackSpec = serde_yaml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse YAML config: {e}")))?;
    spec.device()?;
    Ok(spec)
}

/// Write the resolved specification as YAML
///
/// Saved next to a run's results so they can be traced back to the exact
/// hyperparameters, overrides included.
pub fn save_config(spec: &AttackSpec, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let yaml = serde_yaml::to_string(spec)
        .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}")))?;
    std::fs::write(path, yaml)
        .map_err(|e| Error::io(format!("writing config {}", path.display()), e))
}

/// Validate ranges and, optionally, input paths
pub fn check_spec(spec: &AttackSpec, check_paths: bool) -> Result<()> {
    validate_config(spec).map_err(|e| Error::Config(e.to_string()))?;
    if check_paths {
        validate_paths(spec).map_err(|e| Error::Config(e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid() {
        let file = yaml_file("model: m.json\ndataset: d.json\nattack:\n  batch_size: 4\n");
        let spec = load_config(file.path()).unwrap();
        assert_eq!(spec.attack.batch_size, 4);
        assert!(check_spec(&spec, false).is_ok());
        assert!(matches!(check_spec(&spec, true), Err(Error::Config(_))));
    }

    #[test]
    fn test_unsupported_device_fails_at_load() {
        let file = yaml_file("model: m.json\ndataset: d.json\ndevice: cuda:0\n");
        assert!(matches!(load_config(file.path()), Err(Error::UnsupportedDevice { .. })));
    }

    #[test]
    fn test_unknown_optimizer_fails_at_load() {
        let file = yaml_file(
            "model: m\ndataset: d\nattack:\n  optimizer:\n    name: lbfgs\n    lr: 0.1\n",
        );
        assert!(matches!(load_config(file.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_saved_spec_loads_back() {
        let file = yaml_file(
            "model: m.json\ndataset: d.json\nsample_selection:\n  max_num_samples: 20\n  seed: 9\n\
             attack:\n  kappa: 0.25\n  lambda_1: 0.003\n  optimizer:\n    name: sgd\n    lr: 0.2\n\
             checkpoint_interval: 3\n",
        );
        let spec = load_config(file.path()).unwrap();
        let out = NamedTempFile::new().unwrap();
        save_config(&spec, out.path()).unwrap();
        assert_eq!(load_config(out.path()).unwrap(), spec);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(load_config("/nonexistent/spec.yaml"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_range_error_is_config_error() {
        let file = yaml_file("model: m\ndataset: d\nattack:\n  epochs_per_batch: 0\n");
        let spec = load_config(file.path()).unwrap();
        let err = check_spec(&spec, false).unwrap_err();
        assert!(err.to_string().contains("epochs"));
    }
}

//! Classifier weight loading and saving (JSON)

use super::LstmClassifier;
use crate::{Error, Result};
use std::path::Path;

/// Load frozen classifier weights from a JSON file
///
/// Shapes are validated after parsing so a truncated or hand-edited file
/// fails here rather than mid-attack.
pub fn load_classifier(path: impl AsRef<Path>) -> Result<LstmClassifier> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::NotFound { path: path.to_path_buf() });
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("reading classifier {}", path.display()), e))?;
    let model: LstmClassifier = serde_json::from_str(&content)
        .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}")))?;
    model.validate()?;
    Ok(model)
}

/// Save classifier weights as pretty-printed JSON
pub fn save_classifier(model: &LstmClassifier, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let data = serde_json::to_string_pretty(model)
        .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?;
    std::fs::write(path, data)
        .map_err(|e| Error::io(format!("writing classifier {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_save_then_load() {
        let model = LstmClassifier::seeded(3, 4, 2, 11);
        let file = NamedTempFile::new().unwrap();
        save_classifier(&model, file.path()).unwrap();
        assert_eq!(load_classifier(file.path()).unwrap(), model);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_classifier("/nonexistent/model.json"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_load_garbage() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{\"w_ih\": 3}").unwrap();
        assert!(matches!(load_classifier(file.path()), Err(Error::Serialization(_))));
    }
}

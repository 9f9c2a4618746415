//! Model artifact location.

use super::Lookup;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ModelEnvConfig {
    pub models_dir: PathBuf,
    pub model_file: String,
}

impl Default for ModelEnvConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            model_file: "combo_clf_prod.json".to_string(),
        }
    }
}

impl ModelEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        let defaults = Self::default();
        Self {
            models_dir: lookup("MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.models_dir),
            model_file: lookup("MODEL_FILE").unwrap_or(defaults.model_file),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.models_dir.join(&self.model_file)
    }

    /// Point at an explicit artifact file, keeping the directory/file split.
    pub fn override_path(&mut self, path: &Path) {
        self.models_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        self.model_file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_path() {
        let config = ModelEnvConfig::from_lookup(&|key| match key {
            "MODELS_DIR" => Some("/opt/models".to_string()),
            _ => None,
        });
        assert_eq!(config.path(), PathBuf::from("/opt/models/combo_clf_prod.json"));
    }

    #[test]
    fn test_override_path() {
        let mut config = ModelEnvConfig::default();
        config.override_path(Path::new("/tmp/bundles/clf.toml"));
        assert_eq!(config.models_dir, PathBuf::from("/tmp/bundles"));
        assert_eq!(config.model_file, "clf.toml");
        assert_eq!(config.path(), PathBuf::from("/tmp/bundles/clf.toml"));
    }
}

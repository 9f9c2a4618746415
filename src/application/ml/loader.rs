use crate::domain::errors::SignalError;
use crate::domain::ml::ModelArtifact;
use std::path::Path;
use tracing::info;

/// Read, parse and validate a model bundle.
///
/// The format is chosen by extension: `.json` or `.toml`.
pub fn load_artifact(path: &Path) -> Result<ModelArtifact, SignalError> {
    if !path.is_file() {
        return Err(SignalError::ArtifactNotFound {
            path: path.display().to_string(),
        });
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if extension != "json" && extension != "toml" {
        return Err(SignalError::UnsupportedFormat { extension });
    }

    let contents = std::fs::read_to_string(path).map_err(|e| SignalError::InvalidArtifact {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;

    let artifact: ModelArtifact = if extension == "json" {
        serde_json::from_str(&contents).map_err(|e| SignalError::InvalidArtifact {
            reason: e.to_string(),
        })?
    } else {
        toml::from_str(&contents).map_err(|e| SignalError::InvalidArtifact {
            reason: e.to_string(),
        })?
    };

    artifact.validate()?;
    info!(
        "ModelLoader: loaded {} model ({} features) from {}",
        artifact.classifier.kind(),
        artifact.features.len(),
        path.display()
    );
    Ok(artifact)
}

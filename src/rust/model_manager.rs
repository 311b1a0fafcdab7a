use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

pub const MODEL_FILE: &str = "model.onnx";
pub const LABELS_FILE: &str = "labels.json";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid labels file: {0}")]
    InvalidLabels(#[from] serde_json::Error),
    #[error("Hash mismatch: expected {expected}, got {actual} for {file}")]
    HashMismatch {
        file: String,
        expected: String,
        actual: String,
    },
}

/// Locates sketch models on local disk.
///
/// Each model lives in its own directory holding `model.onnx` and a
/// `labels.json` array naming the outputs in order. Nothing is ever fetched
/// over the network; models are installed by copying them into place.
#[derive(Debug, Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("PICTIONARY_MODELS") {
            return PathBuf::from(path);
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("pictionary").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("pictionary").join("models");
        }

        env::temp_dir().join("pictionary").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self { models_dir })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn get_model_path(&self, name: &str) -> PathBuf {
        self.models_dir.join(name).join(MODEL_FILE)
    }

    pub fn get_labels_path(&self, name: &str) -> PathBuf {
        self.models_dir.join(name).join(LABELS_FILE)
    }

    pub fn is_model_installed(&self, name: &str) -> bool {
        let model_path = self.get_model_path(name);
        log::debug!("Model path: {:?} (exists: {})", model_path, model_path.exists());
        model_path.exists()
    }

    /// Reads the label order for a model. A model without `labels.json`
    /// yields `None` so the caller can fall back to a built-in label set.
    pub fn load_labels(&self, name: &str) -> Result<Option<Vec<String>>, ModelError> {
        let path = self.get_labels_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        let labels: Vec<String> = serde_json::from_slice(&bytes)?;
        log::info!("Loaded {} labels from {:?}", labels.len(), path);
        Ok(Some(labels))
    }

    /// Returns the hex SHA-256 of a file
    pub fn hash_file(path: &Path) -> Result<String, ModelError> {
        let bytes = fs::read(path)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Checks a file against an expected hex SHA-256 (case-insensitive)
    ///
    /// # Errors
    /// `HashMismatch` when the digests differ, `IoError` when the file cannot be read.
    pub fn verify_file(path: &Path, expected_hash: &str) -> Result<(), ModelError> {
        log::info!("Verifying file: {:?}", path);
        let actual = Self::hash_file(path)?;
        log::debug!("Calculated hash: {}", actual);
        log::debug!("Expected hash:   {}", expected_hash);
        if !actual.eq_ignore_ascii_case(expected_hash) {
            log::error!("Model hash mismatch: expected {}, got {}", expected_hash, actual);
            return Err(ModelError::HashMismatch {
                file: path.display().to_string(),
                expected: expected_hash.to_string(),
                actual,
            });
        }
        Ok(())
    }

    /// Returns the model path once it exists and, when given, matches `expected_hash`
    pub fn resolve_model(&self, name: &str, expected_hash: Option<&str>) -> Result<PathBuf, ModelError> {
        let model_path = self.get_model_path(name);
        if !model_path.exists() {
            return Err(ModelError::NotFound(model_path.display().to_string()));
        }
        if let Some(expected) = expected_hash {
            Self::verify_file(&model_path, expected)?;
        }
        Ok(model_path)
    }

    pub fn remove_model(&self, name: &str) -> Result<(), ModelError> {
        for path in [self.get_model_path(name), self.get_labels_path(name)] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_manager(name: &str) -> ModelManager {
        let dir = env::temp_dir().join("pictionary-model-tests").join(name);
        let _ = fs::remove_dir_all(&dir);
        ModelManager::new(&dir).unwrap()
    }

    fn install(manager: &ModelManager, name: &str, model: &[u8], labels: Option<&str>) {
        let model_path = manager.get_model_path(name);
        fs::create_dir_all(model_path.parent().unwrap()).unwrap();
        fs::write(&model_path, model).unwrap();
        if let Some(labels) = labels {
            fs::write(manager.get_labels_path(name), labels).unwrap();
        }
    }

    #[test]
    fn test_model_paths() {
        let manager = scratch_manager("paths");
        assert!(manager.get_model_path("animals").ends_with("animals/model.onnx"));
        assert!(manager.get_labels_path("animals").ends_with("animals/labels.json"));
        assert!(!manager.is_model_installed("animals"));
    }

    #[test]
    fn test_resolve_and_verify() -> Result<(), ModelError> {
        let manager = scratch_manager("verify");
        install(&manager, "animals", b"not really onnx", None);

        let hash = ModelManager::hash_file(&manager.get_model_path("animals"))?;
        assert_eq!(hash.len(), 64);
        ModelManager::verify_file(&manager.get_model_path("animals"), &hash.to_uppercase())?;
        assert!(manager.resolve_model("animals", Some(&hash)).is_ok());
        assert!(manager.resolve_model("animals", None).is_ok());

        let wrong = "0".repeat(64);
        assert!(matches!(
            manager.resolve_model("animals", Some(&wrong)),
            Err(ModelError::HashMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_missing_model() {
        let manager = scratch_manager("missing");
        assert!(matches!(manager.resolve_model("nope", None), Err(ModelError::NotFound(_))));
    }

    #[test]
    fn test_labels_file() -> Result<(), ModelError> {
        let manager = scratch_manager("labels");
        install(&manager, "animals", b"x", Some(r#"["chicken", "dog", "fish", "t-rex"]"#));
        install(&manager, "bare", b"x", None);
        install(&manager, "broken", b"x", Some("{not json"));

        assert_eq!(
            manager.load_labels("animals")?,
            Some(vec!["chicken".into(), "dog".into(), "fish".into(), "t-rex".into()])
        );
        assert_eq!(manager.load_labels("bare")?, None);
        assert!(matches!(manager.load_labels("broken"), Err(ModelError::InvalidLabels(_))));
        Ok(())
    }

    #[test]
    fn test_remove_model() -> Result<(), ModelError> {
        let manager = scratch_manager("remove");
        install(&manager, "animals", b"x", Some("[]"));
        manager.remove_model("animals")?;
        assert!(!manager.is_model_installed("animals"));
        manager.remove_model("animals")?;
        Ok(())
    }

    #[test]
    fn test_default_models_dir() {
        env::set_var("PICTIONARY_MODELS", "/tmp/test-pictionary-models");
        let path = ModelManager::get_default_models_dir();
        assert_eq!(path, PathBuf::from("/tmp/test-pictionary-models"));
        env::remove_var("PICTIONARY_MODELS");

        let path = ModelManager::get_default_models_dir();
        assert!(path.to_string_lossy().contains("pictionary"));
    }
}

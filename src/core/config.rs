use crate::core::ml_models::{landmark_model_file, ModelInfo, ModelSource};
use crate::models::pose::{ExtractResult, ModelComplexity, PoseConfig, PoseError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Name reported by the health endpoint
    pub service_name: String,
    /// Where landmark models are cached
    pub model_dir: PathBuf,
    /// Explicit model file, bypasses `model_dir` lookup
    pub model_path: Option<PathBuf>,
    /// Download source used when the model is not cached
    pub model_url: Option<String>,
    /// Landmark network variant: "lite", "full" or "heavy"
    pub model_complexity: ModelComplexity,
    /// Pose presence threshold (0.0-1.0)
    pub min_detection_confidence: f32,
    /// Intra-op threads for the inference runtime
    pub inference_threads: usize,
    /// Upper bound on one inference call, in seconds
    pub inference_timeout_secs: u64,
    /// Directory for per-request temporary files
    pub temp_dir: PathBuf,
    /// Maximum accepted request body, in bytes
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        let mut model_dir = Self::base_dir();
        model_dir.push("models");

        Self {
            service_name: "MediaPipe Pose Extractor".to_string(),
            model_dir,
            model_path: None,
            model_url: None,
            model_complexity: ModelComplexity::Heavy,
            min_detection_confidence: 0.5,
            inference_threads: 4,
            inference_timeout_secs: 30,
            temp_dir: std::env::temp_dir(),
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default settings file is
    /// used when present, otherwise built-in defaults.
    pub fn load(path: Option<&Path>) -> ExtractResult<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default_path = Self::default_config_path();
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            PoseError::Config(format!("cannot read {}: {}", config_path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&contents).map_err(|e| {
            PoseError::Config(format!("cannot parse {}: {}", config_path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ExtractResult<()> {
        if !(0.0..=1.0).contains(&self.min_detection_confidence) {
            return Err(PoseError::Config(format!(
                "Invalid detection confidence: {}. Must be between 0.0 and 1.0",
                self.min_detection_confidence
            )));
        }

        if self.inference_threads == 0 || self.inference_threads > 64 {
            return Err(PoseError::Config(format!(
                "Invalid inference threads: {}. Must be between 1 and 64",
                self.inference_threads
            )));
        }

        if self.inference_timeout_secs == 0 || self.inference_timeout_secs > 600 {
            return Err(PoseError::Config(format!(
                "Invalid inference timeout: {}. Must be between 1 and 600 seconds",
                self.inference_timeout_secs
            )));
        }

        if self.max_upload_bytes < 1024 {
            return Err(PoseError::Config(format!(
                "Invalid upload limit: {} bytes. Must be at least 1024",
                self.max_upload_bytes
            )));
        }

        if self.service_name.trim().is_empty() {
            return Err(PoseError::Config("Service name cannot be empty".to_string()));
        }

        Ok(())
    }

    pub fn pose_config(&self) -> PoseConfig {
        PoseConfig {
            min_detection_confidence: self.min_detection_confidence,
            model_complexity: self.model_complexity,
            inference_threads: self.inference_threads,
        }
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }

    /// The cached landmark model and where to fetch it from.
    /// `model_path` is handled by the caller and bypasses this entirely.
    pub fn landmark_model(&self) -> ModelInfo {
        let name = landmark_model_file(self.model_complexity);
        let source = match &self.model_url {
            Some(url) => ModelSource::Url(url.clone()),
            None => ModelSource::LocalFile(self.model_dir.join(&name)),
        };
        ModelInfo { name, source }
    }

    /// `$HOME/.pose_extractor/settings.json`
    pub fn default_config_path() -> PathBuf {
        let mut path = Self::base_dir();
        path.push("settings.json");
        path
    }

    fn base_dir() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());

        let mut path = PathBuf::from(home);
        path.push(".pose_extractor");
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model_complexity, ModelComplexity::Heavy);
        assert_eq!(config.min_detection_confidence, 0.5);
        assert_eq!(config.inference_timeout_secs, 30);
        assert_eq!(config.service_name, "MediaPipe Pose Extractor");
        assert!(config.model_dir.ends_with("models"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.min_detection_confidence = 1.5;
        assert!(config.validate().is_err());
        config.min_detection_confidence = 0.5;

        config.inference_threads = 0;
        assert!(config.validate().is_err());
        config.inference_threads = 4;

        config.inference_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.inference_timeout_secs = 30;

        config.max_upload_bytes = 10;
        assert!(config.validate().is_err());
        config.max_upload_bytes = 1024;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"model_complexity": "lite", "inference_timeout_secs": 5}"#).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.model_complexity, ModelComplexity::Lite);
        assert_eq!(config.inference_timeout(), Duration::from_secs(5));
        assert_eq!(config.min_detection_confidence, 0.5);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"min_detection_confidence": 2.0}"#).unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/settings.json"))).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_landmark_model_source() {
        let mut config = Config::default();
        config.model_complexity = ModelComplexity::Full;

        let model = config.landmark_model();
        assert_eq!(model.name, "pose_landmark_full.onnx");
        assert_eq!(
            model.source,
            ModelSource::LocalFile(config.model_dir.join("pose_landmark_full.onnx"))
        );

        config.model_url = Some("https://example.invalid/model.onnx".to_string());
        assert!(matches!(config.landmark_model().source, ModelSource::Url(_)));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}

// Landmark model resolution and caching
// Finds the model file for the configured complexity, downloading it once if a URL is set

use crate::core::config::Config;
use crate::models::pose::{ExtractResult, ModelComplexity, PoseError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Model source configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// Local file path
    LocalFile(PathBuf),
    /// Direct URL
    Url(String),
}

/// ML model metadata
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    pub source: ModelSource,
}

/// File name of the landmark network for a complexity level
pub fn landmark_model_file(complexity: ModelComplexity) -> String {
    format!("pose_landmark_{}.onnx", complexity.as_str())
}

/// Path of the landmark model to load: the explicit `model_path` when set,
/// otherwise the cached file for the configured complexity.
pub async fn resolve_landmark_model(config: &Config) -> ExtractResult<PathBuf> {
    if let Some(path) = &config.model_path {
        if !path.is_file() {
            return Err(PoseError::ModelLoad(format!(
                "model file not found: {}",
                path.display()
            )));
        }
        return Ok(path.clone());
    }

    let manager = ModelManager::new(config.model_dir.clone())?;
    manager.ensure_model(&config.landmark_model()).await
}

/// Model manager for caching and loading ML models
pub struct ModelManager {
    cache_dir: PathBuf,
}

impl ModelManager {
    /// Create a new model manager with cache directory
    pub fn new(cache_dir: PathBuf) -> ExtractResult<Self> {
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    /// Get the local path for a model
    pub fn get_model_path(&self, model_name: &str) -> PathBuf {
        self.cache_dir.join(model_name)
    }

    /// Check if a model is cached
    pub fn is_cached(&self, model: &ModelInfo) -> bool {
        self.get_model_path(&model.name).is_file()
    }

    /// Fetch a model into the cache if it is not there yet
    pub async fn ensure_model(&self, model: &ModelInfo) -> ExtractResult<PathBuf> {
        let model_path = self.get_model_path(&model.name);

        if self.is_cached(model) {
            info!("Model {} already cached at {}", model.name, model_path.display());
            return Ok(model_path);
        }

        match &model.source {
            ModelSource::LocalFile(path) => {
                if !path.is_file() {
                    return Err(PoseError::ModelLoad(format!(
                        "model file not found: {}",
                        path.display()
                    )));
                }
                info!("Copying model {} from {}", model.name, path.display());
                fs::copy(path, &model_path)?;
            }
            ModelSource::Url(url) => {
                info!("Downloading model {} from {}", model.name, url);
                self.download(url, &model_path).await?;
            }
        }

        Ok(model_path)
    }

    /// Download to `<target>.part`, then rename so a partial file is never cached
    async fn download(&self, url: &str, target: &Path) -> ExtractResult<()> {
        let response = reqwest::get(url)
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| PoseError::ModelLoad(format!("download of {} failed: {}", url, e)))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PoseError::ModelLoad(format!("download of {} failed: {}", url, e)))?;

        let partial = target.with_extension("part");
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, target).await?;

        info!("Saved {} bytes to {}", bytes.len(), target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_model_file() {
        assert_eq!(landmark_model_file(ModelComplexity::Lite), "pose_landmark_lite.onnx");
        assert_eq!(landmark_model_file(ModelComplexity::Heavy), "pose_landmark_heavy.onnx");
    }

    #[test]
    fn test_model_manager_creation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = temp_dir.path().join("models");
        let manager = ModelManager::new(cache.clone()).unwrap();
        assert!(cache.is_dir());
        assert_eq!(manager.get_model_path("a.onnx"), cache.join("a.onnx"));
    }

    #[tokio::test]
    async fn test_ensure_model_copies_local_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = temp_dir.path().join("source.onnx");
        fs::write(&source, b"onnx").unwrap();

        let manager = ModelManager::new(temp_dir.path().join("cache")).unwrap();
        let model = ModelInfo {
            name: "pose_landmark_heavy.onnx".to_string(),
            source: ModelSource::LocalFile(source),
        };

        assert!(!manager.is_cached(&model));
        let path = manager.ensure_model(&model).await.unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"onnx");
        assert!(manager.is_cached(&model));
    }

    #[tokio::test]
    async fn test_ensure_model_missing_local_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(temp_dir.path().to_path_buf()).unwrap();
        let model = ModelInfo {
            name: "missing.onnx".to_string(),
            source: ModelSource::LocalFile(temp_dir.path().join("nope.onnx")),
        };

        let err = manager.ensure_model(&model).await.unwrap_err();
        assert_eq!(err.kind(), "model_load");
    }

    #[tokio::test]
    async fn test_resolve_prefers_explicit_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let explicit = temp_dir.path().join("custom.onnx");
        fs::write(&explicit, b"custom").unwrap();

        let mut config = Config::default();
        config.model_dir = temp_dir.path().join("cache");
        config.model_path = Some(explicit.clone());
        assert_eq!(resolve_landmark_model(&config).await.unwrap(), explicit);

        config.model_path = None;
        let err = resolve_landmark_model(&config).await.unwrap_err();
        assert_eq!(err.kind(), "model_load");
    }

    #[tokio::test]
    async fn test_cached_model_skips_source() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(temp_dir.path().to_path_buf()).unwrap();
        fs::write(manager.get_model_path("cached.onnx"), b"cached").unwrap();

        let model = ModelInfo {
            name: "cached.onnx".to_string(),
            source: ModelSource::Url("http://127.0.0.1:9/unreachable".to_string()),
        };
        let path = manager.ensure_model(&model).await.unwrap();
        assert_eq!(fs::read(path).unwrap(), b"cached");
    }
}

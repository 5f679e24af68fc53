use crate::core::ingest::{self, DecodedImage};
use crate::core::result_serializer::build_pose_result;
use crate::core::visualizer;
use crate::models::pose::{ExtractResult, Landmark, PoseError, PoseResult};
use crate::platform::pose::PoseLandmarker;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

// ==============================================================================
// Pose Detector
// ==============================================================================

/// Process-wide handle to the landmark model.
///
/// Cloning is cheap; every clone shares one backend guarded by a mutex, so
/// at most one inference runs at a time. Each call is bounded by `timeout`.
#[derive(Clone)]
pub struct PoseDetector {
    landmarker: Arc<Mutex<Box<dyn PoseLandmarker>>>,
    model_info: Arc<str>,
    ready: bool,
    timeout: Duration,
}

impl PoseDetector {
    pub fn new(landmarker: Box<dyn PoseLandmarker>, timeout: Duration) -> Self {
        let model_info: Arc<str> = landmarker.get_model_info().into();
        let ready = landmarker.is_initialized();
        Self {
            landmarker: Arc::new(Mutex::new(landmarker)),
            model_info,
            ready,
            timeout,
        }
    }

    pub fn model_info(&self) -> &str {
        &self.model_info
    }

    /// Whether the backend holds a loaded model
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Run the model on a decoded image
    pub async fn detect(&self, image: Arc<RgbImage>) -> ExtractResult<Option<Vec<Landmark>>> {
        let landmarker = self.landmarker.clone();
        let task = tokio::task::spawn_blocking(move || {
            let mut guard = landmarker.lock().unwrap_or_else(|poisoned| {
                warn!("Pose model lock was poisoned by a panicking inference; continuing");
                poisoned.into_inner()
            });

            let start_time = Instant::now();
            let result = guard.detect(&image);
            debug!(
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Inference finished"
            );
            result
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(PoseError::Inference(format!(
                "inference task failed: {}",
                join_error
            ))),
            Err(_) => Err(PoseError::Inference(format!(
                "inference timed out after {} ms",
                self.timeout.as_millis()
            ))),
        }
    }

    /// Decode, infer and serialize. Failures become a failure record.
    pub async fn extract_keypoints(&self, image_path: &Path) -> PoseResult {
        let path = image_path.to_path_buf();
        let decoded = run_blocking(move || ingest::decode_path(&path)).await;
        self.extract_decoded(decoded).await
    }

    /// Same as [`extract_keypoints`](Self::extract_keypoints) for a base64 image
    pub async fn extract_keypoints_from_base64(&self, base64_image: &str) -> PoseResult {
        let encoded = base64_image.to_string();
        let decoded = run_blocking(move || ingest::decode_base64(&encoded)).await;
        self.extract_decoded(decoded).await
    }

    async fn extract_decoded(&self, decoded: ExtractResult<DecodedImage>) -> PoseResult {
        let decoded = match decoded {
            Ok(decoded) => decoded,
            Err(e) => return PoseResult::from_error(&e),
        };

        let info = decoded.info;
        match self.detect(Arc::new(decoded.pixels)).await {
            Ok(landmarks) => build_pose_result(info, landmarks.as_deref()),
            Err(e) => {
                warn!("Landmark inference failed: {}", e);
                PoseResult::from_error(&e)
            }
        }
    }

    /// Render the detected skeleton over `image_path` and write it as JPEG.
    ///
    /// Writes to `output_path` when given, otherwise to a timestamped name in
    /// the working directory. Returns the written path.
    pub async fn visualize_pose(
        &self,
        image_path: &Path,
        output_path: Option<&Path>,
    ) -> ExtractResult<PathBuf> {
        let path = image_path.to_path_buf();
        let decoded = run_blocking(move || ingest::decode_path(&path)).await?;
        let pixels = Arc::new(decoded.pixels);
        let landmarks = self.detect(pixels.clone()).await?;

        let output = output_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| visualizer::default_visualization_path(image_path));
        let written = output.clone();

        run_blocking(move || {
            let rendered = match landmarks {
                Some(landmarks) => visualizer::render_skeleton(&pixels, &landmarks),
                None => pixels.as_ref().clone(),
            };
            visualizer::save_visualization(&rendered, &output)
        })
        .await?;

        Ok(written)
    }
}

async fn run_blocking<T, F>(f: F) -> ExtractResult<T>
where
    F: FnOnce() -> ExtractResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PoseError::Io(std::io::Error::other(e.to_string())))?
}

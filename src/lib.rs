pub mod cli;
pub mod core;
pub mod models;
pub mod platform;
pub mod server;

use core::config::Config;
use core::pose_detector::PoseDetector;
use models::pose::ExtractResult;
use platform::pose::PoseLandmarker;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global log subscriber. Logs go to stderr so CLI JSON on
/// stdout stays machine-readable. `RUST_LOG` overrides the default level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load the landmark model once and wrap it in the shared detector handle
pub async fn build_detector(config: &Config) -> ExtractResult<PoseDetector> {
    let landmarker = load_landmarker(config).await?;
    let detector = PoseDetector::new(landmarker, config.inference_timeout());
    info!("Pose model ready: {}", detector.model_info());
    Ok(detector)
}

#[cfg(feature = "ml-onnx")]
async fn load_landmarker(config: &Config) -> ExtractResult<Box<dyn PoseLandmarker>> {
    use core::ml_models::resolve_landmark_model;
    use platform::pose::mediapipe_bridge::onnx_backend::OnnxPoseLandmarker;

    let model_path = resolve_landmark_model(config).await?;
    let pose_config = config.pose_config();
    let landmarker = tokio::task::spawn_blocking(move || {
        OnnxPoseLandmarker::new(&model_path, &pose_config)
    })
    .await
    .map_err(|e| models::pose::PoseError::ModelLoad(e.to_string()))??;

    Ok(Box::new(landmarker))
}

#[cfg(not(feature = "ml-onnx"))]
async fn load_landmarker(_config: &Config) -> ExtractResult<Box<dyn PoseLandmarker>> {
    tracing::warn!("Built without an inference runtime; every extraction will fail");
    tracing::warn!("Rebuild with `--features ml-onnx` to enable pose detection");
    Ok(Box::new(platform::pose::UnavailableLandmarker))
}

// Body landmark model bridge
// Abstracts the external 33-point pose model behind a single trait.
// The ONNX Runtime backend is compiled in with the `ml-onnx` feature.

use crate::models::pose::{ExtractResult, Landmark, PoseError};
use image::RgbImage;
#[cfg(feature = "ml-onnx")]
use std::path::Path;

/// Landmark model bridge trait
///
/// `detect` takes `&mut self`: a backend is never entered by two callers at
/// once. Sharing across requests goes through `core::pose_detector`.
pub trait PoseLandmarker: Send {
    /// Run inference on an RGB image.
    ///
    /// Returns `Ok(None)` when no body is found, otherwise the landmarks in
    /// model index order with coordinates normalized to the full image.
    fn detect(&mut self, image: &RgbImage) -> ExtractResult<Option<Vec<Landmark>>>;

    /// Check if the model is loaded
    fn is_initialized(&self) -> bool;

    /// Get model info
    fn get_model_info(&self) -> String;
}

// ==============================================================================
// Letterbox geometry
// ==============================================================================

/// Placement of an image inside a square model input, in input fractions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub input_size: u32,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub pad_left: f32,
    pub pad_top: f32,
    pub content_width: f32,
    pub content_height: f32,
}

impl Letterbox {
    /// Fit a `width` x `height` image into an `input_size` square, keeping aspect
    pub fn fit(width: u32, height: u32, input_size: u32) -> Self {
        let scale = input_size as f32 / width.max(height).max(1) as f32;
        let scaled_width = ((width as f32 * scale).round() as u32).clamp(1, input_size);
        let scaled_height = ((height as f32 * scale).round() as u32).clamp(1, input_size);
        let pad_left_px = (input_size - scaled_width) / 2;
        let pad_top_px = (input_size - scaled_height) / 2;

        Self {
            input_size,
            scaled_width,
            scaled_height,
            pad_left: pad_left_px as f32 / input_size as f32,
            pad_top: pad_top_px as f32 / input_size as f32,
            content_width: scaled_width as f32 / input_size as f32,
            content_height: scaled_height as f32 / input_size as f32,
        }
    }

    pub fn pad_left_px(&self) -> u32 {
        (self.input_size - self.scaled_width) / 2
    }

    pub fn pad_top_px(&self) -> u32 {
        (self.input_size - self.scaled_height) / 2
    }

    /// Map a point from model-input pixels to full-image normalized space
    pub fn unletterbox(&self, x: f32, y: f32, z: f32) -> (f32, f32, f32) {
        let size = self.input_size as f32;
        let nx = (x / size - self.pad_left) / self.content_width;
        let ny = (y / size - self.pad_top) / self.content_height;
        let nz = z / size / self.content_width;
        (nx, ny, nz)
    }
}

pub fn sigmoid(value: f32) -> f32 {
    1.0 / (1.0 + (-value).exp())
}

// ==============================================================================
// ONNX Runtime Implementation
// ==============================================================================

#[cfg(feature = "ml-onnx")]
pub mod onnx_backend {
    use super::*;
    use crate::models::pose::{PoseConfig, LANDMARK_COUNT};
    use image::imageops::{self, FilterType};
    use ndarray::Array4;
    use ort::session::builder::GraphOptimizationLevel;
    use ort::session::Session;
    use ort::value::Tensor;
    use std::path::PathBuf;

    /// Square input edge of the landmark network
    pub const INPUT_SIZE: u32 = 256;

    /// x, y, z, visibility, presence
    const VALUES_PER_LANDMARK: usize = 5;

    pub struct OnnxPoseLandmarker {
        session: Session,
        landmarks_output: String,
        presence_output: String,
        min_detection_confidence: f32,
        model_path: PathBuf,
    }

    impl OnnxPoseLandmarker {
        /// Load the landmark network. Output 0 holds landmarks, output 1 the
        /// pose presence score.
        pub fn new(model_path: &Path, config: &PoseConfig) -> ExtractResult<Self> {
            let session = Session::builder()
                .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
                .and_then(|builder| builder.with_intra_threads(config.inference_threads))
                .and_then(|builder| builder.commit_from_file(model_path))
                .map_err(|e| PoseError::ModelLoad(format!("{}: {}", model_path.display(), e)))?;

            let output_names: Vec<String> =
                session.outputs.iter().map(|output| output.name.clone()).collect();
            if output_names.len() < 2 {
                return Err(PoseError::ModelLoad(format!(
                    "expected landmark and presence outputs, model has {:?}",
                    output_names
                )));
            }

            tracing::info!(
                "Loaded pose landmark model {} (outputs: {:?})",
                model_path.display(),
                output_names
            );

            Ok(Self {
                session,
                landmarks_output: output_names[0].clone(),
                presence_output: output_names[1].clone(),
                min_detection_confidence: config.min_detection_confidence,
                model_path: model_path.to_path_buf(),
            })
        }

        /// [1, 256, 256, 3] float tensor in [0, 1], letterboxed
        fn preprocess(image: &RgbImage) -> (Array4<f32>, Letterbox) {
            let letterbox = Letterbox::fit(image.width(), image.height(), INPUT_SIZE);
            let resized = imageops::resize(
                image,
                letterbox.scaled_width,
                letterbox.scaled_height,
                FilterType::Triangle,
            );

            let size = INPUT_SIZE as usize;
            let mut tensor = Array4::<f32>::zeros((1, size, size, 3));
            let left = letterbox.pad_left_px() as usize;
            let top = letterbox.pad_top_px() as usize;

            for (x, y, pixel) in resized.enumerate_pixels() {
                for c in 0..3 {
                    tensor[[0, top + y as usize, left + x as usize, c]] = pixel[c] as f32 / 255.0;
                }
            }

            (tensor, letterbox)
        }
    }

    impl PoseLandmarker for OnnxPoseLandmarker {
        fn detect(&mut self, image: &RgbImage) -> ExtractResult<Option<Vec<Landmark>>> {
            let (input, letterbox) = Self::preprocess(image);
            let input_tensor =
                Tensor::from_array(input).map_err(|e| PoseError::Inference(e.to_string()))?;

            let outputs = self
                .session
                .run(ort::inputs![input_tensor])
                .map_err(|e| PoseError::Inference(e.to_string()))?;

            let presence = outputs[self.presence_output.as_str()]
                .try_extract_array::<f32>()
                .map_err(|e| PoseError::Inference(format!("presence output: {}", e)))?
                .iter()
                .copied()
                .next()
                .unwrap_or(0.0);

            if presence < self.min_detection_confidence {
                return Ok(None);
            }

            let raw: Vec<f32> = outputs[self.landmarks_output.as_str()]
                .try_extract_array::<f32>()
                .map_err(|e| PoseError::Inference(format!("landmark output: {}", e)))?
                .iter()
                .copied()
                .collect();

            if raw.len() < LANDMARK_COUNT * VALUES_PER_LANDMARK {
                return Err(PoseError::Inference(format!(
                    "landmark output has {} values, expected at least {}",
                    raw.len(),
                    LANDMARK_COUNT * VALUES_PER_LANDMARK
                )));
            }

            // Trailing auxiliary points past the 33 body landmarks are ignored
            let landmarks = raw
                .chunks_exact(VALUES_PER_LANDMARK)
                .take(LANDMARK_COUNT)
                .map(|values| {
                    let (x, y, z) = letterbox.unletterbox(values[0], values[1], values[2]);
                    Landmark::new(x, y, z, sigmoid(values[3]))
                })
                .collect();

            Ok(Some(landmarks))
        }

        fn is_initialized(&self) -> bool {
            true
        }

        fn get_model_info(&self) -> String {
            format!("ONNX Runtime pose landmarker ({})", self.model_path.display())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_missing_model_file_is_a_load_error() {
            let err = OnnxPoseLandmarker::new(
                Path::new("/nonexistent/pose_landmark_heavy.onnx"),
                &PoseConfig::default(),
            )
            .err()
            .expect("loading a missing model must fail");
            assert_eq!(err.kind(), "model_load");
            assert!(err.to_string().contains("pose_landmark_heavy.onnx"));
        }

        #[test]
        fn test_preprocess_letterboxes_into_input_square() {
            let image = RgbImage::from_pixel(64, 32, image::Rgb([255, 255, 255]));
            let (tensor, letterbox) = OnnxPoseLandmarker::preprocess(&image);
            let size = INPUT_SIZE as usize;
            assert_eq!(tensor.shape(), &[1, size, size, 3]);
            assert_eq!(letterbox.pad_top_px(), 64);
            assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
            assert_eq!(tensor[[0, 128, 128, 1]], 1.0);
        }
    }
}

// ==============================================================================
// Fallback when no runtime is compiled in
// ==============================================================================

/// Backend used when the crate is built without an inference runtime.
/// Every call fails with an inference error.
pub struct UnavailableLandmarker;

impl PoseLandmarker for UnavailableLandmarker {
    fn detect(&mut self, _image: &RgbImage) -> ExtractResult<Option<Vec<Landmark>>> {
        Err(PoseError::Inference(
            "no inference backend available (build with the 'ml-onnx' feature)".to_string(),
        ))
    }

    fn is_initialized(&self) -> bool {
        false
    }

    fn get_model_info(&self) -> String {
        "Unavailable (no ML inference - enable 'ml-onnx' feature)".to_string()
    }
}

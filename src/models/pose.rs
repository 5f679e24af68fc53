// Data models for body landmark extraction results

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

// ==============================================================================
// Landmark name table (33 keypoints)
// ==============================================================================

/// Number of landmarks produced by the body pose model
pub const LANDMARK_COUNT: usize = 33;

/// Semantic names of the model's landmark slots, in model output order
pub const KEYPOINT_NAMES: [&str; LANDMARK_COUNT] = [
    "NOSE",
    "LEFT_EYE_INNER",
    "LEFT_EYE",
    "LEFT_EYE_OUTER",
    "RIGHT_EYE_INNER",
    "RIGHT_EYE",
    "RIGHT_EYE_OUTER",
    "LEFT_EAR",
    "RIGHT_EAR",
    "MOUTH_LEFT",
    "MOUTH_RIGHT",
    "LEFT_SHOULDER",
    "RIGHT_SHOULDER",
    "LEFT_ELBOW",
    "RIGHT_ELBOW",
    "LEFT_WRIST",
    "RIGHT_WRIST",
    "LEFT_PINKY",
    "RIGHT_PINKY",
    "LEFT_INDEX",
    "RIGHT_INDEX",
    "LEFT_THUMB",
    "RIGHT_THUMB",
    "LEFT_HIP",
    "RIGHT_HIP",
    "LEFT_KNEE",
    "RIGHT_KNEE",
    "LEFT_ANKLE",
    "RIGHT_ANKLE",
    "LEFT_HEEL",
    "RIGHT_HEEL",
    "LEFT_FOOT_INDEX",
    "RIGHT_FOOT_INDEX",
];

/// Name for a landmark slot. Indices past the table get `UNKNOWN_<index>`.
pub fn keypoint_name(index: usize) -> String {
    match KEYPOINT_NAMES.get(index) {
        Some(name) => (*name).to_string(),
        None => format!("UNKNOWN_{}", index),
    }
}

/// Body landmark indices (33 total)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BodyLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl BodyLandmark {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Skeleton edges drawn by the visualizer (pairs of landmark indices)
pub const POSE_CONNECTIONS: [(BodyLandmark, BodyLandmark); 35] = {
    use BodyLandmark::*;
    [
        // Face
        (Nose, LeftEyeInner),
        (LeftEyeInner, LeftEye),
        (LeftEye, LeftEyeOuter),
        (LeftEyeOuter, LeftEar),
        (Nose, RightEyeInner),
        (RightEyeInner, RightEye),
        (RightEye, RightEyeOuter),
        (RightEyeOuter, RightEar),
        (MouthLeft, MouthRight),
        // Arms and hands
        (LeftShoulder, RightShoulder),
        (LeftShoulder, LeftElbow),
        (LeftElbow, LeftWrist),
        (LeftWrist, LeftPinky),
        (LeftWrist, LeftIndex),
        (LeftWrist, LeftThumb),
        (LeftPinky, LeftIndex),
        (RightShoulder, RightElbow),
        (RightElbow, RightWrist),
        (RightWrist, RightPinky),
        (RightWrist, RightIndex),
        (RightWrist, RightThumb),
        (RightPinky, RightIndex),
        // Torso
        (LeftShoulder, LeftHip),
        (RightShoulder, RightHip),
        (LeftHip, RightHip),
        // Legs
        (LeftHip, LeftKnee),
        (RightHip, RightKnee),
        (LeftKnee, LeftAnkle),
        (RightKnee, RightAnkle),
        (LeftAnkle, LeftHeel),
        (RightAnkle, RightHeel),
        (LeftHeel, LeftFootIndex),
        (RightHeel, RightFootIndex),
        (LeftAnkle, LeftFootIndex),
        (RightAnkle, RightFootIndex),
    ]
};

// ==============================================================================
// Model output
// ==============================================================================

/// A raw landmark as produced by the pose model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32, // Normalized [0, 1], image-width relative
    pub y: f32, // Normalized [0, 1], image-height relative
    pub z: f32, // Depth relative to the hip midpoint
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility >= threshold
    }

    /// Pixel position, or `None` when the point lies outside the image
    pub fn to_pixel(&self, width: u32, height: u32) -> Option<(f32, f32)> {
        if !(0.0..=1.0).contains(&self.x) || !(0.0..=1.0).contains(&self.y) {
            return None;
        }
        let px = (self.x * width as f32).min(width.saturating_sub(1) as f32);
        let py = (self.y * height as f32).min(height.saturating_sub(1) as f32);
        Some((px, py))
    }
}

// ==============================================================================
// Response records
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

/// A named keypoint in a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub id: usize,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: f32,
}

/// Successful extraction. `keypoints` is empty iff `pose_detected` is false.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseExtraction {
    pub timestamp: String,
    pub image_info: ImageInfo,
    pub pose_detected: bool,
    pub keypoints: Vec<Keypoint>,
}

/// Failed extraction
#[derive(Debug, Clone, PartialEq)]
pub struct PoseFailure {
    pub timestamp: String,
    pub error: String,
    pub error_type: &'static str,
}

/// Outcome of one extraction, serialized with a boolean `success` flag
#[derive(Debug, Clone, PartialEq)]
pub enum PoseResult {
    Success(PoseExtraction),
    Failure(PoseFailure),
}

impl PoseResult {
    pub fn from_error(error: &PoseError) -> Self {
        PoseResult::Failure(PoseFailure {
            timestamp: now_iso8601(),
            error: error.to_string(),
            error_type: error.kind(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PoseResult::Success(_))
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        match self {
            PoseResult::Success(extraction) => &extraction.keypoints,
            PoseResult::Failure(_) => &[],
        }
    }
}

impl Serialize for PoseResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PoseResult::Success(extraction) => {
                let mut state = serializer.serialize_struct("PoseResult", 5)?;
                state.serialize_field("success", &true)?;
                state.serialize_field("timestamp", &extraction.timestamp)?;
                state.serialize_field("image_info", &extraction.image_info)?;
                state.serialize_field("pose_detected", &extraction.pose_detected)?;
                state.serialize_field("keypoints", &extraction.keypoints)?;
                state.end()
            }
            PoseResult::Failure(failure) => {
                let mut state = serializer.serialize_struct("PoseResult", 4)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("error", &failure.error)?;
                state.serialize_field("error_type", failure.error_type)?;
                state.serialize_field("timestamp", &failure.timestamp)?;
                state.end()
            }
        }
    }
}

/// One element of a batch response: a result annotated with its upload name
#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    #[serde(flatten)]
    pub result: PoseResult,
    pub filename: String,
}

/// ISO-8601 timestamp used in every response record
pub fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

// ==============================================================================
// Configuration
// ==============================================================================

/// Fixed inference settings the adapter is built with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoseConfig {
    pub min_detection_confidence: f32, // Pose presence threshold (default: 0.5)
    pub model_complexity: ModelComplexity,
    pub inference_threads: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelComplexity {
    Lite = 0,  // Fastest, less accurate
    Full = 1,  // Balanced
    Heavy = 2, // Slowest, most accurate
}

impl ModelComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelComplexity::Lite => "lite",
            ModelComplexity::Full => "full",
            ModelComplexity::Heavy => "heavy",
        }
    }
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            min_detection_confidence: 0.5,
            model_complexity: ModelComplexity::Heavy,
            inference_threads: 4,
        }
    }
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PoseError {
    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Visualization failed: {0}")]
    Visualization(String),

    #[error("{0}")]
    Validation(String),

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PoseError {
    /// Short machine-readable failure class
    pub fn kind(&self) -> &'static str {
        match self {
            PoseError::Decode(_) => "decode",
            PoseError::Inference(_) => "inference",
            PoseError::Visualization(_) => "visualization",
            PoseError::Validation(_) => "validation",
            PoseError::ModelLoad(_) => "model_load",
            PoseError::Config(_) => "config",
            PoseError::Io(_) => "io",
        }
    }
}

pub type ExtractResult<T> = Result<T, PoseError>;

// Pose estimation platform integration
// Provides the landmark model bridge and its backends

pub mod mediapipe_bridge;

pub use mediapipe_bridge::{PoseLandmarker, UnavailableLandmarker};

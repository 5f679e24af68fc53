pub mod config;
pub mod ingest;
pub mod ml_models;
pub mod temp_files;

// Pose estimation
pub mod pose_detector;
pub mod result_serializer;
pub mod visualizer;

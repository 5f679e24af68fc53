// Command line entry: API server or one-shot extraction

use crate::core::config::Config;
use crate::core::pose_detector::PoseDetector;
use crate::models::pose::ExtractResult;
use crate::server::{self, AppState};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Serve the HTTP API
    Api,
    /// Process a single image and exit
    Cli,
}

/// MediaPipe Pose Keypoint Extraction
#[derive(Debug, Parser)]
#[command(name = "pose-extractor", version, about)]
pub struct Args {
    /// Run mode
    #[arg(long, value_enum, default_value_t = Mode::Api)]
    pub mode: Mode,

    /// Path to input image (CLI mode)
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Output JSON file path (CLI mode)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Create pose visualization
    #[arg(long)]
    pub visualize: bool,

    /// API server port
    #[arg(long, default_value_t = 5000)]
    pub port: u16,

    /// API server host
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Settings file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::load(args.config.as_deref())?;

    match args.mode {
        Mode::Api => {
            let detector = crate::build_detector(&config).await?;
            print_endpoints(&args.host, args.port);
            server::serve(&args.host, args.port, AppState::new(detector, config)).await?;
            info!("Server stopped");
        }
        Mode::Cli => {
            let Some(image) = args.image.as_deref() else {
                println!("Error: --image is required for CLI mode");
                return Ok(());
            };
            if !image.exists() {
                println!("Error: Image file not found: {}", image.display());
                return Ok(());
            }

            let detector = crate::build_detector(&config).await?;
            run_once(&detector, image, args.output.as_deref(), args.visualize).await?;
        }
    }

    Ok(())
}

fn print_endpoints(host: &str, port: u16) {
    println!("Starting MediaPipe Pose API server on {}:{}", host, port);
    println!("Endpoints:");
    println!("  GET  /health - Health check");
    println!("  POST /extract-pose - Extract keypoints from image");
    println!("  POST /visualize-pose - Create pose visualization");
    println!("  POST /batch-extract - Batch process multiple images");
}

/// Extract one image, print or save the JSON, optionally render the overlay
pub async fn run_once(
    detector: &PoseDetector,
    image: &Path,
    output: Option<&Path>,
    visualize: bool,
) -> ExtractResult<()> {
    println!("Processing image: {}", image.display());
    let result = detector.extract_keypoints(image).await;
    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    match output {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            println!("Results saved to: {}", path.display());
        }
        None => println!("{}", json),
    }

    if visualize {
        let written = detector.visualize_pose(image, None).await?;
        println!("Visualization saved to: {}", written.display());
    }

    Ok(())
}

// HTTP API for the pose extractor
// Routes requests to the shared detector; every upload lives only for its request.

pub mod error;
pub mod handlers;

use crate::core::config::Config;
use crate::core::pose_detector::PoseDetector;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

pub use error::ApiError;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub detector: PoseDetector,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(detector: PoseDetector, config: Config) -> Self {
        Self {
            detector,
            config: Arc::new(config),
        }
    }
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/extract-pose", post(handlers::extract_pose))
        .route("/visualize-pose", post(handlers::visualize_pose))
        .route("/batch-extract", post(handlers::batch_extract))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind `host:port` and serve until Ctrl-C
pub async fn serve(host: &str, port: u16, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested, draining in-flight requests"),
        Err(e) => {
            // Without a signal handler the server runs until killed
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

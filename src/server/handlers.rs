// Request handlers for the pose API

use super::error::ApiError;
use super::AppState;
use crate::core::temp_files::{reserve_output, TempUpload};
use crate::models::pose::{now_iso8601, BatchEntry, PoseError, PoseResult};
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

// ==============================================================================
// Response Types
// ==============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub model: String,
    pub ready: bool,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct VisualizationResponse {
    pub success: bool,
    pub visualization: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub total_processed: usize,
    pub results: Vec<BatchEntry>,
    pub timestamp: String,
}

/// One multipart part. `filename` is `None` for plain form fields.
struct Upload {
    field: String,
    filename: Option<String>,
    bytes: Bytes,
}

async fn read_uploads(multipart: &mut Multipart) -> Result<Vec<Upload>, ApiError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        uploads.push(Upload {
            field: name,
            filename,
            bytes,
        });
    }
    Ok(uploads)
}

/// First file part under `field`, checked for a non-empty filename
fn take_file(uploads: Vec<Upload>, field: &str, missing: &str) -> Result<(String, Bytes), ApiError> {
    let upload = uploads
        .into_iter()
        .find(|upload| upload.field == field && upload.filename.is_some())
        .ok_or_else(|| ApiError::validation(missing))?;

    match upload.filename {
        Some(filename) if !filename.is_empty() => Ok((filename, upload.bytes)),
        _ => Err(ApiError::validation("No file selected")),
    }
}

async fn extract_upload(state: &AppState, filename: &str, bytes: Bytes) -> Result<PoseResult, PoseError> {
    let upload =
        TempUpload::persist(state.config.temp_dir.clone(), "temp", filename.to_string(), bytes).await?;
    Ok(state.detector.extract_keypoints(upload.path()).await)
}

/// Any `base64_image` key counts as input; a non-string value is a decode failure
async fn extract_json(state: &AppState, body: &Map<String, Value>) -> Result<PoseResult, ApiError> {
    match body.get("base64_image") {
        Some(Value::String(encoded)) => Ok(state.detector.extract_keypoints_from_base64(encoded).await),
        Some(other) => Ok(PoseResult::from_error(&PoseError::Decode(format!(
            "base64_image must be a string, got {}",
            json_type(other)
        )))),
        None => Err(ApiError::validation(
            "No image provided. Use 'image' file or 'base64_image' in JSON",
        )),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ==============================================================================
// Handlers
// ==============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: state.config.service_name.clone(),
        model: state.detector.model_info().to_string(),
        ready: state.detector.is_ready(),
        timestamp: now_iso8601(),
    })
}

/// POST /extract-pose
///
/// Accepts a multipart `image` file or a JSON body with `base64_image`.
/// Decode and inference failures are reported in the body with status 200.
pub async fn extract_pose(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<PoseResult>, ApiError> {
    let request_id = Uuid::new_v4();
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let result = if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &state).await?;
        let uploads = read_uploads(&mut multipart).await?;
        let (filename, bytes) = take_file(
            uploads,
            "image",
            "No image provided. Use 'image' file or 'base64_image' in JSON",
        )?;

        info!(%request_id, filename = %filename, "Extracting pose from upload");
        extract_upload(&state, &filename, bytes).await?
    } else if content_type.starts_with("application/json") {
        let Json(body) = Json::<Map<String, Value>>::from_request(request, &state).await?;
        info!(%request_id, "Extracting pose from base64 payload");
        extract_json(&state, &body).await?
    } else {
        return Err(ApiError::validation(
            "No image provided. Use 'image' file or 'base64_image' in JSON",
        ));
    };

    debug!(%request_id, success = result.is_success(), "Extraction finished");
    Ok(Json(result))
}

/// POST /visualize-pose
pub async fn visualize_pose(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<VisualizationResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let mut multipart = multipart?;
    let uploads = read_uploads(&mut multipart).await?;
    let (filename, bytes) = take_file(uploads, "image", "No image file provided")?;
    info!(%request_id, filename = %filename, "Rendering pose visualization");

    let temp_dir = &state.config.temp_dir;
    let input = TempUpload::persist(temp_dir.clone(), "temp_input", filename, bytes).await?;
    let output = reserve_output(temp_dir, "pose_visualization", "jpg")?;

    state
        .detector
        .visualize_pose(input.path(), Some(output.path()))
        .await?;

    let rendered = tokio::fs::read(output.path()).await.map_err(PoseError::from)?;
    debug!(%request_id, bytes = rendered.len(), "Visualization encoded");

    Ok(Json(VisualizationResponse {
        success: true,
        visualization: format!("data:image/jpeg;base64,{}", STANDARD.encode(rendered)),
        timestamp: now_iso8601(),
    }))
}

/// POST /batch-extract
///
/// Parts under `images` with an empty filename are skipped and not counted.
pub async fn batch_extract(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let mut multipart = multipart?;
    let uploads: Vec<Upload> = read_uploads(&mut multipart)
        .await?
        .into_iter()
        .filter(|upload| upload.field == "images" && upload.filename.is_some())
        .collect();

    if uploads.is_empty() {
        return Err(ApiError::validation("No images provided"));
    }

    let mut results = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let filename = upload.filename.unwrap_or_default();
        if filename.is_empty() {
            debug!(%request_id, "Skipping batch entry without a filename");
            continue;
        }

        let result = match extract_upload(&state, &filename, upload.bytes).await {
            Ok(result) => result,
            Err(e) => PoseResult::from_error(&e),
        };
        results.push(BatchEntry { result, filename });
    }

    info!(%request_id, total = results.len(), "Batch extraction finished");

    Ok(Json(BatchResponse {
        success: true,
        total_processed: results.len(),
        results,
        timestamp: now_iso8601(),
    }))
}

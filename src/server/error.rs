// Conversion of service errors into JSON HTTP responses

use crate::models::pose::{now_iso8601, PoseError};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;

/// A request failure: the error plus the status it is reported with
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: PoseError,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        PoseError::Validation(message.into()).into()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<PoseError> for ApiError {
    fn from(error: PoseError) -> Self {
        let status = match error {
            PoseError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, error }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: PoseError::Validation(format!("expected a multipart upload: {}", rejection.body_text())),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        Self {
            status: error.status(),
            error: PoseError::Validation(format!("malformed multipart body: {}", error.body_text())),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: PoseError::Validation(format!("invalid JSON body: {}", rejection.body_text())),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!("Request failed ({}): {}", self.status, self.error);
        }

        let body = json!({
            "success": false,
            "error": self.error.to_string(),
            "error_type": self.error.kind(),
            "timestamp": now_iso8601(),
        });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::validation("missing").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(PoseError::Decode("x".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(PoseError::Visualization("x".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_shape() {
        let response = ApiError::validation("No file selected").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

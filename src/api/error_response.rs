//! JSON error bodies for the API routes
//!
//! Only the JSON routes (`/jobs/:id`) use these. Form rejections on `/generate` are
//! plain text with status 200.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// HTTP status, not serialized
    #[serde(skip, default = "default_status")]
    pub status: StatusCode,
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "not_found", "invalid_id")
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

fn default_status() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

impl ApiError {
    /// Create an error with an explicit status
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    /// 404 for a missing resource
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("{} not found", resource.into()),
        )
    }

    /// 400 for a malformed request
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

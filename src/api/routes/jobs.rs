//! Job status handlers.

use crate::api::AppState;
use crate::api::error_response::ApiError;
use crate::types::{JobId, JobRecord};
use axum::{
    Json,
    extract::{Path, State},
};

/// GET /jobs/:id - Job record
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    let id: JobId = id
        .parse()
        .map_err(|e| ApiError::bad_request("invalid_id", format!("invalid job id: {}", e)))?;

    state
        .runner
        .registry()
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("job {}", id)))
}

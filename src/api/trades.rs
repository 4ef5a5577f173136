use axum::body::Bytes;
use axum::extract::State;
use axum::Json;

use super::{AppState, Caller};
use crate::error::AppError;
use crate::orchestration::UploadSummary;

/// Upload a CSV trade log (admin only).
pub async fn upload_trades(
    Caller(role): Caller,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<UploadSummary>, AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest("empty trade log".to_string()));
    }
    let summary = state.ingestor.upload_trades(&role, &body).await?;
    Ok(Json(summary))
}

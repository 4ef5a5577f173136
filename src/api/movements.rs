use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::{AppState, Caller};
use crate::error::AppError;
use crate::ingest::MovementRecord;
use crate::orchestration::MovementOutcome;

/// Record a contribution or withdrawal (admin only).
///
/// Replaying a movement id already recorded answers 200 instead of 201.
pub async fn record_movement(
    Caller(role): Caller,
    State(state): State<AppState>,
    Json(record): Json<MovementRecord>,
) -> Result<(StatusCode, Json<MovementOutcome>), AppError> {
    let outcome = state.ingestor.record_movement(&role, &record).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

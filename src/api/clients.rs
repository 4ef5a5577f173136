use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::{AppState, Caller};
use crate::domain::Client;
use crate::error::AppError;
use crate::ingest::ClientRecord;

/// Register or update a client (admin only).
pub async fn register_client(
    Caller(role): Caller,
    State(state): State<AppState>,
    Json(record): Json<ClientRecord>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    let client = state.ingestor.register_client(&role, &record).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

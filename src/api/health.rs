use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::error::AppError;

/// Liveness: the process is serving requests.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Readiness: the ledger store answers and a global split config is in place.
pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state
        .orchestrator
        .check_ready()
        .await
        .map_err(|e| AppError::Unavailable(e.to_string()))?;
    Ok(Json(serde_json::json!({"status": "ready"})))
}

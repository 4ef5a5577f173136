use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::{AppState, Caller};
use crate::access::ReportView;
use crate::domain::MonthKey;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    /// Last month to report, `YYYY-MM`.
    pub through: Option<String>,
}

pub async fn get_report(
    Caller(role): Caller,
    Query(params): Query<ReportQuery>,
    State(state): State<AppState>,
) -> Result<Json<ReportView>, AppError> {
    let through = match params.through.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<MonthKey>()
                .map_err(|e| AppError::BadRequest(e.to_string()))?,
        ),
    };

    let view = state.orchestrator.report(&role, through).await?;
    Ok(Json(view))
}

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use super::{AppState, Caller};
use crate::access::AccessFilter;
use crate::domain::{ClientId, Decimal, RawSplitConfig, SplitConfig, SplitConfigSet};
use crate::error::AppError;
use crate::orchestration::IngestionError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitConfigUpdate {
    /// Absent for the global config.
    #[serde(default)]
    pub client_id: Option<String>,
    pub tax_rate: Decimal,
    pub trader_share: Decimal,
    #[serde(default)]
    pub investor_share: Option<Decimal>,
}

pub async fn get_split_configs(
    Caller(role): Caller,
    State(state): State<AppState>,
) -> Result<Json<SplitConfigSet>, AppError> {
    Ok(Json(state.orchestrator.split_configs(&role).await?))
}

/// Replace the global config or one client's override, validated as a whole.
pub async fn put_split_config(
    Caller(role): Caller,
    State(state): State<AppState>,
    Json(update): Json<SplitConfigUpdate>,
) -> Result<Json<SplitConfigSet>, AppError> {
    AccessFilter::require_admin(&role)?;
    let config = SplitConfig::try_from(RawSplitConfig {
        tax_rate: update.tax_rate,
        trader_share: update.trader_share,
        investor_share: update.investor_share,
    })
    .map_err(IngestionError::from)?;
    let client_id = update
        .client_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ClientId::new);

    let configs = state
        .ingestor
        .update_split_config(&role, client_id.as_ref(), config)
        .await?;
    Ok(Json(configs))
}

pub mod clients;
pub mod health;
pub mod movements;
pub mod report;
pub mod split_config;
pub mod trades;

use crate::access::Role;
use crate::domain::ClientId;
use crate::error::AppError;
use crate::orchestration::{Ingestor, Orchestrator};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Header naming the caller's role: `admin` or `client`.
pub const ROLE_HEADER: &str = "x-role";
/// Header naming the calling client; required with `x-role: client`.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub ingestor: Arc<Ingestor>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, ingestor: Arc<Ingestor>) -> Self {
        Self {
            orchestrator,
            ingestor,
        }
    }
}

/// The caller's role, taken from request headers.
///
/// Authentication happens in front of this service; the headers are trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub Role);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match header(parts, ROLE_HEADER) {
            Some(role) if role.eq_ignore_ascii_case("admin") => Ok(Caller(Role::Admin)),
            Some(role) if role.eq_ignore_ascii_case("client") => header(parts, CLIENT_ID_HEADER)
                .map(|id| Caller(Role::Client(ClientId::new(id))))
                .ok_or_else(|| {
                    AppError::BadRequest(format!("{CLIENT_ID_HEADER} is required for the client role"))
                }),
            Some(other) => Err(AppError::BadRequest(format!("unknown role {other:?}"))),
            None => Err(AppError::Forbidden(format!("missing {ROLE_HEADER} header"))),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/report", get(report::get_report))
        .route("/v1/trades", post(trades::upload_trades))
        .route("/v1/clients", post(clients::register_client))
        .route("/v1/movements", post(movements::record_movement))
        .route(
            "/v1/config",
            get(split_config::get_split_configs).put(split_config::put_split_config),
        )
        .layer(cors)
        .with_state(state)
}

//! Health, version and metrics endpoints

use crate::error::ApiError;
use crate::models::{HealthResponse, VersionResponse};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use llm_guardrail_core::Direction;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

/// GET /health/live
pub async fn live() -> impl IntoResponse {
    Json(serde_json::json!({ "live": true }))
}

/// GET /health/ready
///
/// Ready once the validator registry holds at least one entry.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.engine.registry();
    let validators =
        registry.descriptors(Direction::Input).len() + registry.descriptors(Direction::Output).len();
    let ready = validators > 0;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({
            "ready": ready,
            "validators": validators,
            "bearer_auth": state.bearer.is_some(),
        })),
    )
}

/// GET /version
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let handle = state.metrics.as_ref().ok_or(ApiError::MetricsDisabled)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}

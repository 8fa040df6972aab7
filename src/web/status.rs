//! Health and status handlers.

use crate::portal::session::SessionInfo;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache_connected: bool,
    pub session_active: bool,
    pub timestamp: DateTime<Utc>,
}

/// GET /health
///
/// `healthy` when the cache backend answers; an inactive portal session only
/// degrades, since the next fetch will bootstrap one.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.enrollment.cache_stats().await;
    let session_active = state.enrollment.is_authenticated().await;
    let status = if stats.connected { "healthy" } else { "degraded" };
    Json(HealthResponse {
        status,
        cache_connected: stats.connected,
        session_active,
        timestamp: Utc::now(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub version: &'static str,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionInfo>,
}

/// GET /status
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        session: state.enrollment.session_info().await,
    })
}

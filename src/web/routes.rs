//! Route table and middleware stack.

use crate::state::AppState;
use crate::web::{enrollment, status};
use axum::Router;
use axum::routing::{get, post};
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the full application router under `/api/v1`.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route("/enrollment", get(enrollment::get_enrollment))
        .route(
            "/enrollment/subjects/{subject}",
            get(enrollment::get_enrollment_by_subject),
        )
        .route("/cache/invalidate", post(enrollment::invalidate_cache))
        .route("/cache/stats", get(enrollment::cache_stats));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .with_state(state)
}

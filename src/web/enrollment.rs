//! Enrollment and cache-administration handlers.

use crate::cache::CacheStats;
use crate::models::EnrollmentResult;
use crate::state::AppState;
use crate::web::error::ApiError;
use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

fn default_use_cache() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct EnrollmentQuery {
    /// Comma-separated subject codes, e.g. `CSC,MAT`.
    subjects: String,
    term: Option<String>,
    #[serde(default = "default_use_cache")]
    use_cache: bool,
}

/// GET /enrollment?subjects=CSC,MAT&term=2025FA
pub async fn get_enrollment(
    State(state): State<AppState>,
    Query(query): Query<EnrollmentQuery>,
) -> Result<Json<EnrollmentResult>, ApiError> {
    let subjects: Vec<String> = query
        .subjects
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();
    if subjects.is_empty() {
        return Err(ApiError::invalid_request(
            "subjects query parameter must name at least one subject code",
        ));
    }

    let result = state
        .enrollment
        .get_enrollment(&subjects, query.term.as_deref(), query.use_cache)
        .await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct SubjectQuery {
    term: Option<String>,
    #[serde(default = "default_use_cache")]
    use_cache: bool,
}

/// GET /enrollment/subjects/{subject}
pub async fn get_enrollment_by_subject(
    State(state): State<AppState>,
    Path(subject): Path<String>,
    Query(query): Query<SubjectQuery>,
) -> Result<Json<EnrollmentResult>, ApiError> {
    let result = state
        .enrollment
        .get_enrollment(&[subject], query.term.as_deref(), query.use_cache)
        .await?;
    Ok(Json(result))
}

fn default_pattern() -> String {
    "enrollment:*".to_string()
}

#[derive(Debug, Deserialize)]
pub struct InvalidateQuery {
    #[serde(default = "default_pattern")]
    pattern: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateResponse {
    pub success: bool,
    pub deleted_count: u64,
    pub pattern: String,
    pub timestamp: DateTime<Utc>,
}

/// POST /cache/invalidate?pattern=enrollment:CSC*
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Query(query): Query<InvalidateQuery>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    let deleted_count = state.enrollment.invalidate_cache(&query.pattern).await?;
    info!(pattern = %query.pattern, deleted_count, "cache invalidated by request");
    Ok(Json(InvalidateResponse {
        success: true,
        deleted_count,
        pattern: query.pattern,
        timestamp: Utc::now(),
    }))
}

/// GET /cache/stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.enrollment.cache_stats().await)
}

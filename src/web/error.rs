//! API error envelope and status mapping.

use crate::cache::CacheError;
use crate::portal::PortalError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorCode {
    InvalidRequest,
    PortalAuthentication,
    PortalUnavailable,
    PortalTimeout,
    PortalResponseInvalid,
    FetchFailed,
    CacheUnavailable,
}

/// Error returned to API clients as `{ "error": ..., "message": ... }`.
#[derive(Debug)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: ApiErrorCode::InvalidRequest,
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self.code {
            ApiErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::PortalAuthentication => StatusCode::UNAUTHORIZED,
            ApiErrorCode::PortalUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::PortalTimeout => StatusCode::GATEWAY_TIMEOUT,
            ApiErrorCode::PortalResponseInvalid | ApiErrorCode::FetchFailed => {
                StatusCode::BAD_GATEWAY
            }
            ApiErrorCode::CacheUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct Body {
            error: ApiErrorCode,
            message: String,
        }
        (
            self.status(),
            Json(Body {
                error: self.code,
                message: self.message,
            }),
        )
            .into_response()
    }
}

impl From<PortalError> for ApiError {
    fn from(e: PortalError) -> Self {
        let code = match &e {
            PortalError::Validation(_) => ApiErrorCode::InvalidRequest,
            PortalError::Authentication(_) => ApiErrorCode::PortalAuthentication,
            PortalError::Network(_) | PortalError::Request { .. } => {
                ApiErrorCode::PortalUnavailable
            }
            PortalError::Timeout(_) => ApiErrorCode::PortalTimeout,
            PortalError::Parse { .. } => ApiErrorCode::PortalResponseInvalid,
            PortalError::Aggregate(_) => ApiErrorCode::FetchFailed,
        };
        Self {
            code,
            message: e.to_string(),
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(e: CacheError) -> Self {
        Self {
            code: ApiErrorCode::CacheUnavailable,
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = ApiError::from(PortalError::Validation("bad subject".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn timeout_maps_to_gateway_timeout() {
        let err = ApiError::from(PortalError::Timeout(std::time::Duration::from_secs(45)));
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn aggregate_maps_to_bad_gateway() {
        let err = ApiError::from(PortalError::Aggregate("all searches failed".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}

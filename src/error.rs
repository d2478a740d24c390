//! Error types for Hubdash
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.
//! Every response body has the shape `{error, message?}`; raw upstream
//! error objects never cross this boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// Validation errors are raised before any upstream call; upstream failures
/// are normalized per-call into the three `Upstream*` variants.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or expired session (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Blanket per-IP limit exceeded (429)
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Invalid request detected before any upstream call (400)
    #[error("{reason}")]
    Validation {
        reason: String,
        detail: Option<String>,
    },

    /// Upstream rejected the caller's permissions (403)
    #[error("Permission denied: {0}")]
    UpstreamPermission(String),

    /// Upstream resource does not exist (404)
    #[error("Not found: {0}")]
    UpstreamNotFound(String),

    /// Any other upstream failure; the upstream status is forwarded when known
    #[error("Failed to {action}: {detail}")]
    Upstream {
        action: String,
        status: Option<u16>,
        detail: String,
    },

    /// Transport-level failure talking to upstream (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Validation failure with a bare `error` field.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
            detail: None,
        }
    }

    /// Validation failure carrying an additional `message` field.
    pub fn validation_with(reason: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
            detail: Some(detail.into()),
        }
    }

    /// Normalized upstream failure for the given action.
    pub fn upstream(
        action: impl Into<String>,
        status: Option<u16>,
        detail: impl Into<String>,
    ) -> Self {
        Self::Upstream {
            action: action.into(),
            status,
            detail: detail.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamPermission(_) => StatusCode::FORBIDDEN,
            Self::UpstreamNotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream { status, .. } => status
                .and_then(|code| StatusCode::from_u16(code).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::HttpClient(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to its status code and the stable
    /// `{error, message?}` JSON body.
    fn into_response(self) -> Response {
        use axum::Json;

        let status = self.status_code();

        let (error, message) = match &self {
            Self::Unauthorized => ("Authentication required".to_string(), None),
            Self::RateLimited => (
                "Rate limit exceeded".to_string(),
                Some("Too many requests from this IP, please try again later.".to_string()),
            ),
            Self::Validation { reason, detail } => (reason.clone(), detail.clone()),
            Self::UpstreamPermission(detail) => {
                ("Permission denied".to_string(), Some(detail.clone()))
            }
            Self::UpstreamNotFound(detail) => ("Not found".to_string(), Some(detail.clone())),
            Self::Upstream { action, detail, .. } => {
                (format!("Failed to {action}"), Some(detail.clone()))
            }
            Self::HttpClient(_) => ("Upstream request failed".to_string(), None),
            Self::Config(message) => (message.clone(), None),
            Self::Internal(_) => ("Internal server error".to_string(), None),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        }

        let mut body = serde_json::json!({ "error": error });
        if let Some(message) = message {
            body["message"] = serde_json::Value::String(message);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_401() {
        assert_eq!(
            AppError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(
            AppError::validation("Missing required fields")
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn upstream_permission_and_not_found_map_to_403_and_404() {
        assert_eq!(
            AppError::UpstreamPermission("nope".to_string())
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::UpstreamNotFound("gone".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn upstream_forwards_known_status() {
        let error = AppError::upstream("create pull request", Some(422), "Validation Failed");
        assert_eq!(
            error.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn upstream_without_status_falls_back_to_500() {
        let error = AppError::upstream("fetch repositories", None, "connection reset");
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rate_limited_maps_to_429() {
        assert_eq!(
            AppError::RateLimited.into_response().status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}

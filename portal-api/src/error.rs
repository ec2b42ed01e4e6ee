//! API error types.
//!
//! Client-facing messages are fixed per error code. Internal detail such as
//! store failures or tenant ids is logged, never returned.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use portal_tenancy::TenancyError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// API error type.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Tenant resolution or isolation failure
    #[error(transparent)]
    Tenancy(#[from] TenancyError),

    /// Access forbidden
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Bad request / validation error
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Tenant resolution exceeded the request budget
    #[error("Tenant resolution timed out after {0}ms")]
    ResolutionTimeout(u64),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Tenancy(e) => match e {
                TenancyError::InvalidDomain { .. } => StatusCode::BAD_REQUEST,
                TenancyError::TenantSuspended { .. }
                | TenancyError::TenantCancelled { .. }
                | TenancyError::TenantTrialExpired { .. }
                | TenancyError::MissingTenantContext { .. }
                | TenancyError::CrossTenantAccessDenied { .. } => StatusCode::FORBIDDEN,
                TenancyError::StoreUnavailable { .. } | TenancyError::LookupTimeout { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            },
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ResolutionTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code string.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Tenancy(e) if e.is_infrastructure() => "SERVICE_UNAVAILABLE",
            Self::Tenancy(e) => e.code(),
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::ResolutionTimeout(_) => "SERVICE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the message shown to clients.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Tenancy(e) => match e {
                TenancyError::InvalidDomain { .. } => "Unrecognized domain".to_string(),
                TenancyError::TenantSuspended { .. } => {
                    "This account has been suspended".to_string()
                }
                TenancyError::TenantCancelled { .. } => {
                    "This account is no longer active".to_string()
                }
                TenancyError::TenantTrialExpired { .. } => {
                    "The trial period for this account has ended".to_string()
                }
                TenancyError::StoreUnavailable { .. } | TenancyError::LookupTimeout { .. } => {
                    "Service temporarily unavailable".to_string()
                }
                TenancyError::MissingTenantContext { .. } => {
                    "A tenant context is required for this request".to_string()
                }
                TenancyError::CrossTenantAccessDenied { .. } => {
                    "Access to this resource is not permitted".to_string()
                }
            },
            Self::Forbidden(message) | Self::BadRequest(message) => message.clone(),
            Self::ResolutionTimeout(_) => "Service temporarily unavailable".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Builds the response, tagging the body with `request_id`.
    #[must_use]
    pub fn into_response_with(self, request_id: Option<&str>) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.error_code(), error = %self, request_id, "Request failed");
        } else {
            warn!(code = self.error_code(), error = %self, request_id, "Request rejected");
        }

        let body = ErrorResponse {
            status: "error",
            code: self.error_code(),
            message: self.public_message(),
            request_id: request_id.map(ToString::to_string),
        };

        (status, Json(body)).into_response()
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error status
    pub status: &'static str,
    /// Error code
    pub code: &'static str,
    /// Error message
    pub message: String,
    /// Request ID (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_with(None)
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenancy_status_codes() {
        assert_eq!(
            ApiError::from(TenancyError::invalid_domain("no tenant")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(TenancyError::TenantSuspended {
                tenant_id: "t".into()
            })
            .status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(TenancyError::store_unavailable("pool exhausted")).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(TenancyError::missing_context("read cases")).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_public_message_hides_detail() {
        let err = ApiError::from(TenancyError::store_unavailable("postgres at 10.0.0.5 refused"));
        assert!(!err.public_message().contains("10.0.0.5"));

        let err = ApiError::from(TenancyError::invalid_domain("no tenant owns secret.example.com"));
        assert_eq!(err.public_message(), "Unrecognized domain");
        assert_eq!(err.error_code(), "INVALID_DOMAIN");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::Internal("x".into()).error_code(), "INTERNAL_ERROR");
        assert_eq!(ApiError::ResolutionTimeout(10).status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

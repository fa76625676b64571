//! HTTP error mapping.
//!
//! Domain errors become status codes here; everything unexpected becomes
//! a 500 carrying the error text. The response body mirrors the
//! `{"detail": ...}` shape the REST clients expect.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use storefront_domain::DomainError;

/// An error ready to leave the HTTP boundary.
#[derive(Debug)]
pub enum ApiError {
    /// A domain operation failed.
    Domain(DomainError),
    /// Missing or invalid credentials.
    Unauthorized(String),
    /// Authenticated but not allowed.
    Forbidden(String),
    /// Route-level resource miss.
    NotFound(String),
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self::Domain(error)
    }
}

impl ApiError {
    fn status_and_detail(self) -> (StatusCode, String) {
        match self {
            Self::Domain(error) => {
                let status = match &error {
                    DomainError::Validation { .. }
                    | DomainError::AmbiguousProduct { .. }
                    | DomainError::InsufficientStock { .. }
                    | DomainError::SelfDeletion => StatusCode::BAD_REQUEST,
                    DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
                    DomainError::Duplicate { .. } => StatusCode::CONFLICT,
                    DomainError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, error.to_string())
            }
            Self::Unauthorized(detail) => (StatusCode::UNAUTHORIZED, detail),
            Self::Forbidden(detail) => (StatusCode::FORBIDDEN, detail),
            Self::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        if status.is_server_error() {
            tracing::error!(status = %status, detail, "request failed");
        }
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_expected_statuses() {
        let cases = [
            (
                DomainError::validation("quantity", "must be positive"),
                StatusCode::BAD_REQUEST,
            ),
            (
                DomainError::NotFound {
                    entity: "Product",
                    key: "7".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                DomainError::Duplicate {
                    entity: "Username",
                    value: "alice".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                DomainError::InsufficientStock {
                    product: "Widget".to_string(),
                    requested: 6,
                    available: 2,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                DomainError::storage("connection lost"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            let (status, _) = ApiError::from(error).status_and_detail();
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn auth_failures_use_auth_statuses() {
        let (status, detail) =
            ApiError::Unauthorized("Incorrect username or password".to_string())
                .status_and_detail();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(detail.contains("Incorrect"));

        let (status, _) =
            ApiError::Forbidden("Admin access required".to_string()).status_and_detail();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

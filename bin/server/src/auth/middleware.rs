//! Authentication extractors for Axum.
//!
//! Route handlers declare their minimum role by extractor choice:
//! [`RequireUser`], [`RequireAdmin`], or [`RequireSuperAdmin`]. The
//! token only locates the account; role and active status are always
//! checked against the live user row.

use crate::state::AppState;
use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use serde_json::json;
use storefront_domain::{Role, User};

/// Why an authenticated extraction failed.
#[derive(Debug)]
pub enum AuthRejection {
    /// No usable bearer token.
    NotAuthenticated,
    /// Token invalid or expired.
    InvalidToken,
    /// Account disabled.
    Inactive,
    /// Role below the route's minimum.
    Forbidden(Role),
    /// Store failure while loading the user.
    InternalError,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::NotAuthenticated => (StatusCode::UNAUTHORIZED, "Not authenticated".to_string()),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Invalid or expired token".to_string(),
            ),
            Self::Inactive => (StatusCode::FORBIDDEN, "User account is inactive".to_string()),
            Self::Forbidden(minimum) => (
                StatusCode::FORBIDDEN,
                format!("Requires at least {minimum} role"),
            ),
            Self::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            ),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

async fn authenticate(parts: &mut Parts, state: &AppState) -> Result<User, AuthRejection> {
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthRejection::NotAuthenticated)?;

    let claims = state
        .signer
        .verify(bearer.token())
        .map_err(|_| AuthRejection::InvalidToken)?;

    let user = state
        .users
        .get(claims.user_id)
        .await
        .map_err(|_| AuthRejection::InternalError)?
        .ok_or(AuthRejection::InvalidToken)?;

    if !user.is_active {
        return Err(AuthRejection::Inactive);
    }
    Ok(user)
}

fn require(user: User, minimum: Role) -> Result<User, AuthRejection> {
    if user.role.meets(minimum) {
        Ok(user)
    } else {
        Err(AuthRejection::Forbidden(minimum))
    }
}

/// Any authenticated, active user.
pub struct RequireUser(pub User);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        require(user, Role::User).map(Self)
    }
}

/// An authenticated user with at least the admin role.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        require(user, Role::Admin).map(Self)
    }
}

/// An authenticated user with the super_admin role.
pub struct RequireSuperAdmin(pub User);

impl FromRequestParts<AppState> for RequireSuperAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        require(user, Role::SuperAdmin).map(Self)
    }
}

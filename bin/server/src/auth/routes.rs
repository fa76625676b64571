//! Authentication routes.

use crate::auth::middleware::RequireUser;
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::{Json, Router, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use storefront_domain::User;

/// `/api/auth` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
    user: User,
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .users
        .find_by_username(&request.username)
        .await?
        .filter(|user| {
            state
                .hasher
                .verify(&request.password, &user.password_hash)
                .unwrap_or(false)
        })
        .ok_or_else(|| ApiError::Unauthorized("Incorrect username or password".to_string()))?;

    if !user.is_active {
        return Err(ApiError::Forbidden("User account is inactive".to_string()));
    }

    let access_token = state
        .signer
        .issue(&user)
        .map_err(|e| ApiError::Domain(storefront_domain::DomainError::storage(e.to_string())))?;

    tracing::info!(username = %user.username, "user logged in");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        user,
    }))
}

async fn me(RequireUser(user): RequireUser) -> Json<User> {
    Json(user)
}

//! User administration routes.

use crate::auth::middleware::{RequireAdmin, RequireSuperAdmin};
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use serde::Deserialize;
use storefront_domain::{DomainError, NewUser, Role, User};

/// `/api/users` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{username}", axum::routing::delete(delete))
}

async fn list(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.users.list().await?))
}

#[derive(Debug, Deserialize)]
struct CreateUserRequest {
    username: String,
    password: String,
    full_name: String,
    email: String,
    role: Role,
}

async fn create(
    State(state): State<AppState>,
    RequireSuperAdmin(_): RequireSuperAdmin,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let password_hash = state.hasher.hash(&request.password)?;
    let user = state
        .users
        .insert(NewUser {
            username: request.username,
            password_hash,
            full_name: request.full_name,
            email: request.email,
            role: request.role,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn delete(
    State(state): State<AppState>,
    RequireSuperAdmin(actor): RequireSuperAdmin,
    Path(username): Path<String>,
) -> Result<StatusCode, ApiError> {
    let target = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or(DomainError::NotFound {
            entity: "User",
            key: username,
        })?;
    if target.id == actor.id {
        return Err(DomainError::SelfDeletion.into());
    }
    state.users.delete(target.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

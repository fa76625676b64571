//! Product CRUD routes.

use crate::auth::middleware::{RequireAdmin, RequireUser};
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use storefront_domain::{NewProduct, Product, ProductUpdate};

/// `/api/products` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_one).put(update).delete(delete))
}

async fn list(
    State(state): State<AppState>,
    RequireUser(_): RequireUser,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.products.list().await?))
}

async fn get_one(
    State(state): State<AppState>,
    RequireUser(_): RequireUser,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    state
        .products
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))
}

async fn create(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Json(new): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.products.insert(new).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<i64>,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.products.update(id, update).await?))
}

async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.products.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

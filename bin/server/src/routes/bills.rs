//! Billing routes.
//!
//! Creation by product id goes through the same atomic store path as the
//! assistant's `create_bill` tool.

use crate::auth::middleware::{RequireAdmin, RequireUser};
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use serde::Deserialize;
use storefront_domain::{BillRequestLine, BillWithItems};

/// `/api/bills` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all).post(create))
        .route("/my-bills", get(list_mine))
        .route("/{id}", get(get_one).delete(delete))
}

#[derive(Debug, Deserialize)]
struct CreateBillRequest {
    items: Vec<BillLineRequest>,
}

#[derive(Debug, Deserialize)]
struct BillLineRequest {
    product_id: i64,
    quantity: i32,
}

async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(request): Json<CreateBillRequest>,
) -> Result<(StatusCode, Json<BillWithItems>), ApiError> {
    let lines: Vec<BillRequestLine> = request
        .items
        .iter()
        .map(|item| BillRequestLine {
            product_id: item.product_id,
            quantity: item.quantity,
        })
        .collect();
    let bill = state.bills.create(user.id, &lines).await?;
    Ok((StatusCode::CREATED, Json(bill)))
}

async fn list_all(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<BillWithItems>>, ApiError> {
    Ok(Json(state.bills.list().await?))
}

async fn list_mine(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<BillWithItems>>, ApiError> {
    Ok(Json(state.bills.list_by_creator(user.id).await?))
}

async fn get_one(
    State(state): State<AppState>,
    RequireUser(_): RequireUser,
    Path(id): Path<i64>,
) -> Result<Json<BillWithItems>, ApiError> {
    state
        .bills
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Bill not found".to_string()))
}

async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.bills.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

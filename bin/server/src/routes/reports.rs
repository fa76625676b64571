//! Reporting routes.

use crate::auth::middleware::RequireAdmin;
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::{Json, Router, routing::get};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use storefront_domain::{DomainError, ProfitLossReport, SalesSummary};

/// `/api/reports` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sales/daily", get(daily_sales))
        .route("/profit-loss", get(profit_loss))
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| DomainError::validation(field, "expected YYYY-MM-DD"))
}

#[derive(Debug, Deserialize)]
struct DailySalesQuery {
    date: Option<String>,
}

async fn daily_sales(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Query(query): Query<DailySalesQuery>,
) -> Result<Json<SalesSummary>, ApiError> {
    let date = match query.date.as_deref().filter(|d| !d.is_empty()) {
        Some(raw) => parse_date("date", raw)?,
        None => Utc::now().date_naive(),
    };
    Ok(Json(state.bills.daily_sales(date).await?))
}

#[derive(Debug, Deserialize)]
struct ProfitLossQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn profit_loss(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Query(query): Query<ProfitLossQuery>,
) -> Result<Json<ProfitLossReport>, ApiError> {
    let start = match query.start_date.as_deref().filter(|d| !d.is_empty()) {
        Some(raw) => parse_date("start_date", raw)?,
        None => Utc::now().date_naive(),
    };
    let end = match query.end_date.as_deref().filter(|d| !d.is_empty()) {
        Some(raw) => parse_date("end_date", raw)?,
        None => Utc::now().date_naive(),
    };
    Ok(Json(state.bills.profit_loss(start, end).await?))
}

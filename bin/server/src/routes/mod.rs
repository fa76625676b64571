//! HTTP route assembly.

pub mod assistant;
pub mod bills;
pub mod products;
pub mod reports;
pub mod users;

use crate::auth;
use crate::state::AppState;
use axum::{Router, routing::get};

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api/auth", auth::routes::router())
        .nest("/api/products", products::router())
        .nest("/api/bills", bills::router())
        .nest("/api/users", users::router())
        .nest("/api/reports", reports::router())
        .nest("/api/assistant", assistant::router())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

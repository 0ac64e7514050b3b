pub mod orders;
pub mod payments;
pub mod shipping;

use axum::{extract::State, response::Json, routing::post};
use serde_json::{json, Value};

use crate::AppState;

/// Routes for the inbound event surface.
pub fn api_routes() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/orders", post(orders::submit_order))
        .route("/shipping/options", post(shipping::shipping_options))
        .route("/payments/pre-checkout", post(payments::pre_checkout))
        .route("/payments/success", post(payments::payment_success))
}

/// Liveness probe carrying the active-order count.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "active_orders": state.store.count(),
    }))
}

use axum::{extract::State, response::Json};
use serde::Deserialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    models::{ShippingAddress, ShippingOption},
    ApiResponse, AppState,
};

/// Shipping-options event from the payment provider.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingOptionsEvent {
    pub order_key: String,
    pub address: ShippingAddress,
}

/// Resolve and price the fulfillment options for a stored order
#[utoipa::path(
    post,
    path = "/api/v1/shipping/options",
    request_body = ShippingOptionsEvent,
    responses(
        (status = 200, description = "Priced fulfillment options", body = [ShippingOption]),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Pricing failed", body = crate::errors::ErrorResponse),
    ),
    tag = "Shipping"
)]
pub async fn shipping_options(
    State(state): State<AppState>,
    Json(event): Json<ShippingOptionsEvent>,
) -> Result<Json<ApiResponse<Vec<ShippingOption>>>, ServiceError> {
    let order = state
        .store
        .get(&event.order_key)
        .ok_or_else(|| ServiceError::NotFound("order not found".into()))?;

    let zone = state.services.zones.classify(&event.address).await;
    debug!(order_key = %order.key, %zone, "delivery zone resolved");

    let options = state
        .services
        .pricing
        .shipping_options(&order.request.products, zone)
        .await?;

    Ok(Json(ApiResponse::success(options)))
}

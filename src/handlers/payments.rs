use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{errors::ServiceError, models::is_known_option, ApiResponse, AppState};

/// Contact and address block confirmed by the payer.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub apartment: String,
    #[serde(default)]
    pub entrance: String,
    #[serde(default)]
    pub floor: String,
    #[serde(default)]
    pub entry_code: String,
}

/// Pre-checkout event: the payer confirmed their payment intent for a
/// previously offered shipping option.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreCheckoutEvent {
    pub order_key: String,
    pub shipping_option_id: String,
    #[serde(default)]
    pub order_info: Option<ContactInfo>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreCheckoutAck {
    pub order_key: String,
    pub external_order_id: String,
}

/// Final payment-success event from the provider.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSuccessEvent {
    pub order_key: String,
    pub provider_charge_id: String,
    #[serde(default)]
    pub total_amount: i64,
}

/// Finalize checkout for a confirmed payment intent
#[utoipa::path(
    post,
    path = "/api/v1/payments/pre-checkout",
    request_body = PreCheckoutEvent,
    responses(
        (status = 200, description = "Checkout committed", body = PreCheckoutAck),
        (status = 400, description = "Unknown option or incomplete order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Checkout or integrity failure", body = crate::errors::ErrorResponse),
    ),
    tag = "Payments"
)]
pub async fn pre_checkout(
    State(state): State<AppState>,
    Json(event): Json<PreCheckoutEvent>,
) -> Result<Json<ApiResponse<PreCheckoutAck>>, ServiceError> {
    if !is_known_option(&event.shipping_option_id) {
        return Err(ServiceError::ValidationError(format!(
            "unknown shipping option: {}",
            event.shipping_option_id
        )));
    }

    let mut order = state
        .store
        .get(&event.order_key)
        .ok_or_else(|| ServiceError::NotFound("order not found".into()))?;

    order.shipping_option_id = event.shipping_option_id;
    if let Some(info) = event.order_info {
        merge_contact_info(&mut order.request, info);
    }

    state.services.checkout.checkout(&mut order).await?;

    Ok(Json(ApiResponse::success(PreCheckoutAck {
        order_key: order.key,
        external_order_id: order.external_order_id,
    })))
}

/// Confirm settlement for a successfully paid order
#[utoipa::path(
    post,
    path = "/api/v1/payments/success",
    request_body = PaymentSuccessEvent,
    responses(
        (status = 200, description = "Settlement confirmed, order evicted"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Settlement dispatch failed", body = crate::errors::ErrorResponse),
    ),
    tag = "Payments"
)]
pub async fn payment_success(
    State(state): State<AppState>,
    Json(event): Json<PaymentSuccessEvent>,
) -> Result<Json<ApiResponse<String>>, ServiceError> {
    let order = state
        .store
        .get(&event.order_key)
        .ok_or_else(|| ServiceError::NotFound("order not found".into()))?;

    state
        .services
        .payments
        .confirm(&order, &event.provider_charge_id, event.total_amount)
        .await?;

    info!(order_key = %event.order_key, "payment success processed");
    Ok(Json(ApiResponse::success("settled".to_string())))
}

/// Confirmed info from the provider replaces what the mini-app declared;
/// empty fields keep the previous value.
fn merge_contact_info(request: &mut crate::models::OrderRequest, info: ContactInfo) {
    if !info.name.is_empty() {
        request.name = info.name;
    }
    if !info.phone.is_empty() {
        request.phone = info.phone;
    }
    if !info.address.is_empty() {
        request.address = info.address;
    }
    if !info.city.is_empty() {
        request.city = info.city;
    }
    if !info.apartment.is_empty() {
        request.apartment = info.apartment;
    }
    if !info.entrance.is_empty() {
        request.entrance = info.entrance;
    }
    if !info.floor.is_empty() {
        request.floor = info.floor;
    }
    if !info.entry_code.is_empty() {
        request.entry_code = info.entry_code;
    }
}

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::{errors::ServiceError, models::OrderRequest, ApiResponse, AppState};

/// Invoice reference handed back to the chat provider after a successful
/// submission. The payload is the order key; the provider echoes it back in
/// every later event.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRef {
    pub payload: String,
    pub currency: String,
    pub items: Vec<InvoiceLine>,
    /// Sum of the line amounts in minor currency units
    pub total: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvoiceLine {
    pub label: String,
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmitResponse {
    pub order_key: String,
    pub invoice: InvoiceRef,
}

/// Accept an order submitted from the mini-app
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = OrderRequest,
    responses(
        (status = 201, description = "Order stored, invoice reference issued", body = OrderSubmitResponse),
        (status = 400, description = "Malformed or incomplete order", body = crate::errors::ErrorResponse),
        (status = 403, description = "Authentication failed", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn submit_order(
    State(state): State<AppState>,
    Json(request): Json<OrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderSubmitResponse>>), ServiceError> {
    // Authentication comes before anything else; a bad digest must not
    // leave any trace in the store.
    if !state
        .services
        .authenticator
        .verify(&request.auth_payload, &request.auth_digest)
    {
        return Err(ServiceError::Forbidden(
            "order submission failed authentication".into(),
        ));
    }

    request.validate()?;
    for (index, product) in request.products.iter().enumerate() {
        if product.id.is_empty() || product.title.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "products[{index}] is missing an id or title"
            )));
        }
        if product.quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "products[{index}] has a non-positive quantity"
            )));
        }
        if product.price < 0 {
            return Err(ServiceError::ValidationError(format!(
                "products[{index}] has a negative price"
            )));
        }
    }

    let items: Vec<InvoiceLine> = request
        .products
        .iter()
        .map(|product| InvoiceLine {
            label: format!("{} x{}", product.title, product.quantity),
            amount: product.price * i64::from(product.quantity),
        })
        .collect();
    let total = items.iter().map(|line| line.amount).sum();

    let order_key = state.store.put(request);
    info!(order_key = %order_key, total, "order accepted");

    let response = OrderSubmitResponse {
        order_key: order_key.clone(),
        invoice: InvoiceRef {
            payload: order_key,
            currency: state.config.currency.clone(),
            items,
            total,
        },
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

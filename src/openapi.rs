//! OpenAPI document assembly. The JSON document is served directly; no
//! bundled UI.

use axum::response::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "order-gateway",
        description = "Chat storefront ordering backend: order lifecycle, delivery-zone pricing, checkout and settlement"
    ),
    paths(
        crate::handlers::orders::submit_order,
        crate::handlers::shipping::shipping_options,
        crate::handlers::payments::pre_checkout,
        crate::handlers::payments::payment_success,
        crate::handlers::health,
    ),
    components(schemas(
        crate::models::Product,
        crate::models::OrderRequest,
        crate::models::Zone,
        crate::models::PriceQuote,
        crate::models::ShippingOption,
        crate::models::ShippingAddress,
        crate::handlers::orders::InvoiceLine,
        crate::handlers::orders::InvoiceRef,
        crate::handlers::orders::OrderSubmitResponse,
        crate::handlers::shipping::ShippingOptionsEvent,
        crate::handlers::payments::ContactInfo,
        crate::handlers::payments::PreCheckoutEvent,
        crate::handlers::payments::PreCheckoutAck,
        crate::handlers::payments::PaymentSuccessEvent,
        crate::errors::ErrorResponse,
    )),
    tags(
        (name = "Orders", description = "Order submission from the mini-app"),
        (name = "Shipping", description = "Fulfillment option pricing"),
        (name = "Payments", description = "Checkout and settlement events"),
        (name = "Health", description = "Service diagnostics"),
    )
)]
pub struct ApiDoc;

/// Serves the generated OpenAPI document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

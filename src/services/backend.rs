//! Client for the external order-management backend. All calls carry the
//! API key header and the configured timeout; a timeout is reported exactly
//! like any other transport failure.

use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::errors::ServiceError;
use crate::models::{PriceQuote, Product};

const AUTH_HEADER: &str = "x-api-key";

/// Shipping-type tags the backend understands.
pub const SHIPPING_TYPE_DELIVERY: &str = "delivery";
pub const SHIPPING_TYPE_PICKUP: &str = "pickup";

/// Language tag for backend-facing payloads.
pub const BACKEND_LANGUAGE: &str = "ua";

pub struct OrderBackendClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OrderBackendClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("build backend client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    async fn post_json<T, R>(&self, path: &str, body: &T) -> Result<R, ServiceError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .header(AUTH_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("call {path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "call {path} bad status: {status}"
            )));
        }

        response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("decode {path} response: {e}"))
        })
    }

    async fn post_form(&self, path: &str, body: String) -> Result<(), ServiceError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .header(AUTH_HEADER, &self.api_key)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("call {path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "call {path} bad status: {status}"
            )));
        }
        Ok(())
    }

    /// Prices one fulfillment option.
    pub async fn price(&self, request: &PriceRequest) -> Result<PriceQuote, ServiceError> {
        debug!(
            shipping_type = %request.delivery_details.shipping_type,
            promotion = %request.selected_promotion,
            "pricing leg"
        );
        self.post_json("/price", request).await
    }

    /// Registers the order for payment and returns the signed checkout
    /// descriptor.
    pub async fn checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutResponse, ServiceError> {
        self.post_json("/payments/checkout", request).await
    }

    /// Delivers the signed settlement confirmation.
    pub async fn confirm_payment(&self, form: String) -> Result<(), ServiceError> {
        self.post_form("/payments/callback", form).await
    }
}

/// One product line as the backend expects it.
#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub id: String,
    pub category_id: String,
    pub title: String,
    pub qty: i32,
}

pub fn order_lines(products: &[Product]) -> Vec<OrderLine> {
    products
        .iter()
        .map(|product| OrderLine {
            id: product.id.clone(),
            category_id: product.category_id.clone(),
            title: product.title.clone(),
            qty: product.quantity,
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRequest {
    pub order: Vec<OrderLine>,
    pub delivery_details: PriceDeliveryDetails,
    pub selected_promotion: String,
}

#[derive(Debug, Serialize)]
pub struct PriceDeliveryDetails {
    #[serde(rename = "type")]
    pub shipping_type: String,
    #[serde(rename = "serviceArea", skip_serializing_if = "String::is_empty")]
    pub service_area: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub description: String,
    pub currency: String,
    pub language: String,
    pub contact_details: ContactDetails,
    pub delivery_details: CheckoutDeliveryDetails,
    pub payment_details: PaymentDetails,
    pub info: CheckoutInfo,
    pub order_details: Vec<OrderLine>,
    pub selected_promotion: String,
}

#[derive(Debug, Serialize)]
pub struct ContactDetails {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDeliveryDetails {
    #[serde(rename = "type")]
    pub shipping_type: String,
    pub comments: String,
    pub address: String,
    pub entrance: String,
    pub apt: String,
    pub floor: String,
    pub e_code: String,
    pub service_area: String,
    pub pickup_location: String,
    pub dont_call: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub payment_method: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutInfo {
    pub no_napkins: bool,
    pub persons: i32,
    pub training_persons: i32,
}

/// Raw checkout answer: an opaque base64 payload plus its signature.
#[derive(Debug, Deserialize)]
pub struct CheckoutResponse {
    pub data: String,
    pub signature: String,
    #[serde(rename = "orderId", default)]
    pub order_id: String,
}

/// Decoded checkout descriptor carried inside the base64 payload.
#[derive(Debug, Deserialize)]
pub struct CheckoutDescriptor {
    pub order_id: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub result_url: String,
}

/// Settlement confirmation reported to the backend after a successful
/// payment.
#[derive(Debug, Serialize)]
pub struct SettlementNotice {
    pub source: String,
    pub status: String,
    pub provider_charge_id: String,
    /// The order key this service issued
    pub transaction_id: String,
    pub amount: i64,
    /// The backend-assigned order id established at checkout
    pub order_id: String,
}

//! Core domain types: products, order requests, stored orders, zones and
//! shipping options. Wire format for the mini-app contract is camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use validator::Validate;

/// Delivery service areas resolved by geofencing.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Zone {
    Green,
    Yellow,
    Red,
    #[default]
    Unknown,
}

impl Zone {
    /// Zones the courier actually serves. Unknown means the address could
    /// not be resolved and no delivery option is offered.
    pub fn is_deliverable(self) -> bool {
        !matches!(self, Zone::Unknown)
    }
}

/// Self-pickup shipping option id.
pub const SELF_PICKUP: &str = "self_pickup";
/// Suffix marking a shipping option that applies the 4+1 promotion.
pub const PROMO_SUFFIX: &str = "_4_plus_1";
/// Promotion tag for the 4+1 roll promotion, as the pricing backend knows it.
pub const PROMO_4_PLUS_1: &str = "4+1";
/// Promotion tag for the standing self-pickup discount.
pub const PROMO_SELF_PICKUP: &str = "self_pickup";

fn option_base(option_id: &str) -> &str {
    option_id.strip_suffix(PROMO_SUFFIX).unwrap_or(option_id)
}

/// Parses the service area back out of a shipping option id, e.g.
/// "green_4_plus_1" resolves to [`Zone::Green`]. Self-pickup options have no
/// zone.
pub fn option_zone(option_id: &str) -> Option<Zone> {
    option_base(option_id)
        .parse::<Zone>()
        .ok()
        .filter(|zone| zone.is_deliverable())
}

/// Whether a shipping option id carries the 4+1 promotion.
pub fn option_has_promo(option_id: &str) -> bool {
    option_id.ends_with(PROMO_SUFFIX)
}

/// Whether the option id is one this service could have offered.
pub fn is_known_option(option_id: &str) -> bool {
    option_base(option_id) == SELF_PICKUP || option_zone(option_id).is_some()
}

/// A single cart item. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    /// Unit price in minor currency units
    pub price: i64,
    #[serde(rename = "amount")]
    pub quantity: i32,
    #[serde(rename = "categoryID")]
    pub category_id: String,
}

/// Order info sent by the mini-app. Validated by the authenticator before
/// any trust is extended.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    /// Raw signed payload produced by the mini-app
    pub auth_payload: String,
    /// Hex digest the client computed over the payload
    pub auth_digest: String,

    #[validate(length(min = 1, message = "order must contain at least one product"))]
    pub products: Vec<Product>,

    #[serde(default)]
    pub do_not_call: bool,
    #[serde(default)]
    pub no_napkins: bool,
    #[serde(default)]
    pub cutlery_count: i32,
    #[serde(default)]
    pub training_cutlery_count: i32,
    #[serde(default)]
    pub comment: String,

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

    /// Declared fulfillment preference ("delivery", "self_pickup_1", ...)
    #[serde(default)]
    pub delivery_type: String,
    /// Promotion the customer selected in the mini-app
    #[serde(default)]
    pub promotion: String,
}

/// The central aggregate, owned exclusively by the order store.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub key: String,
    pub request: OrderRequest,
    #[serde(default)]
    pub service_area: Zone,
    #[serde(default)]
    pub shipping_option_id: String,
    /// Backend-assigned id; set exactly once by checkout
    #[serde(default)]
    pub external_order_id: String,
    #[serde(default)]
    pub result_url: String,
    /// Total amount as reported by the checkout descriptor
    #[serde(default)]
    pub total_amount: f64,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(key: String, request: OrderRequest) -> Self {
        Self {
            key,
            request,
            service_area: Zone::Unknown,
            shipping_option_id: String::new(),
            external_order_id: String::new(),
            result_url: String::new(),
            total_amount: 0.0,
            created_at: Utc::now(),
        }
    }
}

/// Price of one fulfillment option, as returned by the pricing backend.
/// Ephemeral; produced per pricing leg and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PriceQuote {
    /// Delivery fee in minor currency units
    pub delivery: i64,
    /// Discount in minor currency units
    pub discount: i64,
    /// Service-area label resolved by the backend
    #[serde(default)]
    pub service_area: String,
}

impl PriceQuote {
    /// Net fee. Negative values represent a credit and pass through
    /// unmodified.
    pub fn fee(&self) -> i64 {
        self.delivery - self.discount
    }
}

/// A priced fulfillment choice presented to the payer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShippingOption {
    pub id: String,
    pub label: String,
    pub fee: i64,
}

/// Destination address as delivered by the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub street_line1: String,
    #[serde(default)]
    pub street_line2: String,
}

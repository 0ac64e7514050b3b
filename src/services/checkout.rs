//! Checkout and settlement against the external order-management backend.
//!
//! Checkout is the sole place an order's external identity is established,
//! and it is established exactly once. Settlement deletes the order from the
//! store, completing its lifecycle.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::errors::ServiceError;
use crate::models::{option_has_promo, option_zone, Order, Zone, PROMO_4_PLUS_1};
use crate::signing;
use crate::store::OrderStore;
use crate::services::backend::{
    order_lines, CheckoutDeliveryDetails, CheckoutDescriptor, CheckoutInfo, CheckoutRequest,
    ContactDetails, OrderBackendClient, PaymentDetails, SettlementNotice, BACKEND_LANGUAGE,
    SHIPPING_TYPE_DELIVERY, SHIPPING_TYPE_PICKUP,
};

/// Placeholder the backend leaves in sandbox result URLs.
const RESULT_URL_PLACEHOLDER: &str = "APP_PAYMENT_RESULT_URL";

/// Payment source tag reported on settlement.
const PAYMENT_SOURCE: &str = "chat";
const SETTLEMENT_STATUS_SUCCESS: &str = "success";

/// Finalizes a payment-intent-confirmed order with the external backend.
pub struct CheckoutCoordinator {
    backend: Arc<OrderBackendClient>,
    store: Arc<OrderStore>,
    signing_key: String,
    currency: String,
    test_mode: bool,
    test_result_url: Option<String>,
}

impl CheckoutCoordinator {
    pub fn new(
        backend: Arc<OrderBackendClient>,
        store: Arc<OrderStore>,
        signing_key: impl Into<String>,
        currency: impl Into<String>,
        test_mode: bool,
        test_result_url: Option<String>,
    ) -> Self {
        Self {
            backend,
            store,
            signing_key: signing_key.into(),
            currency: currency.into(),
            test_mode,
            test_result_url,
        }
    }

    /// Registers the order with the backend, verifies the response signature
    /// and commits the backend-assigned identifiers into the order.
    ///
    /// Missing shipping option or contact data is a validation error, not a
    /// checkout error. A second checkout attempt on an order that already
    /// carries an external id is rejected: the id is set exactly once.
    #[instrument(skip(self, order), fields(order_key = %order.key))]
    pub async fn checkout(&self, order: &mut Order) -> Result<(), ServiceError> {
        if !order.external_order_id.is_empty() {
            return Err(ServiceError::InvalidOperation(
                "order is already checked out".into(),
            ));
        }
        if order.shipping_option_id.is_empty() {
            return Err(ServiceError::ValidationError(
                "no shipping option selected".into(),
            ));
        }

        let request = &order.request;
        if request.name.trim().is_empty() || request.phone.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "contact name and phone are required".into(),
            ));
        }

        // The finally-chosen service area is parsed back out of the option id.
        let zone = option_zone(&order.shipping_option_id);
        if zone.is_some()
            && (request.address.trim().is_empty() || request.city.trim().is_empty())
        {
            return Err(ServiceError::ValidationError(
                "delivery address and city are required".into(),
            ));
        }
        order.service_area = zone.unwrap_or(Zone::Unknown);

        let checkout_request = self.build_request(order, zone);
        let response = self.backend.checkout(&checkout_request).await?;

        if !self.test_mode
            && !signing::matches(&response.data, &self.signing_key, &response.signature)
        {
            return Err(ServiceError::IntegrityError(
                "checkout signature does not match".into(),
            ));
        }

        let raw = BASE64.decode(&response.data).map_err(|e| {
            ServiceError::ExternalServiceError(format!("decode checkout data: {e}"))
        })?;
        let descriptor: CheckoutDescriptor = serde_json::from_slice(&raw).map_err(|e| {
            ServiceError::ExternalServiceError(format!("parse checkout data: {e}"))
        })?;
        debug!(
            external_order_id = %descriptor.order_id,
            amount = descriptor.amount,
            "checkout descriptor accepted"
        );

        order.external_order_id = descriptor.order_id;
        order.result_url = self.resolve_result_url(descriptor.result_url);
        order.total_amount = descriptor.amount;
        self.store.update(order.clone());

        info!(order_key = %order.key, external_order_id = %order.external_order_id, "order checked out");
        Ok(())
    }

    fn resolve_result_url(&self, result_url: String) -> String {
        if self.test_mode {
            if let Some(url) = &self.test_result_url {
                return result_url.replacen(RESULT_URL_PLACEHOLDER, url, 1);
            }
        }
        result_url
    }

    fn build_request(&self, order: &Order, zone: Option<Zone>) -> CheckoutRequest {
        let request = &order.request;
        let delivery = zone.is_some();

        CheckoutRequest {
            description: format!(
                "Chat order {}, #{}",
                Utc::now().format("%Y-%m-%d %H:%M"),
                order.key
            ),
            currency: self.currency.clone(),
            language: BACKEND_LANGUAGE.to_string(),
            contact_details: ContactDetails {
                name: request.name.clone(),
                phone: request.phone.clone(),
            },
            delivery_details: CheckoutDeliveryDetails {
                shipping_type: if delivery {
                    SHIPPING_TYPE_DELIVERY
                } else {
                    SHIPPING_TYPE_PICKUP
                }
                .to_string(),
                comments: request.comment.clone(),
                address: if delivery {
                    format!("{}, {}", request.address, request.city)
                } else {
                    String::new()
                },
                entrance: request.entrance.clone(),
                apt: request.apartment.clone(),
                floor: request.floor.clone(),
                e_code: request.entry_code.clone(),
                service_area: zone.map(|z| z.to_string()).unwrap_or_default(),
                pickup_location: pickup_location(&request.delivery_type),
                dont_call: request.do_not_call,
            },
            payment_details: PaymentDetails {
                payment_method: "online".to_string(),
            },
            info: CheckoutInfo {
                no_napkins: request.no_napkins,
                persons: request.cutlery_count,
                training_persons: request.training_cutlery_count,
            },
            order_details: order_lines(&request.products),
            // A 4+1 shipping option overrides whatever the mini-app declared.
            selected_promotion: if option_has_promo(&order.shipping_option_id) {
                PROMO_4_PLUS_1.to_string()
            } else {
                request.promotion.clone()
            },
        }
    }
}

/// Maps the declared delivery type to the backend's pickup location tag.
fn pickup_location(delivery_type: &str) -> String {
    match delivery_type {
        "self_pickup_1" => "1".to_string(),
        "self_pickup_2" => "2".to_string(),
        _ => String::new(),
    }
}

/// Confirms settlement with the backend and evicts the order.
pub struct PaymentConfirmer {
    backend: Arc<OrderBackendClient>,
    store: Arc<OrderStore>,
    signing_key: String,
}

impl PaymentConfirmer {
    pub fn new(
        backend: Arc<OrderBackendClient>,
        store: Arc<OrderStore>,
        signing_key: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            store,
            signing_key: signing_key.into(),
        }
    }

    /// Signs and dispatches the settlement confirmation, then deletes the
    /// order from the store. On failure the order stays intact so a
    /// duplicate provider event can retry; there is no automatic retry.
    #[instrument(skip(self, order), fields(order_key = %order.key))]
    pub async fn confirm(
        &self,
        order: &Order,
        provider_charge_id: &str,
        amount: i64,
    ) -> Result<(), ServiceError> {
        let notice = SettlementNotice {
            source: PAYMENT_SOURCE.to_string(),
            status: SETTLEMENT_STATUS_SUCCESS.to_string(),
            provider_charge_id: provider_charge_id.to_string(),
            transaction_id: order.key.clone(),
            amount,
            order_id: order.external_order_id.clone(),
        };

        let json = serde_json::to_vec(&notice)
            .map_err(|e| ServiceError::InternalError(format!("encode settlement notice: {e}")))?;
        let data = BASE64.encode(json);
        let signature = signing::sign(&data, &self.signing_key);

        self.backend
            .confirm_payment(format!("signature={signature}&data={data}"))
            .await?;

        self.store.delete(&order.key);
        info!(order_key = %order.key, "payment settled, order evicted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderRequest, Product};
    use std::time::Duration;

    fn request() -> OrderRequest {
        OrderRequest {
            auth_payload: String::new(),
            auth_digest: String::new(),
            products: vec![Product {
                id: "p1".into(),
                title: "Unagi roll".into(),
                price: 21_000,
                quantity: 2,
                category_id: "rolls".into(),
            }],
            do_not_call: true,
            no_napkins: false,
            cutlery_count: 2,
            training_cutlery_count: 1,
            comment: "second entrance".into(),
            name: "Ada".into(),
            phone: "+380000000000".into(),
            address: "1 Main St".into(),
            city: "Lviv".into(),
            apartment: "12".into(),
            entrance: "2".into(),
            floor: "3".into(),
            entry_code: "42#".into(),
            delivery_type: "delivery".into(),
            promotion: String::new(),
        }
    }

    fn coordinator(store: Arc<OrderStore>) -> CheckoutCoordinator {
        let backend = Arc::new(
            OrderBackendClient::new("http://localhost:0", "key", Duration::from_secs(1)).unwrap(),
        );
        CheckoutCoordinator::new(backend, store, "signing-key", "UAH", false, None)
    }

    #[tokio::test]
    async fn checkout_requires_a_shipping_option() {
        let store = Arc::new(OrderStore::new(Duration::from_secs(3600)));
        let coordinator = coordinator(store.clone());
        let mut order = Order::new("10000001".into(), request());

        let err = coordinator.checkout(&mut order).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn checkout_requires_contact_details() {
        let store = Arc::new(OrderStore::new(Duration::from_secs(3600)));
        let coordinator = coordinator(store.clone());
        let mut order = Order::new("10000002".into(), request());
        order.shipping_option_id = "self_pickup".into();
        order.request.phone.clear();

        let err = coordinator.checkout(&mut order).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn delivery_options_require_an_address() {
        let store = Arc::new(OrderStore::new(Duration::from_secs(3600)));
        let coordinator = coordinator(store.clone());
        let mut order = Order::new("10000003".into(), request());
        order.shipping_option_id = "green".into();
        order.request.address.clear();

        let err = coordinator.checkout(&mut order).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn a_checked_out_order_cannot_check_out_again() {
        let store = Arc::new(OrderStore::new(Duration::from_secs(3600)));
        let coordinator = coordinator(store.clone());
        let mut order = Order::new("10000004".into(), request());
        order.shipping_option_id = "green".into();
        order.external_order_id = "EXT-1".into();

        let err = coordinator.checkout(&mut order).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOperation(_)));
        assert_eq!(order.external_order_id, "EXT-1");
    }

    #[test]
    fn checkout_request_carries_the_resolved_service_area() {
        let store = Arc::new(OrderStore::new(Duration::from_secs(3600)));
        let coordinator = coordinator(store);
        let mut order = Order::new("10000005".into(), request());
        order.shipping_option_id = "yellow_4_plus_1".into();

        let built = coordinator.build_request(&order, Some(Zone::Yellow));
        assert_eq!(built.delivery_details.service_area, "yellow");
        assert_eq!(built.delivery_details.shipping_type, SHIPPING_TYPE_DELIVERY);
        assert_eq!(built.delivery_details.address, "1 Main St, Lviv");
        assert!(built.description.contains("#10000005"));
        assert_eq!(built.info.persons, 2);
    }

    #[test]
    fn pickup_checkout_has_no_address_but_a_location_tag() {
        let store = Arc::new(OrderStore::new(Duration::from_secs(3600)));
        let coordinator = coordinator(store);
        let mut order = Order::new("10000006".into(), request());
        order.shipping_option_id = "self_pickup".into();
        order.request.delivery_type = "self_pickup_2".into();

        let built = coordinator.build_request(&order, None);
        assert_eq!(built.delivery_details.shipping_type, SHIPPING_TYPE_PICKUP);
        assert!(built.delivery_details.address.is_empty());
        assert!(built.delivery_details.service_area.is_empty());
        assert_eq!(built.delivery_details.pickup_location, "2");
    }

    #[test]
    fn a_promo_shipping_option_selects_the_promotion_tag() {
        let store = Arc::new(OrderStore::new(Duration::from_secs(3600)));
        let coordinator = coordinator(store);
        let mut order = Order::new("10000007".into(), request());
        order.shipping_option_id = "green_4_plus_1".into();

        let built = coordinator.build_request(&order, Some(Zone::Green));
        assert_eq!(built.selected_promotion, PROMO_4_PLUS_1);

        order.shipping_option_id = "green".into();
        order.request.promotion = "loyalty".into();
        let built = coordinator.build_request(&order, Some(Zone::Green));
        assert_eq!(built.selected_promotion, "loyalty");
    }

    #[test]
    fn sandbox_result_urls_are_rewritten_only_in_test_mode() {
        let store = Arc::new(OrderStore::new(Duration::from_secs(3600)));
        let backend = Arc::new(
            OrderBackendClient::new("http://localhost:0", "key", Duration::from_secs(1)).unwrap(),
        );
        let sandbox = CheckoutCoordinator::new(
            backend.clone(),
            store.clone(),
            "signing-key",
            "UAH",
            true,
            Some("https://shop.example/success".into()),
        );
        assert_eq!(
            sandbox.resolve_result_url(format!("{RESULT_URL_PLACEHOLDER}/pay/1")),
            "https://shop.example/success/pay/1"
        );

        let live = CheckoutCoordinator::new(store_backend(), store, "signing-key", "UAH", false, None);
        assert_eq!(
            live.resolve_result_url(format!("{RESULT_URL_PLACEHOLDER}/pay/1")),
            format!("{RESULT_URL_PLACEHOLDER}/pay/1")
        );
    }

    fn store_backend() -> Arc<OrderBackendClient> {
        Arc::new(
            OrderBackendClient::new("http://localhost:0", "key", Duration::from_secs(1)).unwrap(),
        )
    }
}

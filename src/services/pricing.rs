//! Concurrent pricing of fulfillment options.
//!
//! Every candidate option is priced by one independent backend call; the
//! orchestration waits for every leg to finish and fails as a whole when any
//! leg failed. No partial set of quotes ever reaches the caller.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{instrument, warn};

use crate::errors::ServiceError;
use crate::models::{
    PriceQuote, Product, ShippingOption, Zone, PROMO_4_PLUS_1, PROMO_SELF_PICKUP, PROMO_SUFFIX,
    SELF_PICKUP,
};
use crate::services::backend::{
    order_lines, OrderBackendClient, PriceDeliveryDetails, PriceRequest, SHIPPING_TYPE_DELIVERY,
    SHIPPING_TYPE_PICKUP,
};

/// Roll-category quantity beyond which the 4+1 promotion unlocks.
pub const PROMO_ROLL_THRESHOLD: i32 = 4;

/// One fulfillment option to be priced.
#[derive(Debug, Clone)]
pub struct CandidateOption {
    pub id: String,
    pub label: String,
    shipping_type: &'static str,
    zone: Option<Zone>,
    promotion: String,
}

pub struct PriceOrchestrator {
    backend: Arc<OrderBackendClient>,
    roll_category_id: String,
}

impl PriceOrchestrator {
    pub fn new(backend: Arc<OrderBackendClient>, roll_category_id: impl Into<String>) -> Self {
        Self {
            backend,
            roll_category_id: roll_category_id.into(),
        }
    }

    /// True once the accumulated roll-category quantity strictly exceeds the
    /// promotion threshold. Exactly at the threshold the promotion stays
    /// locked.
    pub fn promo_eligible(&self, products: &[Product]) -> bool {
        let rolls: i32 = products
            .iter()
            .filter(|product| product.category_id == self.roll_category_id)
            .map(|product| product.quantity)
            .sum();
        rolls > PROMO_ROLL_THRESHOLD
    }

    /// Candidate fulfillment options for a cart in the given zone, computed
    /// before any pricing call is issued. An unknown zone offers no
    /// delivery; self-pickup is always available.
    pub fn candidate_options(&self, products: &[Product], zone: Zone) -> Vec<CandidateOption> {
        let mut options = Vec::with_capacity(4);

        if zone.is_deliverable() {
            options.push(CandidateOption {
                id: zone.to_string(),
                label: format!("Delivery ({zone} zone)"),
                shipping_type: SHIPPING_TYPE_DELIVERY,
                zone: Some(zone),
                promotion: String::new(),
            });
        }

        options.push(CandidateOption {
            id: SELF_PICKUP.to_string(),
            label: "Self-pickup".to_string(),
            shipping_type: SHIPPING_TYPE_PICKUP,
            zone: None,
            promotion: PROMO_SELF_PICKUP.to_string(),
        });

        if self.promo_eligible(products) {
            options.push(CandidateOption {
                id: format!("{SELF_PICKUP}{PROMO_SUFFIX}"),
                label: "Self-pickup (4+1)".to_string(),
                shipping_type: SHIPPING_TYPE_PICKUP,
                zone: None,
                promotion: PROMO_4_PLUS_1.to_string(),
            });
            if zone.is_deliverable() {
                options.push(CandidateOption {
                    id: format!("{zone}{PROMO_SUFFIX}"),
                    label: format!("Delivery ({zone} zone, 4+1)"),
                    shipping_type: SHIPPING_TYPE_DELIVERY,
                    zone: Some(zone),
                    promotion: PROMO_4_PLUS_1.to_string(),
                });
            }
        }

        options
    }

    /// Prices every candidate concurrently. All legs run to completion even
    /// when a sibling fails; the joined error state is inspected only
    /// afterwards, and a single failed leg fails the whole run.
    #[instrument(skip_all, fields(legs = candidates.len()))]
    pub async fn price_options(
        &self,
        products: &[Product],
        candidates: &[CandidateOption],
    ) -> Result<HashMap<String, PriceQuote>, ServiceError> {
        let total = candidates.len();
        let mut tasks = Vec::with_capacity(total);

        for option in candidates {
            let backend = Arc::clone(&self.backend);
            let request = PriceRequest {
                order: order_lines(products),
                delivery_details: PriceDeliveryDetails {
                    shipping_type: option.shipping_type.to_string(),
                    service_area: option
                        .zone
                        .map(|zone| zone.to_string())
                        .unwrap_or_default(),
                },
                selected_promotion: option.promotion.clone(),
            };
            let id = option.id.clone();
            tasks.push(tokio::spawn(async move {
                let result = backend.price(&request).await;
                (id, result)
            }));
        }

        let mut quotes = HashMap::with_capacity(total);
        let mut failures = Vec::new();
        for outcome in join_all(tasks).await {
            match outcome {
                Ok((id, Ok(quote))) => {
                    quotes.insert(id, quote);
                }
                Ok((id, Err(err))) => {
                    warn!(option = %id, error = %err, "pricing leg failed");
                    failures.push(format!("{id}: {err}"));
                }
                Err(err) => {
                    failures.push(format!("pricing task panicked: {err}"));
                }
            }
        }

        if !failures.is_empty() {
            return Err(ServiceError::ExternalServiceError(format!(
                "pricing failed for {} of {} options: {}",
                failures.len(),
                total,
                failures.join("; ")
            )));
        }

        Ok(quotes)
    }

    /// Full quote pass: candidates, concurrent pricing, and the payer-facing
    /// option list in candidate order.
    pub async fn shipping_options(
        &self,
        products: &[Product],
        zone: Zone,
    ) -> Result<Vec<ShippingOption>, ServiceError> {
        let candidates = self.candidate_options(products, zone);
        let quotes = self.price_options(products, &candidates).await?;

        Ok(candidates
            .iter()
            .filter_map(|candidate| {
                quotes.get(&candidate.id).map(|quote| ShippingOption {
                    id: candidate.id.clone(),
                    label: candidate.label.clone(),
                    fee: quote.fee(),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(category: &str, quantity: i32) -> Product {
        Product {
            id: "p".into(),
            title: "Test roll".into(),
            price: 10_000,
            quantity,
            category_id: category.into(),
        }
    }

    fn orchestrator() -> PriceOrchestrator {
        let backend = Arc::new(
            OrderBackendClient::new(
                "http://localhost:0",
                "key",
                std::time::Duration::from_secs(1),
            )
            .unwrap(),
        );
        PriceOrchestrator::new(backend, "rolls")
    }

    #[test]
    fn promotion_unlocks_strictly_above_the_threshold() {
        let orchestrator = orchestrator();
        assert!(orchestrator.promo_eligible(&[product("rolls", 3), product("rolls", 2)]));
        assert!(!orchestrator.promo_eligible(&[product("rolls", 4)]));
        assert!(!orchestrator.promo_eligible(&[product("rolls", 2), product("drinks", 10)]));
    }

    #[test]
    fn only_roll_category_counts_toward_the_promotion() {
        let orchestrator = orchestrator();
        assert!(!orchestrator.promo_eligible(&[product("drinks", 9)]));
        assert!(orchestrator.promo_eligible(&[product("drinks", 9), product("rolls", 5)]));
    }

    #[test]
    fn unknown_zone_offers_no_delivery_candidates() {
        let orchestrator = orchestrator();
        let options = orchestrator.candidate_options(&[product("rolls", 2)], Zone::Unknown);
        let ids: Vec<&str> = options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec![SELF_PICKUP]);
    }

    #[test]
    fn deliverable_zone_with_promotion_yields_four_candidates() {
        let orchestrator = orchestrator();
        let options = orchestrator.candidate_options(&[product("rolls", 5)], Zone::Green);
        let ids: Vec<&str> = options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "green",
                "self_pickup",
                "self_pickup_4_plus_1",
                "green_4_plus_1"
            ]
        );
    }

    #[test]
    fn deliverable_zone_without_promotion_yields_two_candidates() {
        let orchestrator = orchestrator();
        let options = orchestrator.candidate_options(&[product("rolls", 4)], Zone::Yellow);
        let ids: Vec<&str> = options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["yellow", "self_pickup"]);
    }
}

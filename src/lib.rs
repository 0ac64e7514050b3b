//! Order Gateway Library
//!
//! Core of a chat-storefront ordering backend: an ephemeral TTL-bounded
//! order store, delivery-zone geofencing, concurrent fulfillment pricing,
//! and signed checkout/settlement against the external order-management
//! backend.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod errors;
pub mod geo;
pub mod handlers;
pub mod middleware_helpers;
pub mod models;
pub mod openapi;
pub mod services;
pub mod signing;
pub mod store;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::auth::Authenticator;
use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::services::backend::OrderBackendClient;
use crate::services::checkout::{CheckoutCoordinator, PaymentConfirmer};
use crate::services::geocoding::GeocodingClient;
use crate::services::pricing::PriceOrchestrator;
use crate::services::zoning::{DeliveryZoneClassifier, SERVICE_REGION_BOUNDS};
use crate::store::OrderStore;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<OrderStore>,
    pub services: AppServices,
}

/// Aggregated core services used by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub authenticator: Arc<Authenticator>,
    pub zones: Arc<DeliveryZoneClassifier>,
    pub pricing: Arc<PriceOrchestrator>,
    pub checkout: Arc<CheckoutCoordinator>,
    pub payments: Arc<PaymentConfirmer>,
}

impl AppServices {
    /// Wires every core service from the configuration and the injected
    /// order store.
    pub fn new(config: &AppConfig, store: Arc<OrderStore>) -> Result<Self, ServiceError> {
        let geocoder = Arc::new(GeocodingClient::new(
            &config.geocoding_api_url,
            config.geocoding_api_key.clone(),
            config.geocoding_language.clone(),
            SERVICE_REGION_BOUNDS,
            config.request_timeout(),
        )?);
        let backend = Arc::new(OrderBackendClient::new(
            &config.backend_api_url,
            config.backend_api_key.clone(),
            config.request_timeout(),
        )?);

        Ok(Self {
            authenticator: Arc::new(Authenticator::new(&config.bot_credential)),
            zones: Arc::new(DeliveryZoneClassifier::new(
                geocoder,
                config.supported_country.clone(),
            )),
            pricing: Arc::new(PriceOrchestrator::new(
                Arc::clone(&backend),
                config.roll_category_id.clone(),
            )),
            checkout: Arc::new(CheckoutCoordinator::new(
                Arc::clone(&backend),
                Arc::clone(&store),
                config.payment_signing_key.clone(),
                config.currency.clone(),
                config.test_mode,
                config.test_result_url.clone(),
            )),
            payments: Arc::new(PaymentConfirmer::new(
                backend,
                store,
                config.payment_signing_key.clone(),
            )),
        })
    }
}

// Common response wrappers
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: middleware_helpers::request_id::current_request_id()
                .map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

//! Shared harness: an application router wired to mock external
//! collaborators, plus helpers for authenticated order payloads.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, Response, StatusCode},
    routing::get,
    Router,
};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use order_gateway::{config::AppConfig, handlers, signing, store::OrderStore, AppServices, AppState};

pub const BOT_CREDENTIAL: &str = "test-bot-credential-0123456789";
pub const SIGNING_KEY: &str = "settlement-signing-key";

/// Application instance backed by mock geocoding and backend servers.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub backend: MockServer,
    pub geocoder: MockServer,
}

impl TestApp {
    pub async fn new() -> Self {
        let backend = MockServer::start().await;
        let geocoder = MockServer::start().await;

        let mut cfg = AppConfig::new(
            "127.0.0.1",
            0,
            "test",
            BOT_CREDENTIAL,
            backend.uri(),
            "test-api-key",
            SIGNING_KEY,
        );
        cfg.geocoding_api_url = geocoder.uri();
        cfg.request_timeout_secs = 2;

        let store = Arc::new(OrderStore::new(cfg.order_ttl()));
        let services = AppServices::new(&cfg, Arc::clone(&store)).expect("service wiring");
        let state = AppState {
            config: cfg,
            store,
            services,
        };

        let router = Router::new()
            .route("/health", get(handlers::health))
            .nest("/api/v1", handlers::api_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            backend,
            geocoder,
        }
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response<Body> {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response")
    }

    /// Mounts a geocoder answer placing the destination at the given point.
    pub async fn mock_geocode(&self, lat: f64, lng: f64) {
        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [{
                    "formatted_address": "1 Main St, Lviv",
                    "geometry": {"location": {"lat": lat, "lng": lng}}
                }]
            })))
            .mount(&self.geocoder)
            .await;
    }

    pub async fn mock_geocode_empty(&self) {
        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ZERO_RESULTS",
                "results": []
            })))
            .mount(&self.geocoder)
            .await;
    }

    /// Mounts a pricing answer shared by every leg.
    pub async fn mock_price(&self, delivery: i64, discount: i64) {
        Mock::given(method("POST"))
            .and(path("/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "delivery": delivery,
                "discount": discount,
                "service_area": "green"
            })))
            .mount(&self.backend)
            .await;
    }

    /// Mounts a checkout answer whose payload is properly signed.
    pub async fn mock_checkout(&self, external_order_id: &str, amount: f64) {
        let data = checkout_data(external_order_id, amount);
        let signature = signing::sign(&data, SIGNING_KEY);
        Mock::given(method("POST"))
            .and(path("/payments/checkout"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": data,
                "signature": signature,
                "orderId": external_order_id
            })))
            .mount(&self.backend)
            .await;
    }

    pub async fn mock_settlement(&self) {
        Mock::given(method("POST"))
            .and(path("/payments/callback"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.backend)
            .await;
    }
}

pub fn checkout_data(external_order_id: &str, amount: f64) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine};
    STANDARD.encode(
        json!({
            "order_id": external_order_id,
            "amount": amount,
            "result_url": "https://pay.example/result/1"
        })
        .to_string(),
    )
}

/// Computes the digest the mini-app would attach to `payload`.
pub fn auth_digest(payload: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(b"WebAppData").expect("hmac key");
    mac.update(BOT_CREDENTIAL.as_bytes());
    let derived = mac.finalize().into_bytes();

    let mut mac = Hmac::<Sha256>::new_from_slice(&derived).expect("hmac key");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// A five-roll cart: eligible for the 4+1 promotion.
pub fn order_request_body() -> Value {
    let payload = "user=42&query_id=abc";
    json!({
        "authPayload": payload,
        "authDigest": auth_digest(payload),
        "products": [
            {"id": "p1", "title": "Philadelphia roll", "price": 24_500, "amount": 3, "categoryID": "rolls"},
            {"id": "p2", "title": "California roll", "price": 19_900, "amount": 2, "categoryID": "rolls"},
        ],
        "cutleryCount": 2,
        "name": "Ada",
        "phone": "+380991234567",
        "address": "1 Main St",
        "city": "Lviv",
        "deliveryType": "delivery",
    })
}

pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn submit_order(app: &TestApp) -> String {
    let response = app.post("/api/v1/orders", order_request_body()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    body["data"]["orderKey"]
        .as_str()
        .expect("order key present")
        .to_string()
}

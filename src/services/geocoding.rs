//! Geocoding collaborator: resolves structured address components to
//! candidate coordinates.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::errors::ServiceError;
use crate::geo::{LatLng, LatLngBounds};
use crate::models::ShippingAddress;

/// One geocoding candidate.
#[derive(Debug, Clone)]
pub struct GeocodedAddress {
    pub location: LatLng,
    pub formatted_address: String,
}

/// Seam for the external geocoding collaborator. An empty result set means
/// the address could not be found; transport problems are errors.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(
        &self,
        country: &str,
        address: &ShippingAddress,
    ) -> Result<Vec<GeocodedAddress>, ServiceError>;
}

/// HTTP geocoding client speaking the Google-style geocode API.
pub struct GeocodingClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
    bounds: LatLngBounds,
}

impl GeocodingClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        language: impl Into<String>,
        bounds: LatLngBounds,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("build geocoding client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            language: language.into(),
            bounds,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[async_trait]
impl Geocoder for GeocodingClient {
    async fn geocode(
        &self,
        country: &str,
        address: &ShippingAddress,
    ) -> Result<Vec<GeocodedAddress>, ServiceError> {
        let route = format!(
            "{} {}",
            address.street_line1.trim(),
            address.street_line2.trim()
        );
        let components = format!(
            "country:{}|locality:{}|administrative_area:{}|route:{}",
            country,
            address.city,
            address.state,
            route.trim()
        );
        let bounds = format!(
            "{},{}|{},{}",
            self.bounds.south_west.lat,
            self.bounds.south_west.lng,
            self.bounds.north_east.lat,
            self.bounds.north_east.lng
        );
        let url = format!("{}/maps/api/geocode/json", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("components", components.as_str()),
                ("bounds", bounds.as_str()),
                ("region", country),
                ("language", self.language.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("geocoding request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "geocoding bad status: {status}"
            )));
        }

        let body: GeocodeResponse = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("decode geocoding response: {e}"))
        })?;

        if body.status != "OK" && body.status != "ZERO_RESULTS" {
            return Err(ServiceError::ExternalServiceError(format!(
                "geocoding status: {}",
                body.status
            )));
        }

        debug!(candidates = body.results.len(), "geocoding response");
        Ok(body
            .results
            .into_iter()
            .map(|result| GeocodedAddress {
                location: result.geometry.location,
                formatted_address: result.formatted_address,
            })
            .collect())
    }
}

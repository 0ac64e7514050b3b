//! Delivery-zone classification: geocode the destination, then test the
//! point against the static service-area polygons.

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::{debug, instrument, warn};

use crate::geo::{LatLng, LatLngBounds, SphericalPolygon};
use crate::models::{ShippingAddress, Zone};
use crate::services::geocoding::Geocoder;

/// Viewport hint covering the whole service region, passed to the geocoder.
pub const SERVICE_REGION_BOUNDS: LatLngBounds = LatLngBounds {
    north_east: LatLng::new(50.061937, 24.386862),
    south_west: LatLng::new(48.718416, 23.471839),
};

static GREEN_AREA: Lazy<SphericalPolygon> =
    Lazy::new(|| SphericalPolygon::new(GREEN_AREA_POINTS));
static YELLOW_AREA: Lazy<SphericalPolygon> =
    Lazy::new(|| SphericalPolygon::new(YELLOW_AREA_POINTS));

/// Classifies a shipping address into a delivery zone.
pub struct DeliveryZoneClassifier {
    geocoder: Arc<dyn Geocoder>,
    supported_country: String,
}

impl DeliveryZoneClassifier {
    pub fn new(geocoder: Arc<dyn Geocoder>, supported_country: impl Into<String>) -> Self {
        Self {
            geocoder,
            supported_country: supported_country.into(),
        }
    }

    /// Resolves the zone for an address. Degrades to [`Zone::Unknown`] on an
    /// unsupported country, a geocoding failure, or an empty candidate set;
    /// downstream treats unknown as "no delivery option available". Exactly
    /// one geocoding call per invocation, no retries.
    #[instrument(skip(self, address), fields(city = %address.city))]
    pub async fn classify(&self, address: &ShippingAddress) -> Zone {
        let country = address.country_code.to_lowercase();
        if country != self.supported_country {
            warn!(%country, "unsupported country for delivery");
            return Zone::Unknown;
        }

        let candidates = match self.geocoder.geocode(&country, address).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(error = %err, "geocoding failed");
                return Zone::Unknown;
            }
        };

        let Some(chosen) = candidates.first() else {
            debug!("no address candidates found");
            return Zone::Unknown;
        };
        debug!(
            address = %chosen.formatted_address,
            lat = chosen.location.lat,
            lng = chosen.location.lng,
            "geocoded destination"
        );

        Self::zone_for_point(chosen.location)
    }

    /// Containment is tested in order: green first, then yellow; anything
    /// not contained in either is the red (outer) zone.
    fn zone_for_point(point: LatLng) -> Zone {
        if GREEN_AREA.contains(point) {
            Zone::Green
        } else if YELLOW_AREA.contains(point) {
            Zone::Yellow
        } else {
            Zone::Red
        }
    }
}

const GREEN_AREA_POINTS: &[LatLng] = &[
    LatLng::new(49.778702, 23.980260),
    LatLng::new(49.779991, 23.976215),
    LatLng::new(49.781509, 23.976307),
    LatLng::new(49.785319, 23.978164),
    LatLng::new(49.801215, 23.980265),
    LatLng::new(49.801792, 23.973725),
    LatLng::new(49.804527, 23.969418),
    LatLng::new(49.808931, 23.967124),
    LatLng::new(49.814717, 23.955665),
    LatLng::new(49.822046, 23.978470),
    LatLng::new(49.821869, 23.988816),
    LatLng::new(49.821536, 24.005082),
    LatLng::new(49.826604, 24.009824),
    LatLng::new(49.819949, 24.020654),
    LatLng::new(49.810505, 24.047324),
    LatLng::new(49.806584, 24.047000),
    LatLng::new(49.803530, 24.047263),
    LatLng::new(49.795389, 24.054545),
    LatLng::new(49.790065, 24.034081),
    LatLng::new(49.785749, 24.033867),
    LatLng::new(49.783298, 24.028115),
    LatLng::new(49.780526, 24.027478),
    LatLng::new(49.778248, 24.025505),
    LatLng::new(49.775246, 24.025282),
];

const YELLOW_AREA_POINTS: &[LatLng] = &[
    LatLng::new(49.778702, 23.980260),
    LatLng::new(49.779991, 23.976215),
    LatLng::new(49.781509, 23.976307),
    LatLng::new(49.785319, 23.978164),
    LatLng::new(49.801215, 23.980265),
    LatLng::new(49.801792, 23.973725),
    LatLng::new(49.804527, 23.969418),
    LatLng::new(49.808931, 23.967124),
    LatLng::new(49.814717, 23.955665),
    LatLng::new(49.818809, 23.969699),
    LatLng::new(49.821845, 23.967545),
    LatLng::new(49.824083, 23.946517),
    LatLng::new(49.827042, 23.947324),
    LatLng::new(49.834094, 23.986771),
    LatLng::new(49.836923, 24.001425),
    LatLng::new(49.837410, 24.001908),
    LatLng::new(49.838450, 24.000833),
    LatLng::new(49.842022, 23.997889),
    LatLng::new(49.845856, 23.996328),
    LatLng::new(49.845381, 24.002248),
    LatLng::new(49.846416, 24.005670),
    LatLng::new(49.846727, 24.006220),
    LatLng::new(49.843001, 24.015702),
    LatLng::new(49.842879, 24.018582),
    LatLng::new(49.844922, 24.026596),
    LatLng::new(49.839412, 24.030534),
    LatLng::new(49.840661, 24.035876),
    LatLng::new(49.839880, 24.038529),
    LatLng::new(49.840033, 24.041216),
    LatLng::new(49.840825, 24.046452),
    LatLng::new(49.836115, 24.069121),
    LatLng::new(49.835258, 24.069484),
    LatLng::new(49.831127, 24.069353),
    LatLng::new(49.823070, 24.077181),
    LatLng::new(49.816338, 24.079489),
    LatLng::new(49.810172, 24.085803),
    LatLng::new(49.810350, 24.081295),
    LatLng::new(49.808931, 24.080687),
    LatLng::new(49.807531, 24.079591),
    LatLng::new(49.807130, 24.078352),
    LatLng::new(49.806476, 24.077306),
    LatLng::new(49.805205, 24.077197),
    LatLng::new(49.803696, 24.076488),
    LatLng::new(49.802390, 24.073310),
    LatLng::new(49.800527, 24.074029),
    LatLng::new(49.798623, 24.072147),
    LatLng::new(49.794635, 24.073525),
    LatLng::new(49.789424, 24.074993),
    LatLng::new(49.785752, 24.076810),
    LatLng::new(49.783936, 24.075482),
    LatLng::new(49.782271, 24.068724),
    LatLng::new(49.780808, 24.068565),
    LatLng::new(49.780835, 24.055429),
    LatLng::new(49.781585, 24.051762),
    LatLng::new(49.785707, 24.051276),
    LatLng::new(49.785534, 24.048430),
    LatLng::new(49.788966, 24.047567),
    LatLng::new(49.788928, 24.044085),
    LatLng::new(49.792141, 24.041710),
    LatLng::new(49.790065, 24.034081),
    LatLng::new(49.785749, 24.033867),
    LatLng::new(49.783298, 24.028115),
    LatLng::new(49.780526, 24.027478),
    LatLng::new(49.778248, 24.025505),
    LatLng::new(49.775246, 24.025282),
];

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::GeocoderConfig;
use crate::error::AppError;

const MAPQUEST_URL: &str = "https://www.mapquestapi.com/geocoding/v1/address";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Place {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best match for `address`, or `None` when the provider finds nothing.
    async fn geocode(&self, address: &str) -> Result<Option<Place>, AppError>;
}

pub struct MapQuestGeocoder {
    client: reqwest::Client,
    api_key: String,
}

impl MapQuestGeocoder {
    pub fn new(config: &GeocoderConfig) -> Self {
        if config.provider != "mapquest" {
            log::warn!("Unsupported geocoder provider {}, using mapquest", config.provider);
        }
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: LatLng,
    #[serde(default)]
    street: String,
    #[serde(default, rename = "adminArea5")]
    city: String,
    #[serde(default, rename = "adminArea3")]
    state: String,
    #[serde(default)]
    postal_code: String,
    #[serde(default, rename = "adminArea1")]
    country: String,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl From<MapQuestLocation> for Place {
    fn from(location: MapQuestLocation) -> Self {
        let street = non_empty(location.street);
        let city = non_empty(location.city);
        let state = non_empty(location.state);
        let zipcode = non_empty(location.postal_code);
        let country = non_empty(location.country);

        let region = [state.as_deref(), zipcode.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let formatted = [street.as_deref(), city.as_deref(), Some(region.as_str()), country.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        Place {
            latitude: location.lat_lng.lat,
            longitude: location.lat_lng.lng,
            formatted_address: non_empty(formatted),
            street,
            city,
            state,
            zipcode,
            country,
        }
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Place>, AppError> {
        let response = self
            .client
            .get(MAPQUEST_URL)
            .query(&[("key", self.api_key.as_str()), ("location", address)])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| AppError::Upstream(format!("Geocoder request failed: {err}")))?;

        let body: MapQuestResponse = response
            .json()
            .await
            .map_err(|err| AppError::Upstream(format!("Unreadable geocoder response: {err}")))?;

        Ok(body
            .results
            .into_iter()
            .flat_map(|result| result.locations)
            .next()
            .map(Place::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapquest_location_becomes_place() {
        let body: MapQuestResponse = serde_json::from_value(serde_json::json!({
            "results": [{
                "locations": [{
                    "street": "233 Bay State Rd",
                    "adminArea5": "Boston",
                    "adminArea3": "MA",
                    "adminArea1": "US",
                    "postalCode": "02215",
                    "latLng": { "lat": 42.350846, "lng": -71.103834 }
                }]
            }]
        }))
        .unwrap();

        let place = body
            .results
            .into_iter()
            .flat_map(|result| result.locations)
            .next()
            .map(Place::from)
            .unwrap();
        assert_eq!(place.longitude, -71.103834);
        assert_eq!(place.city.as_deref(), Some("Boston"));
        assert_eq!(
            place.formatted_address.as_deref(),
            Some("233 Bay State Rd, Boston, MA 02215, US")
        );
    }
}

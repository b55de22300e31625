use reqwest::header::ACCEPT_LANGUAGE;
use reqwest::Client;
use serde::Deserialize;

use super::{GeocodingProvider, LocationResult};
use crate::constants::MAX_SEARCH_RESULTS;
use crate::error::GeocodeError;

pub const PROVIDER_NAME: &str = "nominatim";

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    place_id: u64,
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    class: Option<String>,
}

/// Normalizes a Nominatim `/search?format=json` body
pub fn parse_response(body: &str) -> Result<Vec<LocationResult>, GeocodeError> {
    let places: Vec<NominatimPlace> =
        serde_json::from_str(body).map_err(|e| GeocodeError::Decode(e.to_string()))?;

    places
        .into_iter()
        .map(|place| {
            let lat = place
                .lat
                .parse::<f64>()
                .map_err(|_| GeocodeError::Decode(format!("bad latitude '{}'", place.lat)))?;
            let lon = place
                .lon
                .parse::<f64>()
                .map_err(|_| GeocodeError::Decode(format!("bad longitude '{}'", place.lon)))?;
            Ok(LocationResult {
                place_id: place.place_id,
                lat,
                lon,
                display_name: place.display_name,
                name: place.name.filter(|n| !n.is_empty()),
                class: place.class.unwrap_or_else(|| "place".to_string()),
                provider: PROVIDER_NAME,
            })
        })
        .collect()
}

/// OpenStreetMap Nominatim, the primary provider
pub struct NominatimProvider {
    client: Client,
    base_url: String,
}

impl NominatimProvider {
    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        NominatimProvider {
            client,
            base_url: base_url.into(),
        }
    }
}

impl GeocodingProvider for NominatimProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<LocationResult>, GeocodeError> {
        let limit = MAX_SEARCH_RESULTS.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("limit", limit.as_str()),
                ("addressdetails", "1"),
            ])
            .header(ACCEPT_LANGUAGE, "en")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_response(&body)
    }
}

use reqwest::{Client, Url};
use serde::Deserialize;

use super::{GeocodingProvider, LocationResult};
use crate::constants::{MAPBOX_BASE, MAX_SEARCH_RESULTS};
use crate::error::GeocodeError;

pub const PROVIDER_NAME: &str = "mapbox";

#[derive(Debug, Deserialize)]
struct MapboxResponse {
    features: Vec<MapboxFeature>,
}

#[derive(Debug, Deserialize)]
struct MapboxFeature {
    id: String,
    place_name: String,
    /// [lng, lat]
    center: [f64; 2],
    #[serde(default)]
    place_type: Vec<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Normalizes a Mapbox places response into the common result shape
pub fn parse_response(body: &str) -> Result<Vec<LocationResult>, GeocodeError> {
    let response: MapboxResponse =
        serde_json::from_str(body).map_err(|e| GeocodeError::Decode(e.to_string()))?;

    Ok(response
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            // ids look like "place.12345"
            let digits: String = feature.id.chars().filter(char::is_ascii_digit).collect();
            let place_id = digits.parse::<u64>().unwrap_or(index as u64);
            LocationResult {
                place_id,
                lat: feature.center[1],
                lon: feature.center[0],
                display_name: feature.place_name,
                name: feature.text,
                class: feature
                    .place_type
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| "place".to_string()),
                provider: PROVIDER_NAME,
            }
        })
        .collect())
}

/// Mapbox Geocoding v5, queried when Nominatim finds nothing
pub struct MapboxProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl MapboxProvider {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        MapboxProvider {
            client,
            base_url: MAPBOX_BASE.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn search_url(&self, query: &str, api_key: &str) -> Result<Url, GeocodeError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| GeocodeError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| GeocodeError::Url(self.base_url.clone()))?
            .pop_if_empty()
            .push(&format!("{}.json", query));
        url.query_pairs_mut()
            .append_pair("access_token", api_key)
            .append_pair("limit", &MAX_SEARCH_RESULTS.to_string())
            .append_pair("language", "en");
        Ok(url)
    }
}

impl GeocodingProvider for MapboxProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<LocationResult>, GeocodeError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GeocodeError::MissingApiKey(PROVIDER_NAME))?;
        let url = self.search_url(query, api_key)?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_response(&body)
    }
}

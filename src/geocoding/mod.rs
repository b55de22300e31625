//! Place search: Nominatim first, Mapbox as fallback, with a short-lived
//! cache in front of both. Failures never reach the caller; a query that
//! nothing can resolve simply yields no results.

use regex::Regex;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::constants::{MAX_SEARCH_RESULTS, SEARCH_CACHE_TTL_MS, USER_AGENT};
use crate::error::GeocodeError;
use crate::models::Coordinates;

pub mod cache;
pub mod mapbox;
pub mod nominatim;

pub use cache::SearchCache;
pub use mapbox::MapboxProvider;
pub use nominatim::NominatimProvider;

/// A named place, normalized across providers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationResult {
    pub place_id: u64,
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
    pub name: Option<String>,
    pub class: String,
    pub provider: &'static str,
}

impl LocationResult {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lon,
        }
    }
}

pub trait GeocodingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<LocationResult>, GeocodeError>> + Send;
}

impl<T: GeocodingProvider> GeocodingProvider for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<LocationResult>, GeocodeError>> + Send {
        (**self).search(query)
    }
}

/// HTTP client shared by the providers
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, GeocodeError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

fn coordinate_regex() -> &'static Regex {
    static COORDINATES: OnceLock<Regex> = OnceLock::new();
    COORDINATES.get_or_init(|| {
        Regex::new(r"^([-+]?\d+\.?\d*)\s*,\s*([-+]?\d+\.?\d*)$").expect("coordinate pattern is valid")
    })
}

/// Recognizes `"<lat>,<lng>"` input such as `"40.7128,-74.0060"`.
/// Returns `None` for anything that is not an in-range coordinate pair.
pub fn parse_coordinates(query: &str) -> Option<Coordinates> {
    let captures = coordinate_regex().captures(query.trim())?;
    let lat = captures[1].parse::<f64>().ok()?;
    let lng = captures[2].parse::<f64>().ok()?;
    Coordinates::new(lat, lng).ok()
}

/// Where to center the map when nothing better is known
pub fn default_location() -> Coordinates {
    Coordinates::default()
}

pub struct GeocodingGateway<P, S> {
    primary: P,
    secondary: S,
    cache: SearchCache,
    clock: Arc<dyn Clock>,
}

impl<P: GeocodingProvider, S: GeocodingProvider> GeocodingGateway<P, S> {
    pub fn new(primary: P, secondary: S, clock: Arc<dyn Clock>) -> Self {
        GeocodingGateway {
            primary,
            secondary,
            cache: SearchCache::new(SEARCH_CACHE_TTL_MS),
            clock,
        }
    }

    /// Up to `MAX_SEARCH_RESULTS` places, best match first.
    pub async fn search(&self, query: &str) -> Vec<LocationResult> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        if let Some(results) = self.cache.get(query, self.clock.now_millis()) {
            debug!(query = %query, "Geocoding cache hit");
            return results;
        }

        let mut results = self.query_provider(&self.primary, query).await;
        if results.is_empty() {
            debug!(query = %query, fallback = self.secondary.name(), "Primary geocoder found nothing");
            results = self.query_provider(&self.secondary, query).await;
        }
        results.truncate(MAX_SEARCH_RESULTS);

        if !results.is_empty() {
            self.cache.insert(query, results.clone(), self.clock.now_millis());
        }
        info!(query = %query, count = results.len(), "Geocoding search finished");
        results
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Search-as-you-type driver. Each edit restarts the `debounce` window;
    /// once the text has been stable that long it is searched and the
    /// results are published. Returns when the query sender is dropped.
    pub async fn follow(
        &self,
        mut queries: watch::Receiver<String>,
        results: watch::Sender<Vec<LocationResult>>,
        debounce: Duration,
    ) {
        while queries.changed().await.is_ok() {
            loop {
                match tokio::time::timeout(debounce, queries.changed()).await {
                    Ok(Ok(())) => continue,
                    Ok(Err(_)) => return,
                    Err(_) => break,
                }
            }
            let query = queries.borrow_and_update().clone();
            results.send_replace(self.search(&query).await);
        }
    }

    async fn query_provider<G: GeocodingProvider>(&self, provider: &G, query: &str) -> Vec<LocationResult> {
        match provider.search(query).await {
            Ok(results) => results,
            Err(e) => {
                warn!(provider = provider.name(), query = %query, error = %e, "Geocoding request failed");
                Vec::new()
            }
        }
    }
}

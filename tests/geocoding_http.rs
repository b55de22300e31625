use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server};

use mapflam::clock::ManualClock;
use mapflam::geocoding::{http_client, GeocodingGateway, GeocodingProvider, MapboxProvider, NominatimProvider};
use mapflam::{Coordinates, GeocodeError};

/// Serves canned bodies by path prefix, returns the base URL
fn start_server(routes: Vec<(&'static str, u16, &'static str)>) -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    thread::spawn(move || {
        for request in server.incoming_requests() {
            let url = request.url().to_string();
            let response = match routes.iter().find(|(prefix, _, _)| url.starts_with(prefix)) {
                Some((_, status, body)) => Response::from_string(*body)
                    .with_status_code(*status)
                    .with_header("Content-Type: application/json".parse::<Header>().unwrap()),
                None => Response::from_string("Not Found").with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });
    format!("http://127.0.0.1:{}", port)
}

const NOMINATIM_LAGOS: &str = r#"[{"place_id": 1, "lat": "6.4550", "lon": "3.3941",
    "display_name": "Lagos, Nigeria", "name": "Lagos", "class": "boundary"}]"#;

const MAPBOX_IKEJA: &str = r#"{"features": [{"id": "place.99", "place_name": "Ikeja, Lagos",
    "center": [3.35, 6.6], "place_type": ["locality"], "text": "Ikeja"}]}"#;

#[tokio::test]
async fn nominatim_provider_parses_live_response() {
    let base = start_server(vec![("/search", 200, NOMINATIM_LAGOS)]);
    let client = http_client(Duration::from_secs(5)).unwrap();
    let provider = NominatimProvider::with_base_url(client, format!("{}/search", base));

    let results = provider.search("lagos").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].display_name, "Lagos, Nigeria");
}

#[tokio::test]
async fn server_error_is_reported_as_status() {
    let base = start_server(vec![("/search", 503, "busy")]);
    let client = http_client(Duration::from_secs(5)).unwrap();
    let provider = NominatimProvider::with_base_url(client, format!("{}/search", base));

    assert!(matches!(provider.search("lagos").await, Err(GeocodeError::Status(503))));
}

#[tokio::test]
async fn gateway_falls_back_to_mapbox_over_http() {
    let base = start_server(vec![
        ("/search", 200, "[]"),
        ("/places/", 200, MAPBOX_IKEJA),
    ]);
    let client = http_client(Duration::from_secs(5)).unwrap();
    let gateway = GeocodingGateway::new(
        NominatimProvider::with_base_url(client.clone(), format!("{}/search", base)),
        MapboxProvider::new(client, Some("pk.test".to_string())).with_base_url(format!("{}/places", base)),
        Arc::new(ManualClock::new(0)),
    );

    let results = gateway.search("ikeja").await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].provider, "mapbox");
    assert_eq!(results[0].place_id, 99);
    assert_eq!(results[0].coordinates(), Coordinates { lat: 6.6, lng: 3.35 });
}

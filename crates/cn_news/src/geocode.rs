use async_trait::async_trait;
use cn_core::{Coordinates, Error, GeocodeResolver, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

const USER_AGENT: &str = concat!("contextual-news/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Forward geocoding against a Nominatim-compatible search endpoint.
pub struct NominatimGeocoder {
    client: Client,
    base_url: Url,
}

impl fmt::Debug for NominatimGeocoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NominatimGeocoder")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl NominatimGeocoder {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_request_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_request_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::validation(format!("Invalid geocoder URL '{}': {}", base_url, e)))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    fn search_url(&self) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/search", base))
            .map_err(|e| Error::Geocode(format!("Invalid search URL: {}", e)))
    }
}

#[async_trait]
impl GeocodeResolver for NominatimGeocoder {
    fn name(&self) -> &str {
        "Nominatim"
    }

    async fn resolve(&self, text: &str) -> Result<Coordinates> {
        let response = self
            .client
            .get(self.search_url()?)
            .query(&[("q", text), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| request_error(text, e))?;

        if !response.status().is_success() {
            return Err(Error::Geocode(format!(
                "Geocoder returned {} for '{}'",
                response.status(),
                text
            )));
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| request_error(text, e))?;

        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| Error::Geocode(format!("No coordinates found for '{}'", text)))?;
        let coordinates = parse_place(&place)?;
        debug!(
            location = %text,
            lat = coordinates.latitude,
            lon = coordinates.longitude,
            "Geocoded location"
        );
        Ok(coordinates)
    }
}

fn request_error(text: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!("Geocoding '{}' timed out: {}", text, e))
    } else {
        Error::Geocode(format!("Geocoding request for '{}' failed: {}", text, e))
    }
}

fn parse_place(place: &Place) -> Result<Coordinates> {
    let parse = |raw: &str| {
        raw.trim()
            .parse::<f64>()
            .map_err(|_| Error::Geocode(format!("Invalid coordinate '{}'", raw)))
    };
    Ok(Coordinates::new(parse(&place.lat)?, parse(&place.lon)?))
}

/// Fixed lookup table, matched case-insensitively. Useful offline.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    places: HashMap<String, Coordinates>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(mut self, name: &str, latitude: f64, longitude: f64) -> Self {
        self.places
            .insert(name.trim().to_lowercase(), Coordinates::new(latitude, longitude));
        self
    }

    pub fn with_places<'a>(self, places: impl IntoIterator<Item = (&'a str, f64, f64)>) -> Self {
        places
            .into_iter()
            .fold(self, |geocoder, (name, lat, lon)| geocoder.with_place(name, lat, lon))
    }
}

#[async_trait]
impl GeocodeResolver for StaticGeocoder {
    fn name(&self) -> &str {
        "Static"
    }

    async fn resolve(&self, text: &str) -> Result<Coordinates> {
        self.places
            .get(&text.trim().to_lowercase())
            .copied()
            .ok_or_else(|| Error::Geocode(format!("No coordinates found for '{}'", text)))
    }
}

/// Builds the geocoder named by `kind`.
pub fn create_geocoder(kind: &str, url: Option<&str>) -> Result<Arc<dyn GeocodeResolver>> {
    let geocoder: Arc<dyn GeocodeResolver> = match kind {
        "nominatim" => Arc::new(NominatimGeocoder::new(url.unwrap_or(DEFAULT_NOMINATIM_URL))?),
        "static" => Arc::new(StaticGeocoder::new()),
        other => {
            return Err(Error::validation(format!(
                "Unknown geocoder '{}'. Available geocoders: nominatim, static",
                other
            )))
        }
    };
    info!("🗺️ Geocoder initialized (using {})", geocoder.name());
    Ok(geocoder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cn_core::ErrorKind;

    #[tokio::test]
    async fn test_static_geocoder() {
        let geocoder = StaticGeocoder::new()
            .with_places([("Palo Alto", 37.4419, -122.1430), ("Berlin", 52.52, 13.405)]);

        let palo_alto = geocoder.resolve("  palo ALTO ").await.unwrap();
        assert_eq!(palo_alto, Coordinates::new(37.4419, -122.1430));

        let err = geocoder.resolve("Atlantis").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }

    #[test]
    fn test_parse_place() {
        let raw = r#"[{"lat": "37.4443293", "lon": "-122.1598465", "display_name": "Palo Alto"}]"#;
        let place: Vec<Place> = serde_json::from_str(raw).unwrap();
        let coordinates = parse_place(&place[0]).unwrap();
        assert!((coordinates.latitude - 37.4443293).abs() < 1e-9);
        assert!((coordinates.longitude + 122.1598465).abs() < 1e-9);

        let bad = Place {
            lat: "north".to_string(),
            lon: "0".to_string(),
        };
        assert!(parse_place(&bad).is_err());
    }

    #[test]
    fn test_create_geocoder() {
        assert_eq!(create_geocoder("static", None).unwrap().name(), "Static");
        assert_eq!(
            create_geocoder("nominatim", Some("http://localhost:8088")).unwrap().name(),
            "Nominatim"
        );
        assert!(create_geocoder("nominatim", Some("not a url")).is_err());
        assert!(create_geocoder("google", None).is_err());
    }

    #[tokio::test]
    async fn test_unresponsive_geocoder_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let geocoder =
            NominatimGeocoder::with_request_timeout(&base_url, Duration::from_millis(200)).unwrap();
        let err = geocoder.resolve("Palo Alto").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout, "{}", err);

        server.abort();
    }

    #[test]
    fn test_search_url() {
        let geocoder = NominatimGeocoder::new("http://localhost:8088/").unwrap();
        assert_eq!(geocoder.search_url().unwrap().as_str(), "http://localhost:8088/search");
    }
}

//! Reverse geocoding against a [Nominatim](https://nominatim.org) server.

use std::time::Duration;

use async_trait::async_trait;
use charging::geocoding::{GeocodeError, Geocoder};
use serde::Deserialize;
use tokio::{
    sync::Mutex,
    time::{sleep_until, Instant},
};

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const USER_AGENT: &str = concat!("charging-stations/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NominatimAddress {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
}

impl NominatimAddress {
    /// Get city, falling back to town or village
    pub fn get_city(&self) -> Option<String> {
        self.city
            .clone()
            .or_else(|| self.town.clone())
            .or_else(|| self.village.clone())
            .filter(|name| !name.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NominatimReverseResponse {
    pub address: Option<NominatimAddress>,
    pub error: Option<String>,
}

/// Spaces out calls so consecutive requests start at least `min_interval`
/// apart.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    next: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let mut next = self.next.lock().await;
        if let Some(at) = *next {
            sleep_until(at).await;
        }
        *next = Some(Instant::now() + self.min_interval);
    }
}

pub struct NominatimGeocoder {
    base_url: String,
    client: reqwest::Client,
    throttle: Throttle,
}

impl NominatimGeocoder {
    /// Public Nominatim allows one request per second.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);
    pub const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new() -> Result<Self, GeocodeError> {
        Self::with_base_url(NOMINATIM_URL)
    }

    pub fn with_base_url<S: Into<String>>(base_url: S) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Self::TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            client,
            throttle: Throttle::new(Self::MIN_INTERVAL),
        })
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.throttle = Throttle::new(min_interval);
        self
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        self.throttle.wait().await;

        let url = format!("{}/reverse", self.base_url);
        log::debug!("reverse geocoding {latitude}, {longitude}");
        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_owned()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("accept-language", "en".to_owned()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::InvalidResponse {
                status_code: response.status(),
                url,
            });
        }
        let body: NominatimReverseResponse = serde_json::from_str(&response.text().await?)?;
        city_of(body)
    }
}

fn city_of(response: NominatimReverseResponse) -> Result<String, GeocodeError> {
    if let Some(why) = response.error {
        log::debug!("nominatim: {why}");
    }
    response
        .address
        .and_then(|address| address.get_city())
        .ok_or(GeocodeError::NoPlace)
}

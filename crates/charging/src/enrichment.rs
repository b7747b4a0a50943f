use std::time::Duration;

use chrono::{DateTime, Utc};
use model::{
    station::{NormalizedStation, StalenessPolicy, Station},
    stats::UNKNOWN_CITY,
};
use tokio::time;

use crate::{
    geocoding::{GeocodeError, Geocoder},
    operator,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enriched {
    pub stations: Vec<Station>,
    /// Stations whose city fell back to `"Unknown"`.
    pub fallbacks: usize,
}

/// Adds the derived fields to normalized stations. Best-effort: a failed
/// lookup degrades a single station, never the batch.
pub struct Enricher<G> {
    geocoder: G,
    policy: StalenessPolicy,
    timeout: Duration,
}

impl<G: Geocoder> Enricher<G> {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(geocoder: G, policy: StalenessPolicy) -> Self {
        Self {
            geocoder,
            policy,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn policy(&self) -> &StalenessPolicy {
        &self.policy
    }

    pub async fn enrich(
        &self,
        stations: Vec<NormalizedStation>,
        now: DateTime<Utc>,
    ) -> Enriched {
        let mut enriched = Enriched::default();
        for station in stations {
            let city = match self.locate(&station).await {
                Ok(city) => city,
                Err(why) => {
                    log::warn!(
                        "could not locate station {} ({}, {}): {why}",
                        station.id,
                        station.latitude,
                        station.longitude
                    );
                    enriched.fallbacks += 1;
                    UNKNOWN_CITY.to_owned()
                }
            };
            let is_tesla = operator::is_tesla(&station.operator_name);
            enriched
                .stations
                .push(Station::enriched(station, city, is_tesla, &self.policy, now));
        }
        self.geocoder.flush().await;
        enriched
    }

    async fn locate(&self, station: &NormalizedStation) -> Result<String, GeocodeError> {
        let lookup = self.geocoder.reverse(station.latitude, station.longitude);
        let city = time::timeout(self.timeout, lookup)
            .await
            .map_err(|_| GeocodeError::Timeout)??;
        let city = city.trim();
        if city.is_empty() {
            Err(GeocodeError::NoPlace)
        } else {
            Ok(city.to_owned())
        }
    }
}

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::{geo, id::HasId, id::Id};

use crate::{ExampleData, WithDistance};

/// A charging station after validation and operator normalization, before
/// any derived fields have been added.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedStation {
    pub id: Id<Station>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub operator_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub last_seen_active: Option<DateTime<Utc>>,
}

/// One charging location as it is persisted.
///
/// `is_offline` is derived from `last_seen_active` at `observed_at`. It is
/// only ever written together with both, see [`Station::classify`].
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: Id<Station>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub operator_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub last_seen_active: Option<DateTime<Utc>>,
    pub observed_at: DateTime<Utc>,
    pub is_offline: bool,
    pub is_tesla: bool,
}

impl HasId for Station {
    type IdType = String;
}

impl Station {
    pub fn enriched(
        station: NormalizedStation,
        city: String,
        is_tesla: bool,
        policy: &StalenessPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        let mut enriched = Self {
            id: station.id,
            name: station.name,
            address: station.address,
            operator_name: station.operator_name,
            latitude: station.latitude,
            longitude: station.longitude,
            city,
            last_seen_active: station.last_seen_active,
            observed_at: now,
            is_offline: false,
            is_tesla,
        };
        enriched.classify(policy, now);
        enriched
    }

    /// Recomputes the offline flag from its inputs.
    pub fn classify(&mut self, policy: &StalenessPolicy, now: DateTime<Utc>) {
        self.observed_at = now;
        self.is_offline = policy.is_offline(self.last_seen_active, now);
    }

    /// Whole days between the last confirmed activity and the observation.
    pub fn days_since_seen(&self) -> Option<i64> {
        self.last_seen_active
            .map(|seen| (self.observed_at - seen).num_days())
    }

    pub fn with_distance_to(self, latitude: f64, longitude: f64) -> WithDistance<Self> {
        let distance = geo::haversine_distance(
            latitude,
            longitude,
            self.latitude,
            self.longitude,
        );
        WithDistance::new(distance, self)
    }
}

impl ExampleData for Station {
    fn example_data() -> Self {
        let observed_at =
            DateTime::from_timestamp(1_767_225_600, 0).unwrap_or_default();
        Self {
            id: Id::new("12345".to_owned()),
            name: Some("Jing'an Supercharger".to_owned()),
            address: Some("1601 Nanjing West Road".to_owned()),
            operator_name: "Tesla".to_owned(),
            latitude: 31.2286,
            longitude: 121.4453,
            city: "Shanghai".to_owned(),
            last_seen_active: Some(observed_at - Duration::days(12)),
            observed_at,
            is_offline: false,
            is_tesla: true,
        }
    }
}

/// Classifies a station as offline once its last confirmed activity is
/// older than the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StalenessPolicy {
    pub offline_threshold_days: i64,
}

impl StalenessPolicy {
    pub const DEFAULT_THRESHOLD_DAYS: i64 = 90;
    /// Roughly a thousand years.
    pub const MAX_THRESHOLD_DAYS: i64 = 365_250;

    pub fn new(offline_threshold_days: i64) -> Self {
        Self {
            offline_threshold_days,
        }
    }

    /// Returns `None` unless `0 <= offline_threshold_days <= MAX_THRESHOLD_DAYS`.
    pub fn try_new(offline_threshold_days: i64) -> Option<Self> {
        (0..=Self::MAX_THRESHOLD_DAYS)
            .contains(&offline_threshold_days)
            .then(|| Self::new(offline_threshold_days))
    }

    /// `None` when the day count does not fit a `Duration`.
    pub fn threshold(&self) -> Option<Duration> {
        Duration::try_days(self.offline_threshold_days)
    }

    /// A station that never reported activity is not considered offline.
    pub fn is_offline(
        &self,
        last_seen_active: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        match (last_seen_active, self.threshold()) {
            (Some(seen), Some(threshold)) => now - seen > threshold,
            // a threshold beyond any representable span is never exceeded
            _ => false,
        }
    }
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD_DAYS)
    }
}

use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::station::Station;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineStation {
    pub id: Id<Station>,
    pub operator_name: String,
    pub city: String,
}

impl From<&Station> for OfflineStation {
    fn from(station: &Station) -> Self {
        Self {
            id: station.id.clone(),
            operator_name: station.operator_name.clone(),
            city: station.city.clone(),
        }
    }
}

/// Raised when the share of offline stations exceeds the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub offline_ratio: f64,
    pub threshold: f64,
    pub total: u64,
    pub stations: Vec<OfflineStation>,
}

impl Alert {
    pub fn message(&self) -> String {
        format!(
            "{:.1}% of charging stations are offline ({}/{}), above the {:.1}% threshold.",
            self.offline_ratio * 100.0,
            self.stations.len(),
            self.total,
            self.threshold * 100.0,
        )
    }
}

/// A snapshot of station health at one point in time.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub total: u64,
    pub offline: u64,
    pub offline_ratio: f64,
    pub threshold: f64,
    pub alert: Option<Alert>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.alert.is_none()
    }
}

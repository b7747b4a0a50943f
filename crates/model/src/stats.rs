use itertools::Itertools as _;
use serde::{Deserialize, Serialize};

use crate::station::Station;

/// City name used when a station could not be located.
pub const UNKNOWN_CITY: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedCount {
    pub name: String,
    pub count: u64,
}

/// Aggregates over the stored stations, as shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationStats {
    pub total: u64,
    pub offline: u64,
    pub online: u64,
    pub tesla: u64,
    /// Stations per operator, largest first.
    pub by_operator: Vec<NamedCount>,
    /// The largest cities, excluding stations without a known city.
    pub by_city: Vec<NamedCount>,
}

impl StationStats {
    pub fn from_stations(stations: &[Station], top_cities: usize) -> Self {
        let offline = stations.iter().filter(|s| s.is_offline).count() as u64;
        let total = stations.len() as u64;
        Self {
            total,
            offline,
            online: total - offline,
            tesla: stations.iter().filter(|s| s.is_tesla).count() as u64,
            by_operator: ranked(stations.iter().map(|s| s.operator_name.as_str())),
            by_city: ranked(
                stations
                    .iter()
                    .map(|s| s.city.as_str())
                    .filter(|city| *city != UNKNOWN_CITY),
            )
            .into_iter()
            .take(top_cities)
            .collect(),
        }
    }
}

/// Counts occurrences, ordered by count descending and then by name.
fn ranked<'a, I>(names: I) -> Vec<NamedCount>
where
    I: Iterator<Item = &'a str>,
{
    names
        .counts()
        .into_iter()
        .map(|(name, count)| NamedCount {
            name: name.to_owned(),
            count: count as u64,
        })
        .sorted_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone as _, Utc};
    use utility::id::Id;

    use super::*;

    fn station(id: &str, operator: &str, city: &str, offline: bool) -> Station {
        Station {
            id: Id::new(id.to_owned()),
            name: None,
            address: None,
            operator_name: operator.to_owned(),
            latitude: 0.0,
            longitude: 0.0,
            city: city.to_owned(),
            last_seen_active: None,
            observed_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            is_offline: offline,
            is_tesla: operator == "Tesla",
        }
    }

    #[test]
    fn counts_and_ranks() {
        let stations = vec![
            station("1", "Tesla", "Shanghai", false),
            station("2", "Tesla", "Beijing", true),
            station("3", "BP", "Shanghai", false),
            station("4", "Shell", UNKNOWN_CITY, false),
            station("5", "BP", UNKNOWN_CITY, true),
            station("6", "Tesla", "Shenzhen", false),
        ];
        let stats = StationStats::from_stations(&stations, 2);

        assert_eq!(stats.total, 6);
        assert_eq!(stats.offline, 2);
        assert_eq!(stats.online, 4);
        assert_eq!(stats.tesla, 3);
        assert_eq!(
            stats.by_operator,
            vec![
                NamedCount { name: "Tesla".to_owned(), count: 3 },
                NamedCount { name: "BP".to_owned(), count: 2 },
                NamedCount { name: "Shell".to_owned(), count: 1 },
            ]
        );
        assert_eq!(
            stats.by_city,
            vec![
                NamedCount { name: "Shanghai".to_owned(), count: 2 },
                NamedCount { name: "Beijing".to_owned(), count: 1 },
            ]
        );
    }

    #[test]
    fn empty_store_has_zero_stats() {
        let stats = StationStats::from_stations(&[], 10);
        assert_eq!(stats, StationStats::default());
    }
}

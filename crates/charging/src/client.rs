use model::{station::Station, stats::StationStats, WithDistance};
use utility::{geo, id::Id, let_also::LetAlso};

use crate::{
    database::{Database, StationRepo},
    RequestResult,
};

/// Outcome of persisting a batch one record at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub persisted: usize,
    pub failed: usize,
}

/// Filters for reading stations back out of the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationFilter {
    pub offline: Option<bool>,
    /// Compared against the normalized operator name, ignoring case.
    pub operator: Option<String>,
    pub city: Option<String>,
    /// `(latitude, longitude, radius_km)`
    pub near: Option<(f64, f64, f64)>,
}

impl StationFilter {
    pub fn matches(&self, station: &Station) -> bool {
        self.offline.map_or(true, |offline| station.is_offline == offline)
            && self
                .operator
                .as_ref()
                .map_or(true, |operator| station.operator_name.eq_ignore_ascii_case(operator))
            && self
                .city
                .as_ref()
                .map_or(true, |city| station.city.eq_ignore_ascii_case(city))
            && self.near.map_or(true, |(latitude, longitude, radius_km)| {
                geo::haversine_distance(latitude, longitude, station.latitude, station.longitude)
                    <= radius_km
            })
    }
}

#[derive(Debug, Clone)]
pub struct Client<D>
where
    D: Database + Send + Sync + Sized + 'static,
{
    id: String,
    pub database: D,
}

impl<D> Client<D>
where
    D: Database,
{
    pub(crate) fn new<S>(id: S, database: D) -> Self
    where
        S: Into<String>,
    {
        Self {
            id: id.into(),
            database,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Persists every station with its own upsert. A failing record is
    /// logged and counted, and the batch carries on.
    pub async fn upsert_stations(&self, stations: &[Station]) -> UpsertOutcome {
        let mut outcome = UpsertOutcome::default();
        for station in stations {
            match self.database.auto().upsert_station(station).await {
                Ok(()) => outcome.persisted += 1,
                Err(why) => {
                    log::error!("[{}] failed to persist station {}: {why}", self.id, station.id);
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    pub async fn get_station(&self, id: &Id<Station>) -> RequestResult<Station> {
        Ok(self.database.auto().get_station(id).await?)
    }

    pub async fn get_all_stations(&self) -> RequestResult<Vec<Station>> {
        Ok(self.database.auto().list_all_stations().await?)
    }

    pub async fn get_stations(&self, filter: &StationFilter) -> RequestResult<Vec<Station>> {
        self.get_all_stations()
            .await?
            .into_iter()
            .filter(|station| filter.matches(station))
            .collect::<Vec<_>>()
            .let_owned(Ok)
    }

    /// Stations within `radius_km`, nearest first.
    pub async fn get_nearby_stations(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> RequestResult<Vec<WithDistance<Station>>> {
        let filter = StationFilter {
            near: Some((latitude, longitude, radius_km)),
            ..Default::default()
        };
        self.get_stations(&filter)
            .await?
            .into_iter()
            .map(|station| station.with_distance_to(latitude, longitude))
            .collect::<Vec<_>>()
            .also(|stations| {
                stations.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km))
            })
            .let_owned(Ok)
    }

    pub async fn get_stats(&self, top_cities: usize) -> RequestResult<StationStats> {
        Ok(self.database.auto().station_stats(top_cities).await?)
    }
}

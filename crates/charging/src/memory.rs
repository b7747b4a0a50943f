use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use model::{station::Station, stats::StationStats};
use tokio::sync::RwLock;
use utility::id::Id;

use crate::database::{
    Database, DatabaseAutocommit, DatabaseError, Result, StationRepo,
};

/// A station store kept in process memory. Used for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    stations: Arc<RwLock<IndexMap<Id<Station>, Station>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.stations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.stations.read().await.is_empty()
    }
}

pub struct MemoryDatabaseAutocommit {
    stations: Arc<RwLock<IndexMap<Id<Station>, Station>>>,
}

impl DatabaseAutocommit for MemoryDatabaseAutocommit {}

impl Database for MemoryDatabase {
    type Autocommit = MemoryDatabaseAutocommit;

    fn auto(&self) -> Self::Autocommit {
        MemoryDatabaseAutocommit {
            stations: self.stations.clone(),
        }
    }
}

#[async_trait]
impl StationRepo for MemoryDatabaseAutocommit {
    async fn upsert_station(&mut self, station: &Station) -> Result<()> {
        // the write lock is held for the whole replacement, so readers never
        // observe a partially updated station.
        self.stations
            .write()
            .await
            .insert(station.id.clone(), station.clone());
        Ok(())
    }

    async fn get_station(&mut self, id: &Id<Station>) -> Result<Station> {
        self.stations
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(DatabaseError::NotFound)
    }

    async fn list_all_stations(&mut self) -> Result<Vec<Station>> {
        let mut stations = self
            .stations
            .read()
            .await
            .values()
            .cloned()
            .collect::<Vec<_>>();
        stations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(stations)
    }

    async fn station_stats(&mut self, top_cities: usize) -> Result<StationStats> {
        let stations = self.list_all_stations().await?;
        Ok(StationStats::from_stations(&stations, top_cities))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone as _, Utc};
    use model::ExampleData as _;

    use super::*;

    #[tokio::test]
    async fn upsert_overwrites_existing_row() {
        let database = MemoryDatabase::new();
        let mut station = Station::example_data();
        database.auto().upsert_station(&station).await.unwrap();

        station.city = "Suzhou".to_owned();
        station.observed_at = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        database.auto().upsert_station(&station).await.unwrap();

        assert_eq!(database.len().await, 1);
        let stored = database.auto().get_station(&station.id).await.unwrap();
        assert_eq!(stored, station);
    }

    #[tokio::test]
    async fn missing_station_is_not_found() {
        let database = MemoryDatabase::new();
        let result = database
            .auto()
            .get_station(&Id::new("nope".to_owned()))
            .await;
        assert!(matches!(result, Err(DatabaseError::NotFound)));
    }

    #[tokio::test]
    async fn lists_in_id_order() {
        let database = MemoryDatabase::new();
        for id in ["b", "c", "a"] {
            let mut station = Station::example_data();
            station.id = Id::new(id.to_owned());
            database.auto().upsert_station(&station).await.unwrap();
        }
        let ids = database
            .auto()
            .list_all_stations()
            .await
            .unwrap()
            .into_iter()
            .map(|station| station.id.raw())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}

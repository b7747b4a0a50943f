use async_trait::async_trait;
use charging::database::{Result, StationRepo};
use chrono::{DateTime, Utc};
use model::{station::Station, stats::StationStats};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{
    queries::station::{get, get_all, stats, upsert},
    PgDatabaseAutocommit,
};

use super::DatabaseRow;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct StationRow {
    pub id: String,
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

impl DatabaseRow for StationRow {
    type Model = Station;

    fn to_model(self) -> Self::Model {
        Station {
            id: Id::new(self.id),
            name: self.name,
            address: self.address,
            operator_name: self.operator_name,
            latitude: self.latitude,
            longitude: self.longitude,
            city: self.city,
            last_seen_active: self.last_seen_active,
            observed_at: self.observed_at,
            is_offline: self.is_offline,
            is_tesla: self.is_tesla,
        }
    }

    fn from_model(model: &Self::Model) -> Self {
        Self {
            id: model.id.raw(),
            name: model.name.clone(),
            address: model.address.clone(),
            operator_name: model.operator_name.clone(),
            latitude: model.latitude,
            longitude: model.longitude,
            city: model.city.clone(),
            last_seen_active: model.last_seen_active,
            observed_at: model.observed_at,
            is_offline: model.is_offline,
            is_tesla: model.is_tesla,
        }
    }
}

// Repo

#[async_trait]
impl StationRepo for PgDatabaseAutocommit {
    async fn upsert_station(&mut self, station: &Station) -> Result<()> {
        upsert(&self.pool, station).await
    }

    async fn get_station(&mut self, id: &Id<Station>) -> Result<Station> {
        get(&self.pool, id).await
    }

    async fn list_all_stations(&mut self) -> Result<Vec<Station>> {
        get_all(&self.pool).await
    }

    async fn station_stats(&mut self, top_cities: usize) -> Result<StationStats> {
        stats(&self.pool, top_cities).await
    }
}

use std::{error, fmt, result};

use async_trait::async_trait;
use model::{station::Station, stats::StationStats};
use utility::id::Id;

#[derive(Debug)]
pub enum DatabaseError {
    NotFound,
    Other(Box<dyn error::Error + Send + Sync>),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "row not found"),
            Self::Other(why) => write!(f, "database error: {why}"),
        }
    }
}

impl error::Error for DatabaseError {}

pub type Result<T> = result::Result<T, DatabaseError>;

#[async_trait]
pub trait StationRepo {
    /// Inserts the station, or overwrites every column of the row with the
    /// same id. Each call is atomic on its own; there is no batch transaction.
    async fn upsert_station(&mut self, station: &Station) -> Result<()>;

    async fn get_station(&mut self, id: &Id<Station>) -> Result<Station>;

    /// All stored stations ordered by id.
    async fn list_all_stations(&mut self) -> Result<Vec<Station>>;

    async fn station_stats(&mut self, top_cities: usize) -> Result<StationStats>;
}

pub trait DatabaseAutocommit: StationRepo {}

/// trait to implement a station store.
/// multiple concurrent accesses should be possible by e.g. cloning the database object.
pub trait Database: Clone + Send + Sync + Sized + 'static {
    type Autocommit: DatabaseAutocommit + Send;

    fn auto(&self) -> Self::Autocommit;
}

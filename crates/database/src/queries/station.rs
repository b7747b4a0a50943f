use charging::database::Result;
use model::{
    station::Station,
    stats::{NamedCount, StationStats, UNKNOWN_CITY},
};
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{
    station::StationRow,
    stats::{NamedCountRow, TotalsRow},
    DatabaseRow as _,
};

use super::{convert_error, select_statement, upsert_statement};

const COLUMNS: &[&str] = &[
    "id",
    "name",
    "address",
    "operator_name",
    "latitude",
    "longitude",
    "city",
    "last_seen_active",
    "observed_at",
    "is_offline",
    "is_tesla",
];

pub async fn upsert<'c, E>(executor: E, station: &Station) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    let row = StationRow::from_model(station);
    sqlx::query(&upsert_statement("stations", COLUMNS, &["id"]))
        .bind(row.id)
        .bind(row.name)
        .bind(row.address)
        .bind(row.operator_name)
        .bind(row.latitude)
        .bind(row.longitude)
        .bind(row.city)
        .bind(row.last_seen_active)
        .bind(row.observed_at)
        .bind(row.is_offline)
        .bind(row.is_tesla)
        .execute(executor)
        .await
        .map_err(convert_error)?;
    Ok(())
}

pub async fn get<'c, E>(executor: E, id: &Id<Station>) -> Result<Station>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, StationRow>(&select_statement("stations", COLUMNS, "WHERE id = $1"))
        .bind(id.raw_ref::<str>())
        .fetch_one(executor)
        .await
        .map_err(convert_error)?
        .let_owned(|row| Ok(row.to_model()))
}

pub async fn get_all<'c, E>(executor: E) -> Result<Vec<Station>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, StationRow>(&select_statement("stations", COLUMNS, "ORDER BY id"))
        .fetch_all(executor)
        .await
        .map_err(convert_error)?
        .let_owned(|rows| Ok(rows.into_iter().map(|row| row.to_model()).collect()))
}

/// `LIMIT` for the city ranking. Postgres takes a signed bigint.
fn city_limit(top_cities: usize) -> i64 {
    i64::try_from(top_cities).unwrap_or(i64::MAX)
}

pub async fn stats<'c, E>(executor: E, top_cities: usize) -> Result<StationStats>
where
    E: Executor<'c, Database = Postgres> + Copy,
{
    let totals: TotalsRow = sqlx::query_as(
        "
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE is_offline) AS offline,
            COUNT(*) FILTER (WHERE is_tesla) AS tesla
        FROM
            stations;
        ",
    )
    .fetch_one(executor)
    .await
    .map_err(convert_error)?;

    let by_operator: Vec<NamedCountRow> = sqlx::query_as(
        "
        SELECT
            operator_name AS name, COUNT(*) AS count
        FROM
            stations
        GROUP BY
            operator_name
        ORDER BY
            count DESC, name;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    let by_city: Vec<NamedCountRow> = sqlx::query_as(
        "
        SELECT
            city AS name, COUNT(*) AS count
        FROM
            stations
        WHERE
            city <> $1
        GROUP BY
            city
        ORDER BY
            count DESC, name
        LIMIT $2;
        ",
    )
    .bind(UNKNOWN_CITY)
    .bind(city_limit(top_cities))
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(StationStats {
        total: totals.total as u64,
        offline: totals.offline as u64,
        online: (totals.total - totals.offline) as u64,
        tesla: totals.tesla as u64,
        by_operator: by_operator.into_iter().map(NamedCount::from).collect(),
        by_city: by_city.into_iter().map(NamedCount::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_every_row_column() {
        assert_eq!(
            select_statement("stations", COLUMNS, "WHERE id = $1"),
            "SELECT id, name, address, operator_name, latitude, longitude, city, \
             last_seen_active, observed_at, is_offline, is_tesla FROM stations WHERE id = $1;"
        );
    }

    #[test]
    fn city_limit_saturates() {
        assert_eq!(city_limit(0), 0);
        assert_eq!(city_limit(10), 10);
        assert_eq!(city_limit(usize::MAX), i64::MAX);
    }
}

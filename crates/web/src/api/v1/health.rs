use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Query, State},
    http::Method,
    Extension,
};
use charging::database::Database;
use chrono::{DateTime, Utc};
use model::{health::HealthReport, station::StalenessPolicy, stats::StationStats};
use serde::Deserialize;
use utility::serde::date_time;

use crate::{
    common::{HateoasResult, RouteErrorResponse},
    hateoas,
    middleware::base_url::BaseUrl,
    WebState,
};

use super::resource;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StatsQuery {
    top: Option<usize>,
}

pub(crate) async fn get_stats<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    State(state): State<WebState<D>>,
    Query(params): Query<StatsQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<StationStats> {
    state
        .station_client
        .get_stats(params.top.unwrap_or(state.top_cities))
        .await
        .map(|stats| {
            hateoas::Response::builder(stats, base_url)
                .link("self", resource!("/stats"))
                .link("health", resource!("/health"))
                .link("stations", resource!("/stations"))
                .build()
                .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HealthQuery {
    /// Reclassify every station as of this instant instead of trusting the
    /// stored offline flags.
    #[serde(deserialize_with = "date_time::deserialize_utc_option", default)]
    at: Option<DateTime<Utc>>,
    threshold_days: Option<i64>,
}

pub(crate) async fn get_health<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    State(state): State<WebState<D>>,
    Query(params): Query<HealthQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<HealthReport> {
    let threshold = match params.threshold_days {
        Some(days) => Some(StalenessPolicy::try_new(days).ok_or_else(|| {
            RouteErrorResponse::bad_request(format!(
                "thresholdDays must lie between 0 and {}.",
                StalenessPolicy::MAX_THRESHOLD_DAYS
            ))
            .with_method(&Method::GET)
            .with_uri(original_uri.path())
        })?),
        None => None,
    };

    let mut stations = state.station_client.get_all_stations().await.map_err(|why| {
        RouteErrorResponse::from(why)
            .with_method(&Method::GET)
            .with_uri(original_uri.path())
    })?;

    if params.at.is_some() || threshold.is_some() {
        let policy = threshold.unwrap_or(state.staleness);
        let now = params.at.unwrap_or_else(Utc::now);
        for station in &mut stations {
            station.classify(&policy, now);
        }
    }

    let report = state.health.check(&stations);
    if let Some(alert) = &report.alert {
        log::warn!("{}", alert.message());
    }

    Ok(hateoas::Response::builder(report, base_url)
        .link("self", resource!("/health"))
        .link("stats", resource!("/stats"))
        .build()
        .json())
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, StatusCode, Uri};
    use charging::{
        health::{HealthPolicy, HealthReporter},
        memory::MemoryDatabase,
        server::Server,
    };
    use chrono::{Duration, TimeZone as _};
    use model::{station::Station, ExampleData as _};
    use utility::id::Id;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    /// Ten stations, the first `stale` of them last seen 40 days ago and the
    /// rest a day ago.
    async fn state(stale: usize) -> WebState<MemoryDatabase> {
        let station_client = Server::new(MemoryDatabase::new()).client("test");
        let policy = StalenessPolicy::new(30);
        let stations = (0..10)
            .map(|n| {
                let mut station = Station::example_data();
                station.id = Id::new(n.to_string());
                station.last_seen_active = Some(if n < stale {
                    now() - Duration::days(40)
                } else {
                    now() - Duration::days(1)
                });
                station.classify(&policy, now());
                station
            })
            .collect::<Vec<_>>();
        station_client.upsert_stations(&stations).await;
        WebState {
            station_client,
            staleness: policy,
            health: HealthReporter::new(HealthPolicy::new(0.1)),
            top_cities: 10,
        }
    }

    fn uri() -> OriginalUri {
        OriginalUri(Uri::from_static("/api/v1/health"))
    }

    fn base_url() -> Extension<Arc<BaseUrl>> {
        Extension(Arc::new(BaseUrl::from_headers(&HeaderMap::new())))
    }

    #[tokio::test]
    async fn stored_flags_are_used_by_default() {
        let query = HealthQuery::default();
        let report = get_health(uri(), State(state(2).await), Query(query), base_url())
            .await
            .unwrap()
            .0
            .content;
        assert_eq!(report.total, 10);
        assert_eq!(report.offline, 2);
        assert!(report.alert.is_some());
    }

    #[tokio::test]
    async fn threshold_override_reclassifies() {
        let query = HealthQuery {
            at: Some(now()),
            threshold_days: Some(60),
        };
        let report = get_health(uri(), State(state(2).await), Query(query), base_url())
            .await
            .unwrap()
            .0
            .content;
        assert_eq!(report.offline, 0);
        assert!(report.is_healthy());
    }

    #[tokio::test]
    async fn thresholds_out_of_range_are_bad_requests() {
        for days in [-1, 200_000_000_000] {
            let query = HealthQuery {
                at: None,
                threshold_days: Some(days),
            };
            let error = get_health(uri(), State(state(2).await), Query(query), base_url())
                .await
                .unwrap_err();
            assert_eq!(error.status_code, StatusCode::BAD_REQUEST);
            assert_eq!(error.requested_uri.as_deref(), Some("/api/v1/health"));
        }
    }

    #[tokio::test]
    async fn stats_honour_the_top_parameter() {
        let stats = get_stats(
            OriginalUri(Uri::from_static("/api/v1/stats")),
            State(state(1).await),
            Query(StatsQuery { top: Some(0) }),
            base_url(),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(stats.content.total, 10);
        assert_eq!(stats.content.offline, 1);
        assert!(stats.content.by_city.is_empty());
        assert_eq!(stats.links[0].hypertext_reference, "http://localhost/api/v1/stats");
    }
}

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::Method,
    routing::{get, on},
    Extension, Router,
};
use charging::{client::StationFilter, database::Database};
use model::{station::Station, WithDistance};
use serde::Deserialize;
use utility::{id::Id, let_also::LetAlso};

use crate::{
    common::{
        route_not_found, schema, HateoasResult, RouteErrorResponse, VecResponse,
        METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/stations{}", format_args!($($arg)*))
    };
}

const DEFAULT_RADIUS_KM: f64 = 5.0;

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/schema", get(schema::<Station>))
        .route("/nearby", get(nearby::<D>))
        .route("/:id", get(get_station::<D>))
        .route("/", get(get_stations::<D>))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StationsQuery {
    offline: Option<bool>,
    operator: Option<String>,
    city: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    radius: Option<f64>,
}

impl StationsQuery {
    fn filter(self) -> Result<StationFilter, RouteErrorResponse> {
        let near = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some((
                latitude,
                longitude,
                self.radius.unwrap_or(DEFAULT_RADIUS_KM),
            )),
            (None, None) => None,
            _ => {
                return Err(RouteErrorResponse::bad_request(
                    "latitude and longitude must be given together.",
                ))
            }
        };
        Ok(StationFilter {
            offline: self.offline,
            operator: self.operator,
            city: self.city,
            near,
        })
    }
}

pub(crate) async fn get_stations<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { station_client, .. }): State<WebState<D>>,
    Query(params): Query<StationsQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<Station>>> {
    let filter = params
        .filter()
        .map_err(|why| why.with_method(&Method::GET).with_uri(original_uri.path()))?;
    station_client
        .get_stations(&filter)
        .await
        .map(|stations| {
            stations
                .into_iter()
                .map(|station| station_hateoas(station, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::new(data).hateoas().json())
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

pub(crate) async fn get_station<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { station_client, .. }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<Station> {
    station_client
        .get_station(&Id::new(id))
        .await
        .map(|station| station_hateoas(station, base_url).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

#[derive(Debug, Deserialize)]
pub(crate) struct NearbyQuery {
    latitude: f64,
    longitude: f64,
    radius: Option<f64>,
}

pub(crate) async fn nearby<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { station_client, .. }): State<WebState<D>>,
    Query(params): Query<NearbyQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<WithDistance<Station>>>> {
    station_client
        .get_nearby_stations(
            params.latitude,
            params.longitude,
            params.radius.unwrap_or(DEFAULT_RADIUS_KM),
        )
        .await
        .map(|stations| {
            stations
                .into_iter()
                .map(|station| station_with_distance_hateoas(station, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::new(data).hateoas().json())
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

fn station_hateoas(station: Station, base_url: Arc<BaseUrl>) -> hateoas::Response<Station> {
    let id = station.id.clone();
    let latitude = station.latitude;
    let longitude = station.longitude;
    let days_since_seen = station.days_since_seen();
    hateoas::Response::builder(station, base_url)
        .link("self", resource!("/{}", id))
        .link(
            "nearby",
            resource!("/nearby?latitude={}&longitude={}", latitude, longitude),
        )
        .debug_info("daysSinceSeen", days_since_seen)
        .build()
}

fn station_with_distance_hateoas(
    station: WithDistance<Station>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithDistance<Station>> {
    let id = station.content.id.clone();
    hateoas::Response::builder(station, base_url)
        .link("self", resource!("/{}", id))
        .build()
}

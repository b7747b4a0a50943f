pub use crate::common::RouteResult;

use std::net::SocketAddr;

use axum::Router;
use charging::{client::Client, database::Database, health::HealthReporter};
use model::station::StalenessPolicy;
use tokio::net::TcpListener;

pub mod api;
pub mod cli;
pub mod common;
pub mod hateoas;
pub mod middleware;

#[derive(Clone)]
pub struct WebState<D: Database> {
    pub station_client: Client<D>,
    pub staleness: StalenessPolicy,
    pub health: HealthReporter,
    pub top_cities: usize,
}

pub async fn start_web_server<D: Database>(
    state: WebState<D>,
    address: SocketAddr,
) -> std::io::Result<()> {
    let routes = Router::new().nest_service("/api", api::routes(state));

    let listener = TcpListener::bind(address).await?;
    log::info!("serving the station api on http://{address}/api");
    axum::serve(listener, routes.into_make_service()).await?;

    Ok(())
}

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use charging::{
    client::Client,
    collector::{Collector, Continuation},
    database::Database,
    geocoding::Geocoder,
    health::HealthMonitor,
    pipeline::{Pipeline, PipelineError},
    source::StationSource,
};

/// Runs a full pipeline pass per tick, followed by a health check when a
/// monitor is attached.
pub struct PipelineCollector<S, G> {
    pipeline: Arc<Pipeline<S, G>>,
    monitor: Option<Arc<HealthMonitor>>,
    tick: Duration,
}

impl<S, G> PipelineCollector<S, G> {
    pub const DEFAULT_TICK: Duration = Duration::from_secs(60 * 60 * 24);

    pub fn new(pipeline: Arc<Pipeline<S, G>>) -> Self {
        Self {
            pipeline,
            monitor: None,
            tick: Self::DEFAULT_TICK,
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<HealthMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

#[async_trait]
impl<S, G> Collector for PipelineCollector<S, G>
where
    S: StationSource + 'static,
    G: Geocoder + 'static,
{
    type Error = PipelineError;

    fn unique_id() -> &'static str {
        "Open Charge Map Pipeline"
    }

    async fn run<D: Database>(&mut self, client: &Client<D>) -> Result<Continuation, Self::Error> {
        self.pipeline.run(client, chrono::Utc::now()).await?;
        if let Some(monitor) = &self.monitor {
            if let Err(why) = monitor.check(client).await {
                log::error!("health check failed: {why}");
            }
        }
        Ok(Continuation::Continue)
    }

    fn tick(&self) -> Option<Duration> {
        Some(self.tick)
    }
}

#[cfg(test)]
mod tests {
    use charging::{
        enrichment::Enricher,
        geocoding::GeocodeError,
        health::HealthReporter,
        memory::MemoryDatabase,
        server::Server,
        source::StaticSource,
    };
    use model::{
        raw::{self, RawStation},
        station::StalenessPolicy,
    };

    use super::*;

    struct FixedGeocoder;

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn reverse(&self, _: f64, _: f64) -> Result<String, GeocodeError> {
            Ok("Shenzhen".to_owned())
        }
    }

    #[tokio::test]
    async fn each_run_upserts_and_continues() {
        let database = MemoryDatabase::new();
        let client = Server::new(database.clone()).client("test");
        let source = StaticSource::new(vec![RawStation::new()
            .with(raw::ID, 9)
            .with(raw::LATITUDE, 22.54)
            .with(raw::LONGITUDE, 114.05)]);
        let pipeline = Pipeline::new(
            source,
            Enricher::new(FixedGeocoder, StalenessPolicy::default()),
        );
        let mut collector = PipelineCollector::new(Arc::new(pipeline))
            .with_monitor(Arc::new(HealthMonitor::new(HealthReporter::default())));

        assert_eq!(collector.run(&client).await.unwrap(), Continuation::Continue);
        assert_eq!(collector.run(&client).await.unwrap(), Continuation::Continue);
        assert_eq!(database.len().await, 1);
        assert_eq!(
            collector.tick(),
            Some(PipelineCollector::<StaticSource, FixedGeocoder>::DEFAULT_TICK)
        );
    }
}

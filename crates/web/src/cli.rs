//! Command line surface of the `charging-stations` binary.

use std::{
    error::Error,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use charging::{
    config::PipelineConfig,
    geocoding::{CachedGeocoder, Geocoder, NullGeocoder},
    health::{HealthMonitor, HealthPolicy, HealthReporter, LogAlertSink, WebhookAlertSink},
    pipeline::Pipeline,
    source::{StaticSource, StationSource},
};
use clap::{Args, Parser, Subcommand};
use model::{raw::RawStation, station::StalenessPolicy};
use nominatim::NominatimGeocoder;
use openchargemap::{OpenChargeMapClient, OpenChargeMapCredentials};

const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 8080);
const DEFAULT_EVERY_HOURS: u64 = 24;

#[derive(Debug, Parser)]
#[clap(name = "charging-stations", version)]
pub struct Application {
    /// Keep everything in memory instead of writing to Postgres. Nothing
    /// survives the process.
    #[clap(long, global = true)]
    pub dry_run: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract, normalize, enrich and store the stations once.
    Run(PipelineArgs),
    /// Run the pipeline periodically until interrupted.
    Schedule(ScheduleArgs),
    /// Report the share of offline stations. Exits with status 2 on alert.
    Check(CheckArgs),
    /// Serve the read api.
    Serve(ServeArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct PipelineArgs {
    /// Read raw station records from a JSON array instead of Open Charge Map.
    #[clap(long)]
    pub input: Option<PathBuf>,

    /// Leave every city as "Unknown" instead of reverse geocoding.
    #[clap(long)]
    pub skip_geocoding: bool,

    /// Days without confirmed activity after which a station is offline.
    #[clap(long, value_parser = clap::value_parser!(i64).range(0..=StalenessPolicy::MAX_THRESHOLD_DAYS))]
    pub offline_threshold_days: Option<i64>,

    /// Share of offline stations above which an alert is raised.
    #[clap(long, value_parser = parse_ratio)]
    pub alert_ratio: Option<f64>,

    /// JSON file to persist reverse geocoding results in.
    #[clap(long)]
    pub geocode_cache: Option<PathBuf>,

    /// Timeout of a single reverse geocoding lookup, in seconds.
    #[clap(long)]
    pub geocode_timeout_secs: Option<u64>,

    /// Stop after this many Open Charge Map pages.
    #[clap(long)]
    pub max_pages: Option<usize>,

    /// ISO country code to extract stations for.
    #[clap(long)]
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ScheduleArgs {
    #[clap(flatten)]
    pub pipeline: PipelineArgs,

    /// Run the pipeline at this interval, in hours.
    #[clap(long, default_value_t = DEFAULT_EVERY_HOURS, value_parser = clap::value_parser!(u64).range(1..))]
    pub every_hours: u64,
}

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Share of offline stations above which an alert is raised.
    #[clap(long, value_parser = parse_ratio)]
    pub alert_ratio: Option<f64>,

    /// Also POST the alert as JSON to this url.
    #[clap(long)]
    pub webhook: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address to bind the api to.
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    pub bind: SocketAddr,

    /// Run the pipeline in the background while serving.
    #[clap(long)]
    pub schedule: bool,

    #[clap(flatten)]
    pub scheduled: ScheduleArgs,
}

impl ScheduleArgs {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.every_hours.max(1).saturating_mul(60 * 60))
    }
}

fn parse_ratio(value: &str) -> Result<f64, String> {
    let ratio = value.parse::<f64>().map_err(|why| why.to_string())?;
    HealthPolicy::try_new(ratio)
        .map(|_| ratio)
        .ok_or_else(|| format!("{value} is not a share between 0 and 1"))
}

/// The pipeline assembled from the command line.
pub type CliPipeline = Pipeline<Arc<dyn StationSource>, Box<dyn Geocoder>>;

impl CheckArgs {
    pub fn config(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(alert_ratio) = self.alert_ratio {
            config.health = HealthPolicy::new(alert_ratio);
        }
        if let Some(webhook) = &self.webhook {
            config.alert_webhook = Some(webhook.clone());
        }
        config
    }
}

impl PipelineArgs {
    /// Applies the flags given on the command line over `config`.
    pub fn config(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(days) = self.offline_threshold_days {
            config.staleness = StalenessPolicy::new(days);
        }
        if let Some(alert_ratio) = self.alert_ratio {
            config.health = HealthPolicy::new(alert_ratio);
        }
        if let Some(path) = &self.geocode_cache {
            config.geocode_cache = Some(path.clone());
        }
        if let Some(secs) = self.geocode_timeout_secs {
            config.geocode_timeout = Duration::from_secs(secs);
        }
        config
    }

    pub fn credentials(
        &self,
        mut credentials: OpenChargeMapCredentials,
    ) -> OpenChargeMapCredentials {
        if let Some(max_pages) = self.max_pages {
            credentials.max_pages = Some(max_pages);
        }
        if let Some(country_code) = &self.country_code {
            credentials.country_code = country_code.clone();
        }
        credentials
    }

    pub async fn source(&self) -> Result<Arc<dyn StationSource>, Box<dyn Error>> {
        match &self.input {
            Some(path) => Ok(Arc::new(read_records(path).await?)),
            None => {
                let credentials = self.credentials(OpenChargeMapCredentials::env()?);
                if credentials.api_key.is_none() {
                    log::warn!("OCM_API_KEY is not set, requests may be rate limited");
                }
                Ok(Arc::new(OpenChargeMapClient::new(&credentials)?))
            }
        }
    }

    pub async fn geocoder(
        &self,
        config: &PipelineConfig,
    ) -> Result<Box<dyn Geocoder>, Box<dyn Error>> {
        if self.skip_geocoding {
            return Ok(Box::new(NullGeocoder));
        }
        let nominatim = NominatimGeocoder::new()?;
        match &config.geocode_cache {
            Some(path) => Ok(Box::new(CachedGeocoder::with_file(nominatim, path).await?)),
            None => Ok(Box::new(CachedGeocoder::new(nominatim))),
        }
    }

    pub async fn pipeline(&self, config: &PipelineConfig) -> Result<CliPipeline, Box<dyn Error>> {
        let source = self.source().await?;
        let geocoder = self.geocoder(config).await?;
        Ok(Pipeline::new(source, config.enricher(geocoder)))
    }
}

/// Alerts always go to the log, and to the webhook when one is configured.
pub fn monitor(config: &PipelineConfig) -> HealthMonitor {
    let monitor = HealthMonitor::new(HealthReporter::new(config.health)).with_sink(LogAlertSink);
    match &config.alert_webhook {
        Some(url) => monitor.with_sink(WebhookAlertSink::new(url.clone())),
        None => monitor,
    }
}

async fn read_records(path: &Path) -> Result<StaticSource, Box<dyn Error>> {
    let bytes = tokio::fs::read(path).await?;
    let records: Vec<RawStation> = serde_json::from_slice(&bytes)?;
    log::info!("read {} raw records from {}", records.len(), path.display());
    Ok(StaticSource::new(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_run_with_overrides() {
        let application = Application::try_parse_from([
            "charging-stations",
            "run",
            "--dry-run",
            "--skip-geocoding",
            "--offline-threshold-days",
            "30",
            "--country-code",
            "DE",
        ])
        .unwrap();
        assert!(application.dry_run);

        let Command::Run(args) = application.command else {
            panic!("expected the run command");
        };
        assert!(args.skip_geocoding);

        let config = args.config(PipelineConfig::default());
        assert_eq!(config.staleness, StalenessPolicy::new(30));
        assert_eq!(config.health, HealthPolicy::default());

        let credentials = args.credentials(OpenChargeMapCredentials::default());
        assert_eq!(credentials.country_code, "DE");
        assert_eq!(credentials.max_pages, None);
    }

    #[test]
    fn serve_defaults() {
        let application = Application::try_parse_from(["charging-stations", "serve"]).unwrap();
        let Command::Serve(args) = application.command else {
            panic!("expected the serve command");
        };
        assert_eq!(args.bind, SocketAddr::from(DEFAULT_BIND_ADDR));
        assert!(!args.schedule);
        assert_eq!(args.scheduled.tick(), Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn check_takes_a_webhook() {
        let application = Application::try_parse_from([
            "charging-stations",
            "check",
            "--webhook",
            "https://hooks.example.org/ev",
            "--alert-ratio",
            "0.25",
        ])
        .unwrap();
        let Command::Check(args) = application.command else {
            panic!("expected the check command");
        };
        let config = args.config(PipelineConfig::default());
        assert_eq!(
            config.alert_webhook.as_deref(),
            Some("https://hooks.example.org/ev")
        );
        assert_eq!(config.health, HealthPolicy::new(0.25));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let rejected = [
            ["run", "--offline-threshold-days", "-5"],
            ["run", "--offline-threshold-days", "200000000000"],
            ["run", "--alert-ratio", "NaN"],
            ["check", "--alert-ratio", "1.5"],
            ["schedule", "--every-hours", "0"],
        ];
        for args in rejected {
            let parsed =
                Application::try_parse_from(std::iter::once("charging-stations").chain(args));
            assert!(parsed.is_err(), "{args:?} was accepted");
        }
    }

    #[test]
    fn reports_the_package_version() {
        let error = Application::try_parse_from(["charging-stations", "--version"]).unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::DisplayVersion);
        assert!(error.to_string().contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn huge_intervals_saturate() {
        let args = ScheduleArgs {
            pipeline: PipelineArgs::default(),
            every_hours: u64::MAX,
        };
        assert_eq!(args.tick(), Duration::from_secs(u64::MAX));
    }

    #[tokio::test]
    async fn input_file_becomes_a_static_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stations.json");
        tokio::fs::write(
            &path,
            br#"[{"id": 1, "latitude": 31.2, "longitude": 121.4}, {"id": "2"}]"#,
        )
        .await
        .unwrap();

        let args = PipelineArgs {
            input: Some(path),
            ..Default::default()
        };
        let records = args.source().await.unwrap().fetch().await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn skipping_geocoding_resolves_nothing() {
        let args = PipelineArgs {
            skip_geocoding: true,
            ..Default::default()
        };
        let geocoder = args.geocoder(&PipelineConfig::default()).await.unwrap();
        assert!(geocoder.reverse(31.2, 121.4).await.is_err());
    }
}

use std::{env, error, fmt, path::PathBuf, str::FromStr, time::Duration};

use model::station::StalenessPolicy;

use crate::{enrichment::Enricher, geocoding::Geocoder, health::HealthPolicy};

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    pub variable: &'static str,
    pub value: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid value for {}: '{}'", self.variable, self.value)
    }
}

impl error::Error for ConfigError {}

/// Settings of a pipeline run. Built once at start-up and passed down.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub staleness: StalenessPolicy,
    pub health: HealthPolicy,
    pub geocode_timeout: Duration,
    pub geocode_cache: Option<PathBuf>,
    pub alert_webhook: Option<String>,
    pub top_cities: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            staleness: StalenessPolicy::default(),
            health: HealthPolicy::default(),
            geocode_timeout: Duration::from_secs(10),
            geocode_cache: None,
            alert_webhook: None,
            top_cities: 10,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `lookup`; unset variables keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let offline_threshold_days = parse_or(
            &lookup,
            "OFFLINE_THRESHOLD_DAYS",
            defaults.staleness.offline_threshold_days,
        )?;
        let staleness =
            StalenessPolicy::try_new(offline_threshold_days).ok_or_else(|| ConfigError {
                variable: "OFFLINE_THRESHOLD_DAYS",
                value: offline_threshold_days.to_string(),
            })?;
        let alert_ratio = parse_or(&lookup, "ALERT_RATIO", defaults.health.alert_ratio)?;
        let health = HealthPolicy::try_new(alert_ratio).ok_or_else(|| ConfigError {
            variable: "ALERT_RATIO",
            value: alert_ratio.to_string(),
        })?;
        let geocode_timeout_secs = parse_or(
            &lookup,
            "GEOCODE_TIMEOUT_SECS",
            defaults.geocode_timeout.as_secs(),
        )?;

        Ok(Self {
            staleness,
            health,
            geocode_timeout: Duration::from_secs(geocode_timeout_secs),
            geocode_cache: lookup("GEOCODE_CACHE")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            alert_webhook: lookup("ALERT_WEBHOOK").filter(|s| !s.is_empty()),
            top_cities: parse_or(&lookup, "TOP_CITIES", defaults.top_cities)?,
        })
    }

    pub fn enricher<G: Geocoder>(&self, geocoder: G) -> Enricher<G> {
        Enricher::new(geocoder, self.staleness).with_timeout(self.geocode_timeout)
    }
}

fn parse_or<F, T>(lookup: &F, variable: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(variable) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError { variable, value }),
    }
}

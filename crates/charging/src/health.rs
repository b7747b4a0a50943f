use std::{error, fmt, sync::Arc};

use async_trait::async_trait;
use model::{
    health::{Alert, HealthReport, OfflineStation},
    station::Station,
};

use crate::{client::Client, database::Database, RequestResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthPolicy {
    /// Share of offline stations above which an alert is raised.
    pub alert_ratio: f64,
}

impl HealthPolicy {
    pub const DEFAULT_ALERT_RATIO: f64 = 0.10;

    pub fn new(alert_ratio: f64) -> Self {
        Self { alert_ratio }
    }

    /// Returns `None` unless the ratio lies in `[0, 1]`. NaN is rejected.
    pub fn try_new(alert_ratio: f64) -> Option<Self> {
        (0.0..=1.0)
            .contains(&alert_ratio)
            .then(|| Self::new(alert_ratio))
    }
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ALERT_RATIO)
    }
}

/// Computes the offline ratio over the stored stations. Stateless: every
/// check stands on its own.
#[derive(Debug, Clone, Default)]
pub struct HealthReporter {
    policy: HealthPolicy,
}

impl HealthReporter {
    pub fn new(policy: HealthPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    pub fn check(&self, stations: &[Station]) -> HealthReport {
        let total = stations.len() as u64;
        let offline = stations
            .iter()
            .filter(|station| station.is_offline)
            .collect::<Vec<_>>();
        let offline_ratio = if total == 0 {
            0.0
        } else {
            offline.len() as f64 / total as f64
        };

        let alert = (offline_ratio > self.policy.alert_ratio).then(|| Alert {
            offline_ratio,
            threshold: self.policy.alert_ratio,
            total,
            stations: offline.iter().map(|s| OfflineStation::from(*s)).collect(),
        });

        HealthReport {
            total,
            offline: offline.len() as u64,
            offline_ratio,
            threshold: self.policy.alert_ratio,
            alert,
        }
    }

    pub async fn check_store<D: Database>(
        &self,
        client: &Client<D>,
    ) -> RequestResult<HealthReport> {
        let stations = client.get_all_stations().await?;
        Ok(self.check(&stations))
    }
}

#[derive(Debug, Clone)]
pub enum AlertError {
    Request(Arc<reqwest::Error>),
    Rejected {
        status_code: reqwest::StatusCode,
        url: String,
    },
}

impl error::Error for AlertError {}

impl fmt::Display for AlertError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Request(e) => write!(f, "HTTP request error: {}", e),
            Self::Rejected { status_code, url } => {
                write!(f, "alert rejected ({}) by {}", status_code, url)
            }
        }
    }
}

impl From<reqwest::Error> for AlertError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(Arc::new(e))
    }
}

/// Somewhere an alert can be sent. Delivery is attempted once.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// Writes alerts to the log.
#[derive(Debug, Clone, Default)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        log::warn!("ALERT: {}", alert.message());
        for station in &alert.stations {
            log::warn!(
                "  offline: {} ({}, {})",
                station.id,
                station.operator_name,
                station.city
            );
        }
        Ok(())
    }
}

/// POSTs alerts as JSON to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookAlertSink {
    url: String,
    client: reqwest::Client,
}

impl WebhookAlertSink {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        let response = self.client.post(&self.url).json(alert).send().await?;
        if !response.status().is_success() {
            return Err(AlertError::Rejected {
                status_code: response.status(),
                url: self.url.clone(),
            });
        }
        Ok(())
    }
}

/// Runs the reporter over the store and hands an alert to every sink.
pub struct HealthMonitor {
    reporter: HealthReporter,
    sinks: Vec<Box<dyn AlertSink>>,
}

impl HealthMonitor {
    pub fn new(reporter: HealthReporter) -> Self {
        Self {
            reporter,
            sinks: Vec::new(),
        }
    }

    pub fn with_sink<S: AlertSink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Returns the report along with the sink failures, if any. A failing
    /// sink does not keep the others from being tried.
    pub async fn check<D: Database>(
        &self,
        client: &Client<D>,
    ) -> RequestResult<(HealthReport, Vec<AlertError>)> {
        let report = self.reporter.check_store(client).await?;
        log::info!(
            "{}/{} stations offline ({:.1}%)",
            report.offline,
            report.total,
            report.offline_ratio * 100.0
        );

        let mut failures = Vec::new();
        if let Some(alert) = &report.alert {
            for sink in &self.sinks {
                if let Err(why) = sink.deliver(alert).await {
                    log::error!("failed to deliver alert: {why}");
                    failures.push(why);
                }
            }
        }
        Ok((report, failures))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use model::ExampleData as _;
    use utility::id::Id;

    use super::*;
    use crate::memory::MemoryDatabase;

    fn stations(total: usize, offline: usize) -> Vec<Station> {
        (0..total)
            .map(|i| {
                let mut station = Station::example_data();
                station.id = Id::new(format!("{i:03}"));
                station.is_offline = i < offline;
                station
            })
            .collect()
    }

    #[test]
    fn alerts_only_strictly_above_the_ratio() {
        let reporter = HealthReporter::default();

        let eleven = reporter.check(&stations(100, 11));
        let alert = eleven.alert.expect("11/100 should alert");
        assert_eq!(alert.stations.len(), 11);
        assert_eq!(alert.total, 100);
        assert!((eleven.offline_ratio - 0.11).abs() < 1e-9);

        let ten = reporter.check(&stations(100, 10));
        assert!(ten.is_healthy());
        assert_eq!(ten.offline, 10);
    }

    #[test]
    fn ratio_must_be_a_share() {
        assert_eq!(HealthPolicy::try_new(0.25), Some(HealthPolicy::new(0.25)));
        assert_eq!(HealthPolicy::try_new(1.5), None);
        assert_eq!(HealthPolicy::try_new(-0.1), None);
        assert_eq!(HealthPolicy::try_new(f64::NAN), None);
    }

    #[test]
    fn empty_store_is_healthy() {
        let report = HealthReporter::default().check(&[]);
        assert_eq!(report.offline_ratio, 0.0);
        assert!(report.is_healthy());
    }

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<Alert>>,
    }

    #[async_trait]
    impl AlertSink for Arc<RecordingSink> {
        async fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
            self.delivered.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn monitor_delivers_to_every_sink() {
        let client = Client::new("test", MemoryDatabase::new());
        client.upsert_stations(&stations(4, 1)).await;

        let recording = Arc::new(RecordingSink::default());
        let monitor = HealthMonitor::new(HealthReporter::default())
            .with_sink(LogAlertSink)
            .with_sink(recording.clone());

        let (report, failures) = monitor.check(&client).await.unwrap();
        assert!(!report.is_healthy());
        assert!(failures.is_empty());
        assert_eq!(recording.delivered.lock().unwrap().len(), 1);
    }
}

//! One extract, normalize, enrich, upsert pass.

use std::{error, fmt};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    client::Client,
    database::Database,
    enrichment::Enricher,
    geocoding::Geocoder,
    normalizer,
    source::{ExtractionError, StationSource},
};

/// Counts describing one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub extracted: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub enriched_with_fallback: usize,
    pub persisted: usize,
    pub failed_to_persist: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "extracted {}, duplicates {}, skipped {}, city fallbacks {}, persisted {}, failed {}",
            self.extracted,
            self.duplicates,
            self.skipped,
            self.enriched_with_fallback,
            self.persisted,
            self.failed_to_persist
        )
    }
}

#[derive(Debug, Clone)]
pub enum PipelineError {
    Extraction(ExtractionError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extraction(why) => write!(f, "extraction failed: {why}"),
        }
    }
}

impl error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Extraction(why) => Some(why),
        }
    }
}

impl From<ExtractionError> for PipelineError {
    fn from(value: ExtractionError) -> Self {
        Self::Extraction(value)
    }
}

pub struct Pipeline<S, G> {
    source: S,
    enricher: Enricher<G>,
}

impl<S, G> Pipeline<S, G>
where
    S: StationSource,
    G: Geocoder,
{
    pub fn new(source: S, enricher: Enricher<G>) -> Self {
        Self { source, enricher }
    }

    /// Runs the stages strictly in order. Only a failed extraction aborts
    /// the run, and then nothing has been written.
    pub async fn run<D: Database>(
        &self,
        client: &Client<D>,
        now: DateTime<Utc>,
    ) -> Result<RunSummary, PipelineError> {
        log::info!("[{}] extracting from {}", client.id(), self.source.name());
        let batch = self.source.fetch().await?;
        let extracted = batch.len();

        let normalized = normalizer::normalize(batch);
        log::info!(
            "[{}] {} valid stations ({} skipped, {} duplicates)",
            client.id(),
            normalized.stations.len(),
            normalized.skipped,
            normalized.duplicates
        );

        let enriched = self.enricher.enrich(normalized.stations, now).await;
        let outcome = client.upsert_stations(&enriched.stations).await;

        let summary = RunSummary {
            extracted,
            duplicates: normalized.duplicates,
            skipped: normalized.skipped,
            enriched_with_fallback: enriched.fallbacks,
            persisted: outcome.persisted,
            failed_to_persist: outcome.failed,
        };
        log::info!("[{}] run finished: {summary}", client.id());
        Ok(summary)
    }
}

use std::{error, fmt, sync::Arc};

use async_trait::async_trait;
use model::raw::RawStation;

/// Failure to obtain a batch from a source. Always fatal to the run, a
/// partial batch is never returned.
#[derive(Debug, Clone)]
pub enum ExtractionError {
    Request(Arc<reqwest::Error>),
    InvalidResponse {
        status_code: reqwest::StatusCode,
        url: String,
        response: Option<String>,
    },
    Malformed(Arc<serde_json::Error>),
    RateLimitReached,
    Timeout,
    Other(String),
}

impl error::Error for ExtractionError {}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Request(e) => write!(f, "HTTP request error: {}", e),
            Self::InvalidResponse {
                status_code,
                url,
                response,
            } => match response {
                Some(text) => {
                    write!(f, "Invalid Response ({}) {}: {}", status_code, text, url)
                }
                None => write!(f, "Invalid Response ({}) {}", status_code, url),
            },
            Self::Malformed(e) => write!(f, "JSON parse error: {}", e),
            Self::RateLimitReached => write!(f, "Rate limit reached."),
            Self::Timeout => write!(f, "Request timed out."),
            Self::Other(e) => write!(f, "{e}"),
        }
    }
}

impl From<reqwest::Error> for ExtractionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(Arc::new(e))
        }
    }
}

impl From<serde_json::Error> for ExtractionError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(Arc::new(e))
    }
}

/// Anything that can deliver a batch of untyped station records.
#[async_trait]
pub trait StationSource: Send + Sync {
    /// Name used in log output.
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<RawStation>, ExtractionError>;
}

#[async_trait]
impl<S> StationSource for Arc<S>
where
    S: StationSource + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch(&self) -> Result<Vec<RawStation>, ExtractionError> {
        (**self).fetch().await
    }
}

/// A source that always returns the same batch.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub records: Vec<RawStation>,
}

impl StaticSource {
    pub fn new(records: Vec<RawStation>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl StationSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self) -> Result<Vec<RawStation>, ExtractionError> {
        Ok(self.records.clone())
    }
}

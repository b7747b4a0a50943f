use std::{env, time::Duration};

use async_trait::async_trait;
use charging::{
    config::ConfigError,
    source::{ExtractionError, StationSource},
};
use model::raw::RawStation;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::poi::Poi;

pub const OPEN_CHARGE_MAP_URL: &str = "https://api.openchargemap.io/v3/poi/";
pub const USER_AGENT: &str = concat!("charging-stations/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenChargeMapCredentials {
    pub api_key: Option<String>,
    pub country_code: String,
    pub max_pages: Option<usize>,
}

impl Default for OpenChargeMapCredentials {
    fn default() -> Self {
        Self {
            api_key: None,
            country_code: "CN".to_owned(),
            max_pages: None,
        }
    }
}

impl OpenChargeMapCredentials {
    pub fn env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_pages = match env::var("OCM_MAX_PAGES") {
            Ok(value) => Some(value.trim().parse().map_err(|_| ConfigError {
                variable: "OCM_MAX_PAGES",
                value,
            })?),
            Err(_) => None,
        };
        Ok(Self {
            api_key: env::var("OCM_API_KEY").ok().filter(|key| !key.is_empty()),
            country_code: env::var("OCM_COUNTRY_CODE").unwrap_or(defaults.country_code),
            max_pages,
        })
    }
}

/// Position in the paginated result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub page: usize,
    pub skip: usize,
    pub page_size: usize,
    pub max_pages: Option<usize>,
}

impl PageCursor {
    pub fn new(page_size: usize, max_pages: Option<usize>) -> Self {
        Self {
            page: 0,
            skip: 0,
            page_size,
            max_pages,
        }
    }

    /// Records a page of `received` results. Returns whether another page
    /// should be requested.
    pub fn advance(&mut self, received: usize) -> bool {
        self.page += 1;
        self.skip += self.page_size;
        let exhausted = received < self.page_size;
        let limited = self.max_pages.is_some_and(|max| self.page >= max);
        !exhausted && !limited
    }
}

pub struct OpenChargeMapClient {
    pub credentials: OpenChargeMapCredentials,
    pub base_url: String,
    pub page_size: usize,
    pub page_delay: Duration,
    client: reqwest::Client,
}

impl OpenChargeMapClient {
    pub const PAGE_SIZE: usize = 500;
    pub const PAGE_DELAY: Duration = Duration::from_secs(1);
    pub const TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(credentials: &OpenChargeMapCredentials) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Self::TIMEOUT)
            .build()?;
        Ok(Self {
            credentials: credentials.clone(),
            base_url: OPEN_CHARGE_MAP_URL.to_owned(),
            page_size: Self::PAGE_SIZE,
            page_delay: Self::PAGE_DELAY,
            client,
        })
    }

    fn query(&self, skip: usize) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("output", "json".to_owned()),
            ("countrycode", self.credentials.country_code.clone()),
            ("maxresults", self.page_size.to_string()),
            // the compact form drops OperatorInfo
            ("compact", "false".to_owned()),
            ("verbose", "false".to_owned()),
            ("skip", skip.to_string()),
        ];
        if let Some(key) = &self.credentials.api_key {
            query.push(("key", key.clone()));
        }
        query
    }

    /// Fetch a single page of points of interest.
    pub async fn get_page(&self, skip: usize) -> Result<Vec<Poi>, ExtractionError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&self.query(skip))
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let text = response.text().await?;
                if text.trim().is_empty() {
                    return Ok(Vec::new());
                }
                Ok(serde_json::from_str(&text)?)
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => Err(ExtractionError::RateLimitReached),
            other => Err(ExtractionError::InvalidResponse {
                status_code: other,
                url: self.base_url.clone(),
                response: response.text().await.ok(),
            }),
        }
    }
}

#[async_trait]
impl StationSource for OpenChargeMapClient {
    fn name(&self) -> &str {
        "Open Charge Map"
    }

    async fn fetch(&self) -> Result<Vec<RawStation>, ExtractionError> {
        let mut stations = Vec::new();
        let mut cursor = PageCursor::new(self.page_size, self.credentials.max_pages);
        loop {
            log::info!("fetching page {} (offset {})", cursor.page + 1, cursor.skip);
            let page = self.get_page(cursor.skip).await?;
            let received = page.len();
            stations.extend(page.into_iter().map(Poi::into_raw));
            if !cursor.advance(received) {
                break;
            }
            sleep(self.page_delay).await;
        }
        log::info!("fetched {} stations in {} pages", stations.len(), cursor.page);
        Ok(stations)
    }
}

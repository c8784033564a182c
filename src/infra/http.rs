//! HTTP client for the list-form content read endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::{Client, Url};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::application::repos::{ContentSource, StoreError};

use super::error::InfraError;

const CONTENT_PATH: &str = "api/content";

/// Reads `GET {base}/api/content?page=..&section=..` with every cache layer
/// between here and the store defeated.
#[derive(Clone, Debug)]
pub struct HttpContentClient {
    client: Client,
    base: Url,
}

impl HttpContentClient {
    pub fn new(base: &str, connect_timeout: Duration) -> Result<Self, InfraError> {
        let base = Url::parse(base)
            .and_then(|url| url.join("/"))
            .map_err(|err| InfraError::configuration(format!("invalid content base url: {err}")))?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("tidecast/", env!("CARGO_PKG_VERSION"))
    }

    /// Endpoint URL with a fresh pair of cache-busting parameters.
    pub fn content_url(&self, page: &str, section: Option<&str>) -> Result<Url, StoreError> {
        let mut url = self.base.join(CONTENT_PATH).map_err(StoreError::unavailable)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page", page);
            if let Some(section) = section {
                query.append_pair("section", section);
            }
            let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
            query.append_pair("_t", &millis.to_string());
            query.append_pair("_r", &Uuid::new_v4().simple().to_string());
        }
        Ok(url)
    }
}

#[async_trait]
impl ContentSource for HttpContentClient {
    async fn fetch_page(&self, page: &str, section: Option<&str>) -> Result<Value, StoreError> {
        let url = self.content_url(page, section)?;
        debug!(%url, "Fetching page content");

        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-store, no-cache, must-revalidate")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(StoreError::unavailable)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(StoreError::unavailable)?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            return Err(StoreError::Unavailable(format!("status {status} body {text}")));
        }

        serde_json::from_slice(&bytes).map_err(StoreError::decode)
    }
}

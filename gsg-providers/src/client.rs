//! GSG HTTP Client
//!
//! Pure HTTP client for the public stream feed and the current-event service.

use std::time::Duration;

use reqwest::{Client, header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE}};
use url::Url;

use crate::error::{check_response, json_with_limit, ProviderClientError};
use crate::types::{CurrentEvent, FeedResponse, StreamRecord};

const PUBLIC_STREAM_ENDPOINT: &str = "public/stream";
const CURRENT_EVENT_ENDPOINT: &str = "event/current";

/// GSG HTTP Client
///
/// Provides methods for the unauthenticated public endpoints:
/// - Live stream feed (`/public/stream`)
/// - Current event schedule (`/event/current`)
#[derive(Debug, Clone)]
pub struct GsgClient {
    base_url: Url,
    event_base_url: Url,
    client: Client,
}

impl GsgClient {
    /// Create a client for `base_url`, reading events from the same host.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderClientError> {
        Self::with_event_base(base_url, base_url, timeout)
    }

    /// Create a client whose event schedule lives on a separate service.
    pub fn with_event_base(
        base_url: &str,
        event_base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .default_headers(Self::default_headers())
            .build()
            .map_err(|e| ProviderClientError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            base_url: normalize_base(base_url)?,
            event_base_url: normalize_base(event_base_url)?,
            client,
        })
    }

    /// Get the stream feed base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Get the event service base URL
    #[must_use]
    pub fn event_base_url(&self) -> &str {
        self.event_base_url.as_str()
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Fetch the live stream feed.
    ///
    /// Fails on any status other than `200 OK`, on undecodable JSON, and on
    /// envelopes missing `count` or `data`.
    pub async fn public_streams(&self) -> Result<Vec<StreamRecord>, ProviderClientError> {
        let url = self.base_url.join(PUBLIC_STREAM_ENDPOINT)?;
        tracing::debug!(url = %url, "Fetching public stream feed");

        let response = self.client.get(url).send().await?;
        let response = check_response(response)?;
        let feed: FeedResponse = json_with_limit(response).await?;

        feed.into_records()
    }

    /// Fetch the current event schedule.
    pub async fn current_event(&self) -> Result<CurrentEvent, ProviderClientError> {
        let url = self.event_base_url.join(CURRENT_EVENT_ENDPOINT)?;
        tracing::debug!(url = %url, "Fetching current event");

        let response = self.client.get(url).send().await?;
        let response = check_response(response)?;
        json_with_limit(response).await
    }
}

/// Parse a base URL and force a trailing slash so `join` appends rather than
/// replacing the last path segment.
fn normalize_base(raw: &str) -> Result<Url, ProviderClientError> {
    if raw.trim().is_empty() {
        return Err(ProviderClientError::InvalidConfig("base URL is empty".to_string()));
    }
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

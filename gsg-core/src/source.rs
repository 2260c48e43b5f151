//! Upstream data source seam for the reconciliation pipeline.

use async_trait::async_trait;

use gsg_providers::{CurrentEvent, GsgClient, ProviderClientError, StreamRecord};

/// Where a session reads live streams and the event schedule from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Current live stream feed
    async fn public_streams(&self) -> Result<Vec<StreamRecord>, ProviderClientError>;

    /// Current event schedule
    async fn current_event(&self) -> Result<CurrentEvent, ProviderClientError>;
}

#[async_trait]
impl StreamSource for GsgClient {
    async fn public_streams(&self) -> Result<Vec<StreamRecord>, ProviderClientError> {
        Self::public_streams(self).await
    }

    async fn current_event(&self) -> Result<CurrentEvent, ProviderClientError> {
        Self::current_event(self).await
    }
}

/// Build the HTTP source for the deployment selected in `config`
pub fn http_source(config: &crate::config::ApiConfig) -> crate::Result<GsgClient> {
    let client = GsgClient::with_event_base(
        config.active_base_url(),
        config.active_event_base_url(),
        config.request_timeout(),
    )?;
    Ok(client)
}

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::{FetchError, Result};
use crate::ports::SubscriptionSourcePort;

pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Downloads the subscription over HTTP(S).
pub struct ReqwestSubscriptionSource {
    url: String,
    client: reqwest::Client,
}

impl ReqwestSubscriptionSource {
    /// Client honouring the system proxy settings (`HTTPS_PROXY`, ...).
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::build(url.into(), reqwest::Client::builder().timeout(timeout))
    }

    /// Client that always connects directly.
    pub fn direct(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::build(url.into(), reqwest::Client::builder().timeout(timeout).no_proxy())
    }

    fn build(url: String, builder: reqwest::ClientBuilder) -> Result<Self> {
        let client = builder
            .build()
            .map_err(|e| FetchError::Download(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { url, client })
    }
}

#[async_trait]
impl SubscriptionSourcePort for ReqwestSubscriptionSource {
    async fn fetch(&self) -> Result<String> {
        info!("Fetching subscription from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Download(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Subscription responded with status {}", status);
            return Err(FetchError::Download(format!("unexpected status {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Download(format!("Failed to read response body: {}", e)))?;

        info!("Subscription downloaded ({} bytes)", body.len());
        Ok(body)
    }
}

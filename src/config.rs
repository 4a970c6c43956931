use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::adapters::reqwest_client::DEFAULT_DOWNLOAD_TIMEOUT;
use crate::domain::cache::DEFAULT_CACHE_DURATION;
use crate::domain::coordinator::{DEFAULT_PROBE_LIMIT, DEFAULT_PROBE_TIMEOUT};
use crate::domain::{FetchError, Result};

pub const APP_NAME: &str = "nodepool";

/// Runtime settings, persisted by `confy` in the platform config directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub subscription_url: String,
    pub cache_duration_secs: u64,
    pub probe_timeout_secs: u64,
    pub probe_limit: usize,
    pub download_timeout_secs: u64,
    pub use_system_proxy: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            subscription_url: "https://raw.githubusercontent.com/a2470982985/getNode/main/v2ray.txt".into(),
            cache_duration_secs: DEFAULT_CACHE_DURATION.as_secs(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT.as_secs(),
            probe_limit: DEFAULT_PROBE_LIMIT,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT.as_secs(),
            use_system_proxy: true,
        }
    }
}

impl Settings {
    /// Load from `path`, or from the default confy location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings: Settings = match path {
            Some(path) => confy::load_path(path),
            None => confy::load(APP_NAME, None),
        }
        .map_err(|e| FetchError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.subscription_url)
            .map_err(|e| FetchError::Config(format!("subscription_url {}: {}", self.subscription_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::Config(format!(
                "subscription_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.probe_limit == 0 {
            return Err(FetchError::Config("probe_limit must be at least 1".into()));
        }
        if self.probe_timeout_secs == 0 || self.download_timeout_secs == 0 {
            return Err(FetchError::Config("timeouts must be at least 1 second".into()));
        }
        Ok(())
    }

    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_duration_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

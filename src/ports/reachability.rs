use async_trait::async_trait;
use std::time::Duration;

/// Port for checking whether a node endpoint accepts connections
#[async_trait]
pub trait ReachabilityPort: Send + Sync {
    /// Single connection attempt bounded by `timeout`
    ///
    /// Every failure mode (refused, DNS, timeout) is reported as `false`.
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> bool;
}

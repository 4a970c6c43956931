use crate::domain::Result;
use async_trait::async_trait;

/// Port for downloading the raw subscription blob
#[async_trait]
pub trait SubscriptionSourcePort: Send + Sync {
    /// Fetch the subscription body once
    ///
    /// Any transport error, timeout or non-200 status is reported as
    /// `FetchError::Download`.
    async fn fetch(&self) -> Result<String>;
}

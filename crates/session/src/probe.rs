use crate::error::ProbeError;
use async_trait::async_trait;
use url::Url;

/// Advisory check run before opening a remote source. A failure is reported
/// but never stops the open attempt.
#[async_trait]
pub trait SourceProbe: Send + Sync {
    async fn check(&self, url: &Url) -> Result<(), ProbeError>;
}

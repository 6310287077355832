use async_trait::async_trait;
use castdeck_core::is_remote;
use castdeck_session::{ProbeError, SourceProbe};
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Checks that a remote audio file answers before the backend is asked to
/// open it. Tries `HEAD` first and falls back to a two-byte ranged `GET`,
/// since some hosts reject `HEAD` but still stream the file.
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn head(&self, url: &Url) -> Result<(), ProbeError> {
        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(network)?;
        status_result(response.status())
    }

    async fn ranged_get(&self, url: &Url) -> Result<(), ProbeError> {
        let response = self
            .client
            .get(url.clone())
            .header(RANGE, "bytes=0-1")
            .send()
            .await
            .map_err(network)?;
        status_result(response.status())
    }
}

#[async_trait]
impl SourceProbe for HttpProbe {
    async fn check(&self, url: &Url) -> Result<(), ProbeError> {
        if !is_remote(url) {
            return Ok(());
        }

        match self.head(url).await {
            Ok(()) => Ok(()),
            Err(head_err) => {
                debug!(%url, error = %head_err, "HEAD probe failed; retrying with ranged GET");
                self.ranged_get(url).await.map_err(|err| {
                    warn!(%url, error = %err, "audio source did not answer");
                    err
                })
            }
        }
    }
}

pub fn status_result(status: StatusCode) -> Result<(), ProbeError> {
    if status.is_success() {
        return Ok(());
    }
    Err(match status {
        StatusCode::FORBIDDEN => ProbeError::Forbidden,
        StatusCode::NOT_FOUND => ProbeError::NotFound,
        other => ProbeError::Status(other.as_u16()),
    })
}

fn network(err: reqwest::Error) -> ProbeError {
    ProbeError::Network(err.to_string())
}

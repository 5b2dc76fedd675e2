use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error)]
#[error("Voice service unreachable: {0}")]
pub struct ProbeError(pub String);

/// Checks that the voice service can be reached before a call is started.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn check(&self) -> Result<(), ProbeError>;
}

/// Sends a HEAD request to the voice API host. Any HTTP response counts as
/// reachable; only transport failures and timeouts fail the probe.
pub struct HttpProbe {
    client: Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn check(&self) -> Result<(), ProbeError> {
        let response = self
            .client
            .head(&self.url)
            .send()
            .await
            .map_err(|e| ProbeError(e.to_string()))?;
        debug!(url = %self.url, status = %response.status(), "voice service reachable");
        Ok(())
    }
}

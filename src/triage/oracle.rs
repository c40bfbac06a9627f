use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use crate::errors::HarnessError;
use crate::pipeline::state::SideChannelSettings;
use tracing::{debug, warn};

/// Result of one out-of-band check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "detail", rename_all = "lowercase")]
pub enum ProbeResult {
    /// Artifact absent (not yet written, or already cleaned up) or not the marker.
    Unconfirmed,
    /// Body equals the expected marker.
    Confirmed,
    /// The fetch itself failed. Never counts as confirmation.
    Error(String),
}

impl ProbeResult {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ProbeResult::Confirmed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfirmed => "unconfirmed",
            Self::Confirmed => "confirmed",
            Self::Error(_) => "error",
        }
    }
}

/// Confirms blind command injection through a side effect on a well-known resource.
#[async_trait]
pub trait SideChannelOracle: Send + Sync {
    async fn probe(&self) -> ProbeResult;

    /// The resource being probed, for logging.
    fn resource(&self) -> &str;
}

/// Compare a fetched body against the expected marker. `echo` appends a newline,
/// so surrounding whitespace is ignored; anything else must match exactly.
pub fn judge_body(body: &str, marker: &str) -> ProbeResult {
    let body = body.trim();
    if body.is_empty() {
        ProbeResult::Unconfirmed
    } else if body == marker {
        ProbeResult::Confirmed
    } else {
        ProbeResult::Unconfirmed
    }
}

/// Fetches the side-channel resource over HTTP.
pub struct HttpOracle {
    client: Client,
    url: String,
    marker: String,
}

impl HttpOracle {
    pub fn new(url: &str, marker: &str, timeout: Duration) -> Result<Self, HarnessError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HarnessError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.to_string(),
            marker: marker.to_string(),
        })
    }

    pub fn from_settings(settings: &SideChannelSettings) -> Result<Self, HarnessError> {
        Self::new(&settings.url, &settings.marker, settings.probe_timeout)
    }
}

#[async_trait]
impl SideChannelOracle for HttpOracle {
    async fn probe(&self) -> ProbeResult {
        let response = match self.client.get(&self.url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %self.url, error = %e, "Side-channel probe failed");
                return ProbeResult::Error(e.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!(url = %self.url, status = %status, "Side-channel resource not served");
            return ProbeResult::Unconfirmed;
        }

        match response.text().await {
            Ok(body) => {
                let result = judge_body(&body, &self.marker);
                debug!(url = %self.url, result = result.as_str(), "Side-channel probed");
                result
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Side-channel body unreadable");
                ProbeResult::Error(e.to_string())
            }
        }
    }

    fn resource(&self) -> &str {
        &self.url
    }
}

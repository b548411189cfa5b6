//! HTTP liveness probe.
//!
//! # Responsibilities
//! - Issue a single GET against an endpoint
//! - Enforce the fixed per-request timeout
//! - Classify the outcome (200/201 healthy, everything else a failure)
//!
//! # Design Decisions
//! - No retries: the next rotation is the retry
//! - TLS uses the platform defaults of the HTTP client
//! - Redirects are followed, the final status is classified

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Per-request timeout for a liveness probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const USER_AGENT: &str = "http-monitor-probe";

/// Why a probe classified an endpoint as unhealthy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Connection, DNS, TLS or protocol failure.
    #[error("request failed: {0}")]
    Transport(String),

    /// No response within the probe timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// Endpoint answered with a status other than 200 or 201.
    #[error("invalid status code. Received: {0}, expected: 200 or 201")]
    Status(u16),
}

/// Something that can check whether a URL is alive.
pub trait Prober: Send + Sync + 'static {
    fn probe(&self, url: &str) -> impl Future<Output = Result<(), ProbeError>> + Send;
}

/// Map a response status to a probe outcome.
pub fn classify_status(status: StatusCode) -> Result<(), ProbeError> {
    match status {
        StatusCode::OK | StatusCode::CREATED => Ok(()),
        other => Err(ProbeError::Status(other.as_u16())),
    }
}

/// Prober backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProber {
    /// Create a prober with the standard timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(PROBE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, timeout })
    }
}

impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> Result<(), ProbeError> {
        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                if status != StatusCode::OK && status != StatusCode::CREATED {
                    tracing::debug!(url = %url, status = %status, "Probe failed: non-accepted status");
                }
                classify_status(status)
            }
            Err(e) if e.is_timeout() => {
                tracing::debug!(url = %url, "Probe failed: timeout");
                Err(ProbeError::Timeout(self.timeout))
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Probe failed: connection error");
                Err(ProbeError::Transport(e.to_string()))
            }
        }
    }
}

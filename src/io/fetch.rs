//! Metrics endpoint client
//!
//! One GET per call, no internal retry. Every failure comes back as a typed
//! `FetchError`; the scheduler decides when to try again.

use crate::domain::{EnvelopeError, ErrorKind, MetricsEnvelope};
use crate::infra::{Config, Metrics};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rate limited by endpoint")]
    RateLimited,
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Transport(_) => ErrorKind::TransportError,
            FetchError::RateLimited => ErrorKind::RateLimited,
            FetchError::Protocol(_) => ErrorKind::ProtocolError,
        }
    }
}

impl From<EnvelopeError> for FetchError {
    fn from(e: EnvelopeError) -> Self {
        FetchError::Protocol(e.to_string())
    }
}

pub type FetchResult = Result<MetricsEnvelope, FetchError>;

/// Anything that can produce one refresh result
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn fetch(&self) -> FetchResult;
}

/// HTTP client for the metrics endpoint
pub struct FetchClient {
    url: String,
    http_client: reqwest::Client,
    metrics: Arc<Metrics>,
}

impl FetchClient {
    pub fn new(config: &Config, metrics: Arc<Metrics>) -> anyhow::Result<Self> {
        // Create HTTP client once for reuse (connection pooling)
        let http_client = reqwest::Client::builder()
            .timeout(config.endpoint_timeout())
            .user_agent(concat!("inflation-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { url: config.endpoint_url().to_string(), http_client, metrics })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self) -> FetchResult {
        let response = self
            .http_client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Transport(describe_reqwest_error(&e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Transport(format!("HTTP {}", status.as_u16())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(describe_reqwest_error(&e)))?;

        let value: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| FetchError::Protocol(format!("invalid JSON body: {}", e)))?;

        Ok(MetricsEnvelope::from_value(value)?)
    }
}

#[async_trait]
impl MetricsSource for FetchClient {
    async fn fetch(&self) -> FetchResult {
        let start = Instant::now();
        self.metrics.record_fetch_attempt();
        debug!(url = %self.url, "fetch_started");

        let result = self.request().await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(envelope) => {
                self.metrics.record_fetch_success(latency_ms);
                info!(
                    latency_ms = %latency_ms,
                    metrics = ?envelope.metric_keys(),
                    analysis = %envelope.analysis.is_some(),
                    last_updated = ?envelope.last_updated,
                    "fetch_succeeded"
                );
            }
            Err(e) => {
                self.metrics.record_fetch_failure(e.kind(), latency_ms);
                warn!(
                    latency_ms = %latency_ms,
                    kind = %e.kind(),
                    error = %e,
                    "fetch_failed"
                );
            }
        }

        result
    }
}

fn describe_reqwest_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

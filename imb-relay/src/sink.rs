//! Metrics sink egress
//!
//! Decoded records are wrapped in an [`Envelope`] and posted as JSON to the
//! configured endpoint. The [`MetricsSink`] trait lets tests substitute an
//! in-memory sink.

use std::future::Future;
use std::time::Duration;

use imb_payload::DecodedRecord;
use serde::Serialize;
use thiserror::Error;

/// Errors delivering a record to the sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("sink responded with status {0}")]
    Status(u16),
}

/// A decoded record as delivered to the sink
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    /// Relay receipt time, ISO-8601 with milliseconds
    pub received_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u8>,
    #[serde(flatten)]
    pub record: DecodedRecord,
}

/// Destination for decoded records
pub trait MetricsSink: Send + Sync + 'static {
    fn deliver(&self, envelope: Envelope) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Sink that posts envelopes to an HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpSink {
    pub fn new(url: String, token: Option<String>, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url, token })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl MetricsSink for HttpSink {
    async fn deliver(&self, envelope: Envelope) -> Result<(), SinkError> {
        let mut request = self.client.post(&self.url).json(&envelope);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Sink {} rejected record: {}", self.url, status);
            return Err(SinkError::Status(status.as_u16()));
        }

        tracing::debug!("Delivered record to {}", self.url);
        Ok(())
    }
}

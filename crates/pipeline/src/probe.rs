//! Resource accessibility probes.
//!
//! [`HttpResourceProbe`] checks an image URL over the network with a `HEAD`
//! request. [`StaticResourceProbe`] answers from a fixed table and is what
//! tests and offline runs inject instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use wayfarer_core::collaborators::{ProbeReport, ResourceProbe};
use wayfarer_core::error::CoreError;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Why a probe could not produce a report.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The underlying HTTP request failed (network, DNS, TLS).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server answered with a 5xx status.
    #[error("Server returned HTTP {0}")]
    HttpStatus(u16),

    /// The request did not finish within the client timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<ProbeError> for CoreError {
    fn from(err: ProbeError) -> Self {
        CoreError::Internal(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// HttpResourceProbe
// ---------------------------------------------------------------------------

/// Probes resources over HTTP.
///
/// A 2xx answer is accessible; a 4xx answer is cleanly inaccessible; a 5xx
/// answer or a transport failure is a probe error, which the pipeline
/// downgrades to a warning.
pub struct HttpResourceProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpResourceProbe {
    /// Build a probe whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    async fn head(&self, url: &str) -> Result<ProbeReport, ProbeError> {
        let response = self.client.head(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(self.timeout)
            } else {
                ProbeError::Request(e)
            }
        })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ProbeError::HttpStatus(status.as_u16()));
        }
        if !status.is_success() {
            return Ok(ProbeReport::inaccessible());
        }

        let headers = response.headers();
        let size_bytes = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());

        Ok(ProbeReport::accessible(size_bytes, content_type))
    }
}

#[async_trait]
impl ResourceProbe for HttpResourceProbe {
    async fn probe(&self, url: &str) -> Result<ProbeReport, CoreError> {
        Ok(self.head(url).await?)
    }
}

// ---------------------------------------------------------------------------
// StaticResourceProbe
// ---------------------------------------------------------------------------

/// A canned answer for [`StaticResourceProbe`].
#[derive(Debug, Clone)]
pub enum StaticResponse {
    Report(ProbeReport),
    /// The probe itself fails with this message.
    Fail(String),
    /// Answer with the report after sleeping.
    Delayed(Duration, ProbeReport),
}

/// Deterministic probe keyed by URL.
#[derive(Debug)]
pub struct StaticResourceProbe {
    responses: HashMap<String, StaticResponse>,
    fallback: StaticResponse,
    calls: AtomicUsize,
}

impl StaticResourceProbe {
    /// Every URL is a small, reachable JPEG unless overridden.
    pub fn accessible() -> Self {
        Self::with_fallback(StaticResponse::Report(ProbeReport::accessible(
            Some(200 * 1024),
            Some("image/jpeg"),
        )))
    }

    pub fn with_fallback(fallback: StaticResponse) -> Self {
        Self {
            responses: HashMap::new(),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    /// Override the answer for one URL.
    pub fn respond(mut self, url: impl Into<String>, response: StaticResponse) -> Self {
        self.responses.insert(url.into(), response);
        self
    }

    /// How many probes were made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceProbe for StaticResourceProbe {
    async fn probe(&self, url: &str) -> Result<ProbeReport, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(url).unwrap_or(&self.fallback) {
            StaticResponse::Report(report) => Ok(report.clone()),
            StaticResponse::Fail(message) => Err(CoreError::Internal(message.clone())),
            StaticResponse::Delayed(delay, report) => {
                tokio::time::sleep(*delay).await;
                Ok(report.clone())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

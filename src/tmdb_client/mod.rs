//! HTTP client for the TMDB metadata API and image host.
//!
//! Every call is a single GET with redirects followed and no retries. The
//! outcome is classified into:
//!
//! - **Success**: 2xx, the body is handed back unread as a byte stream
//! - **Status**: upstream answered with a non-2xx status (passthrough)
//! - **Network**: DNS, connect, TLS, or header timeout
//!
//! Body reads done here (error excerpts, small JSON documents) are bounded by
//! the stream idle timeout so a stalled upstream cannot pin a request.
//!
//! ```text
//! ┌────────────────────┐    ┌───────────────┐    ┌──────────────────────┐
//! │ UpstreamTarget     │ ─▶ │ TmdbClient    │ ─▶ │ UpstreamResponse     │
//! │ (url, accept)      │    │ ::fetch       │    │ | UpstreamFailure    │
//! └────────────────────┘    └───────────────┘    └──────────────────────┘
//! ```
//!
//! # Module Structure
//!
//! - `target` - Outbound request construction (`UpstreamTarget`)
//! - `helpers` - Bounded error excerpts and credential-free error messages

mod helpers;
mod target;

use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::Stream;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics;

pub use helpers::{MAX_ERROR_EXCERPT_BYTES, describe_error, read_excerpt};
pub use target::{ACCEPT_IMAGE, ACCEPT_JSON, UpstreamTarget};

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// Classified upstream failure.
#[derive(Debug, Error)]
pub enum UpstreamFailure {
    /// Upstream was reachable and answered with a non-2xx status.
    #[error("upstream returned {status}: {details}")]
    Status { status: StatusCode, details: String },

    /// Upstream could not be reached or did not answer in time.
    #[error("{0}")]
    Network(String),
}

impl From<UpstreamFailure> for AppError {
    fn from(failure: UpstreamFailure) -> Self {
        match failure {
            UpstreamFailure::Status { status, details } => AppError::Upstream { status, details },
            UpstreamFailure::Network(msg) => AppError::Network(msg),
        }
    }
}

/// Successful upstream response whose body has not been read yet.
#[derive(Debug)]
pub struct UpstreamResponse {
    inner: reqwest::Response,
    body_timeout: Duration,
}

impl UpstreamResponse {
    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.inner.headers().get(CONTENT_TYPE)
    }

    /// Consume the response as a lazy chunk stream. Nothing is buffered
    /// beyond what the transport already holds.
    pub fn into_body_stream(self) -> impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static {
        self.inner.bytes_stream()
    }

    /// Read the whole body. Only for small payloads such as metadata JSON.
    ///
    /// A transport error or a body that does not finish arriving within the
    /// body timeout is a `Network` failure.
    pub async fn bytes(self) -> Result<Bytes, UpstreamFailure> {
        match timeout(self.body_timeout, self.inner.bytes()).await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(e)) => Err(UpstreamFailure::Network(describe_error(e))),
            Err(_) => Err(UpstreamFailure::Network(format!(
                "upstream body not received within {}s",
                self.body_timeout.as_secs()
            ))),
        }
    }
}

/// Shared, cheaply clonable TMDB client.
#[derive(Clone, Debug)]
pub struct TmdbClient {
    http: reqwest::Client,
    response_timeout: Duration,
    body_timeout: Duration,
}

impl TmdbClient {
    /// Build the client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if the TLS backend cannot be initialized
    /// or the configured User-Agent is not a valid header value.
    pub fn new(config: &Config) -> AppResult<Self> {
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| AppError::ConfigError(format!("Invalid UPSTREAM_USER_AGENT: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(config.upstream_connect_timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            response_timeout: config.upstream_response_timeout,
            body_timeout: config.stream_idle_timeout,
        })
    }

    /// Issue exactly one request for `target`.
    ///
    /// The wait for response headers is bounded by the configured response
    /// timeout; an expired wait is a `Network` failure. On a non-2xx status
    /// at most [`MAX_ERROR_EXCERPT_BYTES`] of the body are read for the
    /// failure details, within the body timeout, falling back to the reason
    /// phrase.
    #[instrument(skip(self, target), fields(endpoint = target.endpoint(), url = %target.redacted_url()))]
    pub async fn fetch(&self, target: &UpstreamTarget) -> Result<UpstreamResponse, UpstreamFailure> {
        let request = self
            .http
            .request(target.method(), target.url().clone())
            .header(ACCEPT, target.accept());

        let started = Instant::now();
        let sent = timeout(self.response_timeout, request.send()).await;
        metrics::record_upstream_duration(target.endpoint(), started.elapsed().as_secs_f64());

        let response = match sent {
            Err(_) => {
                metrics::record_upstream_request(target.endpoint(), "timeout");
                return Err(UpstreamFailure::Network(format!(
                    "no response from upstream within {}s",
                    self.response_timeout.as_secs()
                )));
            }
            Ok(Err(e)) => {
                metrics::record_upstream_request(target.endpoint(), "network_error");
                return Err(UpstreamFailure::Network(describe_error(e)));
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if !status.is_success() {
            metrics::record_upstream_request(target.endpoint(), "upstream_error");
            let excerpt = timeout(
                self.body_timeout,
                read_excerpt(response.bytes_stream(), MAX_ERROR_EXCERPT_BYTES),
            )
            .await
            .unwrap_or_else(|_| {
                debug!(status = status.as_u16(), "Upstream error body stalled, using reason phrase");
                String::new()
            });
            let details = if excerpt.is_empty() {
                status.canonical_reason().unwrap_or("Unknown status").to_string()
            } else {
                excerpt
            };
            return Err(UpstreamFailure::Status { status, details });
        }

        metrics::record_upstream_request(target.endpoint(), "success");
        debug!(status = status.as_u16(), "Upstream responded");

        Ok(UpstreamResponse {
            inner: response,
            body_timeout: self.body_timeout,
        })
    }
}

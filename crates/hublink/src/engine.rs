//! The request engine: configuration, transport wiring, and the
//! classify/retry loop every call funnels through.
//!
//! One [`Engine`] serves any number of concurrent callers. Descriptors and
//! records are immutable or owned per call; the only cross-call state is the
//! advisory rate-limit snapshot and the optional proactive pacer.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::descriptor::CallDescriptor;
use crate::error::{ApiError, ErrorKind, Result, classify};
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::normalize::{NormalizeContext, ResultRecord, normalize};
use crate::rate_limit::{ApiRateLimiter, RateLimitInfo, RateLimitSnapshot};
use crate::request::build_request;
use crate::retry::RetryConfig;

/// Public REST endpoint of github.com.
pub const GITHUB_API_BASE: &str = "https://api.github.com";
/// Default versioned media type sent in `Accept`.
pub const DEFAULT_ACCEPT: &str = "application/vnd.github+json";
/// Default `User-Agent`; GitHub rejects requests without one.
pub const DEFAULT_USER_AGENT: &str = "hublink";
/// Default per-round-trip timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Engine configuration.
///
/// Owned by the caller and passed in explicitly; there is no ambient
/// module-level state.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL relative routes are joined onto.
    pub base_url: Url,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Default `Accept` media type; descriptors may override per call.
    pub accept: String,
    /// Timeout per individual HTTP round trip, not per drain.
    pub timeout: Duration,
    /// Retry policy applied to every request.
    pub retry: RetryConfig,
    /// Proactive request pacing; `None` disables the pacer.
    pub requests_per_second: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(GITHUB_API_BASE).expect("default base URL is valid"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
            requests_per_second: None,
        }
    }
}

/// The paginated request engine.
///
/// Cheap to clone; clones share the transport, pacer, and rate-limit
/// snapshot.
#[derive(Clone)]
pub struct Engine {
    transport: Arc<dyn HttpTransport>,
    config: EngineConfig,
    pacer: Option<ApiRateLimiter>,
    rate_limit: RateLimitSnapshot,
}

impl Engine {
    /// Create an engine backed by a real reqwest transport.
    #[cfg(feature = "reqwest")]
    pub fn new(config: EngineConfig) -> Result<Self> {
        let transport = crate::http::reqwest_transport::ReqwestTransport::with_timeout(config.timeout)
            .map_err(|e| ApiError::network(e.to_string()))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create an engine over an arbitrary transport.
    ///
    /// This is the seam tests use to substitute an in-memory transport.
    #[must_use]
    pub fn with_transport(config: EngineConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let pacer = config.requests_per_second.map(ApiRateLimiter::new);
        Self {
            transport,
            config,
            pacer,
            rate_limit: RateLimitSnapshot::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The most recently observed rate limit, if any response carried one.
    ///
    /// Advisory only; the server enforces the budget regardless.
    #[must_use]
    pub fn rate_limit(&self) -> Option<RateLimitInfo> {
        self.rate_limit.current()
    }

    /// Build the concrete request for a descriptor using this engine's
    /// defaults.
    pub(crate) fn build(&self, descriptor: &CallDescriptor) -> Result<HttpRequest> {
        build_request(
            &self.config.base_url,
            &self.config.user_agent,
            &self.config.accept,
            descriptor,
        )
    }

    /// Send a request, retrying throttled and transient failures.
    ///
    /// Returns the first 2xx response, or the classified error once the
    /// retry budget is spent or a non-retryable classification appears.
    pub(crate) async fn send_with_retry(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut schedule = self.config.retry.schedule();

        loop {
            if let Some(pacer) = &self.pacer {
                pacer.wait().await;
            }

            let (error, decision) = match self.transport.send(request.clone()).await {
                Ok(page) => {
                    self.rate_limit.observe(&page);
                    let Some(error) = classify(&page) else {
                        return Ok(page);
                    };
                    let decision = schedule.decide(&error, Some(&page));
                    (error, decision)
                }
                Err(transport_error) => {
                    let error = ApiError::network(transport_error.to_string());
                    let decision = schedule.decide(&error, None);
                    (error, decision)
                }
            };

            if !decision.retry {
                return Err(error);
            }

            if error.kind == ErrorKind::RateLimited {
                tracing::warn!(
                    url = %request.url,
                    wait_ms = decision.wait.as_millis() as u64,
                    "rate limited, backing off"
                );
            } else {
                tracing::debug!(
                    url = %request.url,
                    error = %error,
                    wait_ms = decision.wait.as_millis() as u64,
                    remaining = schedule.remaining(),
                    reason = decision.reason,
                    "retrying request"
                );
            }
            tokio::time::sleep(decision.wait).await;
        }
    }

    /// Execute a single-item call, bypassing the pager.
    ///
    /// Returns exactly one normalized record or fails.
    pub async fn execute(
        &self,
        descriptor: &CallDescriptor,
        context: &NormalizeContext,
    ) -> Result<ResultRecord> {
        let request = self.build(descriptor)?;
        let page = self.send_with_retry(&request).await?;
        let value: Value = serde_json::from_slice(&page.body)
            .map_err(|e| ApiError::decode(format!("invalid JSON payload: {e}")))?;
        Ok(normalize(value, context))
    }

    /// Execute a call whose success carries no payload (204-style).
    pub async fn execute_unit(&self, descriptor: &CallDescriptor) -> Result<()> {
        let request = self.build(descriptor)?;
        self.send_with_retry(&request).await?;
        Ok(())
    }

    /// Execute a boolean status probe: 2xx means yes, 404 means no.
    ///
    /// The "no" outcome is checked by value against the `NotFound`
    /// classification, never by inspecting error message text.
    pub async fn probe(&self, descriptor: &CallDescriptor) -> Result<bool> {
        let request = self.build(descriptor)?;
        match self.send_with_retry(&request).await {
            Ok(_) => Ok(true),
            Err(error) if error.is_not_found() => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Execute a call and deserialize the payload into a typed value.
    pub async fn execute_typed<T: serde::de::DeserializeOwned>(
        &self,
        descriptor: &CallDescriptor,
    ) -> Result<T> {
        let request = self.build(descriptor)?;
        let page = self.send_with_retry(&request).await?;
        serde_json::from_slice(&page.body)
            .map_err(|e| ApiError::decode(format!("invalid JSON payload: {e}")))
    }
}

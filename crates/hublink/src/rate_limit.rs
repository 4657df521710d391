//! Rate-limit telemetry and proactive request pacing.
//!
//! The engine reads `x-ratelimit-*` response headers into an advisory
//! [`RateLimitInfo`] snapshot. The snapshot is read-only telemetry: GitHub
//! enforces the budget server-side, so nothing here takes a lock around
//! request issuance. Proactive pacing is a separate, optional
//! [`ApiRateLimiter`] built on the governor crate.

use std::num::NonZeroU32;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};

use crate::http::HttpResponse;

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// GitHub allows 5000 requests/hour for authenticated callers (~1.4/sec);
/// 10/sec leaves room for bursts while staying well under the ceiling.
pub const GITHUB_DEFAULT_RPS: u32 = 10;

/// Rate limit information observed from response headers.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// Maximum requests allowed per window.
    pub limit: usize,
    /// Remaining requests in the current window.
    pub remaining: usize,
    /// When the window resets.
    pub reset_at: DateTime<Utc>,
}

/// Extract rate limit info from `x-ratelimit-*` response headers.
///
/// Returns `None` unless all three headers are present and parseable.
#[must_use]
pub fn rate_limit_from_headers(page: &HttpResponse) -> Option<RateLimitInfo> {
    let limit = page
        .header("x-ratelimit-limit")
        .and_then(|v| v.parse::<usize>().ok())?;
    let remaining = page
        .header("x-ratelimit-remaining")
        .and_then(|v| v.parse::<usize>().ok())?;
    let reset_epoch = page
        .header("x-ratelimit-reset")
        .and_then(|v| v.parse::<i64>().ok())?;
    let reset_at = DateTime::from_timestamp(reset_epoch, 0).unwrap_or_else(Utc::now);
    Some(RateLimitInfo {
        limit,
        remaining,
        reset_at,
    })
}

/// Header-derived wait before a throttled request may be retried.
///
/// Prefers `Retry-After` (delay in seconds), falling back to the distance to
/// `x-ratelimit-reset`. Returns `None` when neither header is usable.
#[must_use]
pub fn retry_delay_from_headers(page: &HttpResponse) -> Option<Duration> {
    if let Some(seconds) = page.header("retry-after").and_then(|v| v.parse::<u64>().ok()) {
        return Some(Duration::from_secs(seconds));
    }
    let reset_epoch = page
        .header("x-ratelimit-reset")
        .and_then(|v| v.parse::<i64>().ok())?;
    let wait = reset_epoch.saturating_sub(Utc::now().timestamp()).max(0);
    Some(Duration::from_secs(wait as u64))
}

/// Process-wide advisory view of the most recently observed rate limit.
///
/// Updated after every response; readable by any caller. Purely telemetry,
/// never consulted to gate requests.
#[derive(Clone, Default)]
pub struct RateLimitSnapshot {
    inner: Arc<RwLock<Option<RateLimitInfo>>>,
}

impl RateLimitSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the rate limit headers of a response, if present.
    pub fn observe(&self, page: &HttpResponse) {
        if let Some(info) = rate_limit_from_headers(page) {
            tracing::debug!(
                remaining = info.remaining,
                limit = info.limit,
                "observed rate limit headers"
            );
            if let Ok(mut slot) = self.inner.write() {
                *slot = Some(info);
            }
        }
    }

    /// The most recently observed rate limit, if any response carried one.
    #[must_use]
    pub fn current(&self) -> Option<RateLimitInfo> {
        self.inner.read().ok().and_then(|slot| slot.clone())
    }
}

/// A standalone proactive request pacer using the governor crate.
///
/// The engine awaits the pacer before each request when one is configured,
/// spreading calls out instead of bursting into the server-side limit.
///
/// # Example
///
/// ```ignore
/// use hublink::rate_limit::ApiRateLimiter;
///
/// let limiter = ApiRateLimiter::new(10); // 10 requests per second
///
/// // Before each API call:
/// limiter.wait().await;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a new pacer with the specified requests per second.
    ///
    /// # Arguments
    ///
    /// * `requests_per_second` - Maximum requests per second (must be > 0, defaults to 1 if 0)
    #[must_use]
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::new(1).unwrap());
        let rate_limiter = RateLimiter::direct(Quota::per_second(rps));

        Self {
            inner: Arc::new(rate_limiter),
        }
    }

    /// Wait until a request is allowed by the pacer.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

/// A single rate limit resource entry from `GET /rate_limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResource {
    /// Maximum requests allowed per window.
    pub limit: usize,
    /// Requests used in the current window.
    pub used: usize,
    /// Remaining requests in the current window.
    pub remaining: usize,
    /// Unix timestamp when the window resets.
    pub reset: u64,
}

impl RateLimitResource {
    /// Get the reset time as a DateTime.
    #[must_use]
    pub fn reset_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.reset as i64, 0).unwrap_or_else(Utc::now)
    }
}

/// Per-resource rate limit breakdown from `GET /rate_limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResources {
    /// Core API rate limit (non-search REST endpoints).
    pub core: RateLimitResource,
    /// Search API rate limit.
    #[serde(default)]
    pub search: Option<RateLimitResource>,
    /// GraphQL API rate limit.
    #[serde(default)]
    pub graphql: Option<RateLimitResource>,
}

/// Full response of `GET /rate_limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResponse {
    /// All rate limit resources.
    pub resources: RateLimitResources,
}

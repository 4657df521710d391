//! Retry policy for throttled and transient failures.
//!
//! One [`RetrySchedule`] is created per request and consulted after each
//! failed attempt. Rate-limited responses wait out the header-derived delay
//! (floored at the minimum backoff); server and network errors walk an
//! exponential backoff built with the backon crate. Either way the schedule
//! stops after the configured cap, so a throttled API never sees an
//! unbounded request storm.

use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};

use crate::error::{ApiError, ErrorKind};
use crate::http::HttpResponse;
use crate::rate_limit::retry_delay_from_headers;

/// Initial backoff delay, also the floor for header-derived waits.
pub const INITIAL_BACKOFF_MS: u64 = 1_000;
/// Ceiling for the exponential backoff schedule.
pub const MAX_BACKOFF_MS: u64 = 60_000;
/// Default retry cap per request.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Configuration for retry operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Minimum delay between retries.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            min_delay,
            max_delay,
            max_retries,
            with_jitter: true,
        }
    }

    /// Set whether to use jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.with_jitter = jitter;
        self
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }

    /// Start a fresh per-request schedule.
    #[must_use]
    pub fn schedule(&self) -> RetrySchedule {
        RetrySchedule {
            remaining: self.max_retries,
            floor: self.min_delay,
            ceiling: self.max_delay,
            delays: self.clone().into_backoff().build(),
        }
    }
}

/// Outcome of one retry-policy consultation. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    /// Whether the request should be re-issued.
    pub retry: bool,
    /// How long to wait before the next attempt.
    pub wait: Duration,
    /// Why this decision was made.
    pub reason: &'static str,
}

impl RetryDecision {
    fn stop(reason: &'static str) -> Self {
        Self {
            retry: false,
            wait: Duration::ZERO,
            reason,
        }
    }
}

/// Mutable retry state for a single request.
///
/// Tracks the remaining budget and the position in the backoff sequence;
/// both rate-limit and transient retries draw from the same budget.
pub struct RetrySchedule {
    remaining: usize,
    floor: Duration,
    ceiling: Duration,
    delays: ExponentialBackoff,
}

impl RetrySchedule {
    /// Decide whether to retry after a classified failure.
    ///
    /// `page` is the raw response when one was received; `None` for
    /// connection-level failures.
    pub fn decide(&mut self, error: &ApiError, page: Option<&HttpResponse>) -> RetryDecision {
        if !error.retryable {
            return RetryDecision::stop("error is not retryable");
        }
        if self.remaining == 0 {
            return RetryDecision::stop("retry budget exhausted");
        }
        self.remaining -= 1;

        if error.kind == ErrorKind::RateLimited {
            // Wait out the server-stated delay, never less than the floor.
            let wait = match page.and_then(retry_delay_from_headers) {
                Some(header_wait) => header_wait.max(self.floor),
                None => self.next_backoff(),
            };
            return RetryDecision {
                retry: true,
                wait,
                reason: "rate limited",
            };
        }

        RetryDecision {
            retry: true,
            wait: self.next_backoff(),
            reason: "transient failure",
        }
    }

    fn next_backoff(&mut self) -> Duration {
        self.delays.next().unwrap_or(self.ceiling)
    }

    /// Retries still available in this schedule.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    fn throttled_page(extra: &[(&str, &str)]) -> HttpResponse {
        HttpResponse {
            status: 429,
            headers: extra
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            body: Vec::new(),
        }
    }

    fn config() -> RetryConfig {
        RetryConfig::default().with_jitter(false)
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();

        assert_eq!(config.min_delay, Duration::from_millis(INITIAL_BACKOFF_MS));
        assert_eq!(config.max_delay, Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert!(config.with_jitter);
    }

    #[test]
    fn test_retry_config_custom() {
        let config = RetryConfig::new(Duration::from_secs(2), Duration::from_secs(30), 5);

        assert_eq!(config.min_delay, Duration::from_secs(2));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert_eq!(config.max_retries, 5);
        assert!(config.with_jitter);
    }

    #[test]
    fn test_into_backoff_creates_builder() {
        let _backoff = RetryConfig::default().into_backoff();
    }

    #[test]
    fn non_retryable_errors_are_never_retried() {
        let mut schedule = config().schedule();
        let error = ApiError::not_found(404, "nope");

        let decision = schedule.decide(&error, None);
        assert!(!decision.retry);
        assert_eq!(decision.reason, "error is not retryable");
        // The budget is untouched.
        assert_eq!(schedule.remaining(), DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn rate_limited_wait_uses_header_delay_with_floor() {
        let mut schedule = config().schedule();
        let error = ApiError::rate_limited(429, "slow down");

        let page = throttled_page(&[("Retry-After", "7")]);
        let decision = schedule.decide(&error, Some(&page));
        assert!(decision.retry);
        assert_eq!(decision.wait, Duration::from_secs(7));
        assert_eq!(decision.reason, "rate limited");

        // Below the floor, the floor wins.
        let page = throttled_page(&[("Retry-After", "0")]);
        let decision = schedule.decide(&error, Some(&page));
        assert_eq!(decision.wait, Duration::from_millis(INITIAL_BACKOFF_MS));
    }

    #[test]
    fn rate_limited_without_headers_falls_back_to_backoff() {
        let mut schedule = config().schedule();
        let error = ApiError::rate_limited(429, "slow down");

        let page = throttled_page(&[]);
        let decision = schedule.decide(&error, Some(&page));
        assert!(decision.retry);
        assert_eq!(decision.wait, Duration::from_millis(INITIAL_BACKOFF_MS));
    }

    #[test]
    fn transient_backoff_doubles_per_attempt() {
        let mut schedule = config().schedule();
        let error = ApiError::server_error(503, "unavailable");

        let first = schedule.decide(&error, None);
        let second = schedule.decide(&error, None);
        let third = schedule.decide(&error, None);

        assert_eq!(first.wait, Duration::from_secs(1));
        assert_eq!(second.wait, Duration::from_secs(2));
        assert_eq!(third.wait, Duration::from_secs(4));
        assert_eq!(third.reason, "transient failure");
    }

    #[test]
    fn budget_exhaustion_stops_retrying() {
        let mut schedule = RetryConfig::new(Duration::from_millis(10), Duration::from_secs(1), 2)
            .with_jitter(false)
            .schedule();
        let error = ApiError::server_error(503, "unavailable");

        assert!(schedule.decide(&error, None).retry);
        assert!(schedule.decide(&error, None).retry);

        let decision = schedule.decide(&error, None);
        assert!(!decision.retry);
        assert_eq!(decision.reason, "retry budget exhausted");
    }

    #[test]
    fn rate_limit_and_transient_retries_share_one_budget() {
        let mut schedule = RetryConfig::new(Duration::from_millis(10), Duration::from_secs(1), 2)
            .with_jitter(false)
            .schedule();

        let throttled = ApiError::rate_limited(429, "slow down");
        let flaky = ApiError::server_error(502, "bad gateway");
        let page = throttled_page(&[("Retry-After", "1")]);

        assert!(schedule.decide(&throttled, Some(&page)).retry);
        assert!(schedule.decide(&flaky, None).retry);
        assert!(!schedule.decide(&flaky, None).retry);
    }
}

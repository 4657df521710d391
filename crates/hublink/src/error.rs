//! Error taxonomy and response classification.
//!
//! Every non-2xx response funnels through [`classify`], which maps the raw
//! status and body into an [`ApiError`] whose `retryable` flag drives the
//! retry policy. Expected "not found" probes are checked by value against
//! [`ErrorKind::NotFound`], never by parsing error message text.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::http::HttpResponse;

/// Maximum length of the response body excerpt used in error messages.
const BODY_PREVIEW_LEN: usize = 500;

/// Category of a failed API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller programming error; fatal, never retried.
    InvalidDescriptor,
    /// 401, or 403 without a rate-limit signal.
    Unauthorized,
    /// 404.
    NotFound,
    /// 422, or a GraphQL response carrying an `errors` array.
    Validation,
    /// 403/429 with a rate-limit signal. Retryable.
    RateLimited,
    /// Any 5xx. Retryable.
    ServerError,
    /// Connection-level failure. Retryable.
    Network,
    /// Drain halted by the caller's cancellation flag.
    Canceled,
    /// Unrecognized status or undecodable payload. Not retried.
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidDescriptor => "invalid descriptor",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not found",
            ErrorKind::Validation => "validation failed",
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::ServerError => "server error",
            ErrorKind::Network => "network error",
            ErrorKind::Canceled => "canceled",
            ErrorKind::Unknown => "unknown error",
        };
        f.write_str(name)
    }
}

/// Typed categorization of a failed API call.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    /// What went wrong, as a category the caller can match on.
    pub kind: ErrorKind,
    /// Human-readable detail, usually extracted from the response body.
    pub message: String,
    /// The HTTP status that produced this error, when one exists.
    pub status: Option<u16>,
    /// Whether the retry policy may re-issue the request.
    pub retryable: bool,
}

impl ApiError {
    fn new(kind: ErrorKind, message: impl Into<String>, status: Option<u16>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            status,
            retryable,
        }
    }

    /// Caller supplied a malformed descriptor. Fatal.
    pub fn invalid_descriptor(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidDescriptor, message, None, false)
    }

    /// Connection-level failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message, None, true)
    }

    /// Drain halted by the caller's cancellation flag.
    #[must_use]
    pub fn canceled() -> Self {
        Self::new(ErrorKind::Canceled, "operation canceled", None, false)
    }

    /// Response payload could not be decoded.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message, None, false)
    }

    pub fn unauthorized(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message, Some(status), false)
    }

    pub fn not_found(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message, Some(status), false)
    }

    pub fn validation(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message, Some(status), false)
    }

    pub fn rate_limited(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message, Some(status), true)
    }

    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerError, message, Some(status), true)
    }

    pub fn unknown(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message, Some(status), false)
    }

    /// Check if this error is a rate limit error (retryable).
    #[inline]
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.kind == ErrorKind::RateLimited
    }

    /// Check if this error is a plain 404.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// GitHub's structured error body.
///
/// `{"message": "Validation Failed", "errors": [{"resource": "Issue",
/// "field": "title", "code": "missing_field"}], ...}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    resource: Option<String>,
    field: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

impl ErrorDetail {
    fn render(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        let mut out = String::new();
        if let Some(resource) = &self.resource {
            out.push_str(resource);
        }
        if let Some(field) = &self.field {
            if !out.is_empty() {
                out.push('.');
            }
            out.push_str(field);
        }
        if let Some(code) = &self.code {
            if !out.is_empty() {
                out.push_str(": ");
            }
            out.push_str(code);
        }
        out
    }
}

/// Classify a raw response into a typed error, or `None` for 2xx.
///
/// 401, and 403 without a rate-limit signal, map to `Unauthorized`; 403/429
/// with a rate-limit signal map to `RateLimited`; 404 to `NotFound`; 422 to
/// `Validation` (message from the structured error list when present); 5xx
/// to `ServerError`; anything else to `Unknown`.
#[must_use]
pub fn classify(page: &HttpResponse) -> Option<ApiError> {
    if page.is_success() {
        return None;
    }

    let status = page.status;
    let error = match status {
        401 => ApiError::unauthorized(status, body_message(page)),
        403 => {
            if has_rate_limit_signal(page) {
                ApiError::rate_limited(status, body_message(page))
            } else {
                ApiError::unauthorized(status, body_message(page))
            }
        }
        404 => ApiError::not_found(status, body_message(page)),
        422 => ApiError::validation(status, validation_message(page)),
        429 => ApiError::rate_limited(status, body_message(page)),
        500..=599 => ApiError::server_error(status, body_message(page)),
        _ => ApiError::unknown(status, body_message(page)),
    };
    Some(error)
}

/// Whether a 403 actually signals throttling rather than forbidden access.
///
/// GitHub marks throttled responses with `Retry-After` or an exhausted
/// `x-ratelimit-remaining` counter.
fn has_rate_limit_signal(page: &HttpResponse) -> bool {
    page.header("retry-after").is_some()
        || matches!(page.header("x-ratelimit-remaining"), Some("0"))
}

/// Best-effort message from a response body: the structured `message` field
/// when the body parses, else a bounded excerpt of the raw text.
fn body_message(page: &HttpResponse) -> String {
    if let Ok(body) = serde_json::from_slice::<ErrorBody>(&page.body)
        && let Some(message) = body.message
    {
        return message;
    }
    body_preview(page)
}

/// 422 message: the structured error list joined onto the base message.
fn validation_message(page: &HttpResponse) -> String {
    match serde_json::from_slice::<ErrorBody>(&page.body) {
        Ok(body) => {
            let base = body
                .message
                .unwrap_or_else(|| "Validation Failed".to_string());
            if body.errors.is_empty() {
                base
            } else {
                let details: Vec<String> = body.errors.iter().map(ErrorDetail::render).collect();
                format!("{} ({})", base, details.join("; "))
            }
        }
        Err(_) => body_preview(page),
    }
}

fn body_preview(page: &HttpResponse) -> String {
    let text = String::from_utf8_lossy(&page.body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return format!("HTTP {}", page.status);
    }
    trimmed.chars().take(BODY_PREVIEW_LEN).collect()
}

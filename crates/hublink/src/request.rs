//! Translation of call descriptors into concrete HTTP requests.
//!
//! [`build_request`] is a pure function: the same descriptor and defaults
//! always produce the same request, so retries can rebuild it freely.

use url::Url;

use crate::descriptor::CallDescriptor;
use crate::error::{ApiError, Result};
use crate::http::HttpRequest;

/// Build a concrete HTTP request from a descriptor.
///
/// The URL is the engine's base joined with the descriptor's route (or the
/// route verbatim when it is already fully qualified, as with pagination
/// links), with every query parameter percent-encoded exactly once.
/// Headers: `User-Agent`, `Accept` (descriptor override or `accept_default`),
/// `Authorization: Bearer <token>` when a token is present, and
/// `Content-Type: application/json` when a body is present.
///
/// # Errors
///
/// `InvalidDescriptor` when the route is empty, relative without a leading
/// slash, or fails to parse as a URL.
pub fn build_request(
    base_url: &Url,
    user_agent: &str,
    accept_default: &str,
    descriptor: &CallDescriptor,
) -> Result<HttpRequest> {
    let path = descriptor.path();
    if path.is_empty() {
        return Err(ApiError::invalid_descriptor("request path must not be empty"));
    }

    let mut url = if path.starts_with("https://") || path.starts_with("http://") {
        Url::parse(path)
            .map_err(|e| ApiError::invalid_descriptor(format!("malformed request URL {path:?}: {e}")))?
    } else if path.starts_with('/') {
        base_url
            .join(path)
            .map_err(|e| ApiError::invalid_descriptor(format!("malformed request path {path:?}: {e}")))?
    } else {
        return Err(ApiError::invalid_descriptor(format!(
            "request path {path:?} must start with '/'"
        )));
    };

    if !descriptor.query().is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in descriptor.query() {
            pairs.append_pair(key, value);
        }
    }

    let mut headers: Vec<(String, String)> = vec![
        ("User-Agent".to_string(), user_agent.to_string()),
        (
            "Accept".to_string(),
            descriptor.accept().unwrap_or(accept_default).to_string(),
        ),
    ];

    if let Some(token) = descriptor.token() {
        headers.push(("Authorization".to_string(), format!("Bearer {token}")));
    }

    let body = match descriptor.body() {
        Some(value) => {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
            serde_json::to_vec(value)
                .map_err(|e| ApiError::invalid_descriptor(format!("unserializable body: {e}")))?
        }
        None => Vec::new(),
    };

    Ok(HttpRequest {
        method: descriptor.method(),
        url: url.to_string(),
        headers,
        body,
    })
}

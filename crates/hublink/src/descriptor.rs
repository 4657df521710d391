//! Structured description of one logical API request.
//!
//! A [`CallDescriptor`] captures everything the engine needs to build a
//! concrete HTTP request: method, route, ordered query parameters, an
//! optional JSON body, and optional accept-type and bearer-token overrides.
//! Descriptors are immutable once constructed; pagination derives fresh
//! descriptors via [`CallDescriptor::for_page_url`] instead of mutating the
//! original, so no state leaks between requests.

use serde_json::Value;

use crate::http::HttpMethod;

/// Immutable description of one logical API request.
#[derive(Debug, Clone, PartialEq)]
pub struct CallDescriptor {
    method: HttpMethod,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    accept: Option<String>,
    token: Option<String>,
}

impl CallDescriptor {
    /// Create a descriptor for `method` against an API route.
    ///
    /// `path` is either a route starting with `/` (joined onto the engine's
    /// base URL) or a fully-qualified URL (used verbatim, as when following
    /// pagination links).
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            accept: None,
            token: None,
        }
    }

    /// Shorthand for a GET descriptor.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Append a query parameter. Parameters keep their insertion order.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body. The engine serializes it and sets `Content-Type`.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Override the default accept media type for this call.
    #[must_use]
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Attach a bearer token for this call.
    ///
    /// The engine never stores or refreshes tokens; each descriptor carries
    /// its own.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Derive a descriptor for a continuation page.
    ///
    /// Keeps the method, body, accept type, and token; replaces the route
    /// with the fully-qualified page URL and clears the query (the link URL
    /// already carries it).
    #[must_use]
    pub fn for_page_url(&self, url: impl Into<String>) -> Self {
        Self {
            method: self.method,
            path: url.into(),
            query: Vec::new(),
            body: self.body.clone(),
            accept: self.accept.clone(),
            token: self.token.clone(),
        }
    }

    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    #[must_use]
    pub fn accept(&self) -> Option<&str> {
        self.accept.as_deref()
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

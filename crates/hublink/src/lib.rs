//! hublink - a paginated request engine for the GitHub REST and GraphQL APIs.
//!
//! Every logical API call is described by an immutable [`CallDescriptor`].
//! The [`Engine`] builds the concrete request, sends it over a pluggable
//! transport, retries throttled and transient failures under a bounded
//! policy, follows `Link: rel="next"` pagination with a cycle guard, and
//! normalizes page items into [`ResultRecord`]s with derived convenience
//! fields. Non-2xx responses become a typed [`ApiError`] taxonomy callers
//! match on by value.
//!
//! # Features
//!
//! - `reqwest` (default) - Enables the real HTTP transport. Without it the
//!   crate is transport-agnostic and callers supply their own
//!   [`HttpTransport`].
//! - `test-support` - Exposes the in-memory [`MockTransport`] to
//!   integration tests.
//!
//! # Example
//!
//! ```ignore
//! use hublink::{CallDescriptor, Engine, EngineConfig, NormalizeContext};
//!
//! let engine = Engine::new(EngineConfig::default())?;
//!
//! let descriptor = CallDescriptor::get("/repos/rust-lang/rust/issues")
//!     .with_query("state", "open")
//!     .with_token(token);
//! let context = NormalizeContext::repo("rust-lang", "rust").with_resource("issues");
//!
//! let issues = engine.drain(&descriptor, &context, None).await?;
//! ```

pub mod cancel;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod graphql;
pub mod http;
pub mod link;
pub mod normalize;
pub mod ops;
pub mod rate_limit;
pub mod request;
pub mod retry;

mod pager;

pub use cancel::CancelFlag;
pub use descriptor::CallDescriptor;
pub use engine::{DEFAULT_ACCEPT, DEFAULT_USER_AGENT, Engine, EngineConfig, GITHUB_API_BASE};
pub use error::{ApiError, ErrorKind, Result, classify};
pub use graphql::{BranchProtectionRule, GraphqlRequest, repository_id_query};
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
#[cfg(any(test, feature = "test-support"))]
pub use http::MockTransport;
pub use link::{LinkRelations, parse_link_header};
pub use normalize::{NormalizeContext, ResultRecord, normalize};
pub use ops::{IssueState, RepoRef};
pub use rate_limit::{ApiRateLimiter, RateLimitInfo, RateLimitResponse, rate_limit_from_headers};
pub use retry::{RetryConfig, RetryDecision, RetrySchedule};

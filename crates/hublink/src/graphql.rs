//! GraphQL envelope and parameterized mutation builders.
//!
//! Every GraphQL payload is a single JSON object with a `query` string and a
//! `variables` object. Values travel exclusively through `variables`; query
//! strings are static, so caller input can never alter the document shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::descriptor::CallDescriptor;
use crate::engine::Engine;
use crate::error::{ApiError, Result};
use crate::http::HttpMethod;

/// GraphQL endpoint route.
pub const GRAPHQL_PATH: &str = "/graphql";

/// A parameterized GraphQL request.
#[derive(Debug, Clone, Serialize)]
pub struct GraphqlRequest {
    query: String,
    variables: Map<String, Value>,
}

impl GraphqlRequest {
    /// Create a request for a static query document.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
        }
    }

    /// Bind a variable referenced by the query document.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    message: String,
}

impl Engine {
    /// Execute a GraphQL request and return the `data` payload.
    ///
    /// GraphQL transports errors in-band with HTTP 200; a non-empty `errors`
    /// array surfaces as a `Validation` failure carrying the joined
    /// messages.
    pub async fn graphql(&self, request: &GraphqlRequest, token: Option<&str>) -> Result<Value> {
        let body = serde_json::to_value(request)
            .map_err(|e| ApiError::invalid_descriptor(format!("unserializable GraphQL request: {e}")))?;
        let mut descriptor = CallDescriptor::new(HttpMethod::Post, GRAPHQL_PATH).with_body(body);
        if let Some(token) = token {
            descriptor = descriptor.with_token(token);
        }

        let http_request = self.build(&descriptor)?;
        let page = self.send_with_retry(&http_request).await?;
        let envelope: GraphqlEnvelope = serde_json::from_slice(&page.body)
            .map_err(|e| ApiError::decode(format!("invalid GraphQL response: {e}")))?;

        if !envelope.errors.is_empty() {
            let messages: Vec<String> = envelope.errors.into_iter().map(|e| e.message).collect();
            return Err(ApiError::validation(page.status, messages.join("; ")));
        }

        envelope
            .data
            .ok_or_else(|| ApiError::decode("GraphQL response carried neither data nor errors"))
    }
}

/// Query resolving a repository's GraphQL node id from owner and name.
#[must_use]
pub fn repository_id_query(owner: &str, name: &str) -> GraphqlRequest {
    GraphqlRequest::new(
        "query($owner: String!, $name: String!) { repository(owner: $owner, name: $name) { id } }",
    )
    .with_variable("owner", owner)
    .with_variable("name", name)
}

/// Branch protection settings applied to branches matching a pattern.
///
/// Only the knobs the mutation sends are modeled; unset optional knobs are
/// passed as nulls and keep the server defaults.
#[derive(Debug, Clone)]
pub struct BranchProtectionRule {
    /// Branch name pattern the rule matches, e.g. `main` or `releases/*`.
    pub pattern: String,
    /// Approving reviews required before merging, when review is required.
    pub required_approving_review_count: Option<u32>,
    /// Whether status checks must pass before merging.
    pub requires_status_checks: bool,
    /// Status check contexts that must pass, when checks are required.
    pub required_status_check_contexts: Vec<String>,
    /// Whether new pushes dismiss stale review approvals.
    pub dismisses_stale_reviews: bool,
    /// Whether the rule also binds administrators.
    pub is_admin_enforced: bool,
    /// Whether merge commits are forbidden on matching branches.
    pub requires_linear_history: bool,
    /// Whether force pushes are allowed on matching branches.
    pub allows_force_pushes: bool,
    /// Whether matching branches can be deleted.
    pub allows_deletions: bool,
}

impl BranchProtectionRule {
    /// A rule for `pattern` with everything else off.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            required_approving_review_count: None,
            requires_status_checks: false,
            required_status_check_contexts: Vec::new(),
            dismisses_stale_reviews: false,
            is_admin_enforced: false,
            requires_linear_history: false,
            allows_force_pushes: false,
            allows_deletions: false,
        }
    }

    /// Require `count` approving reviews before merge.
    #[must_use]
    pub fn with_required_reviews(mut self, count: u32) -> Self {
        self.required_approving_review_count = Some(count);
        self
    }

    /// Require the given status check contexts to pass before merge.
    #[must_use]
    pub fn with_status_checks(mut self, contexts: Vec<String>) -> Self {
        self.requires_status_checks = true;
        self.required_status_check_contexts = contexts;
        self
    }

    /// Apply the rule to administrators as well.
    #[must_use]
    pub fn enforced_for_admins(mut self) -> Self {
        self.is_admin_enforced = true;
        self
    }

    /// Build the `createBranchProtectionRule` mutation for a repository
    /// node id, with every value bound as a variable.
    #[must_use]
    pub fn to_create_mutation(&self, repository_id: &str) -> GraphqlRequest {
        const MUTATION: &str = "\
mutation(\
$repositoryId: ID!, \
$pattern: String!, \
$requiresApprovingReviews: Boolean!, \
$requiredApprovingReviewCount: Int, \
$requiresStatusChecks: Boolean!, \
$requiredStatusCheckContexts: [String!]!, \
$dismissesStaleReviews: Boolean!, \
$isAdminEnforced: Boolean!, \
$requiresLinearHistory: Boolean!, \
$allowsForcePushes: Boolean!, \
$allowsDeletions: Boolean!\
) { createBranchProtectionRule(input: {\
repositoryId: $repositoryId, \
pattern: $pattern, \
requiresApprovingReviews: $requiresApprovingReviews, \
requiredApprovingReviewCount: $requiredApprovingReviewCount, \
requiresStatusChecks: $requiresStatusChecks, \
requiredStatusCheckContexts: $requiredStatusCheckContexts, \
dismissesStaleReviews: $dismissesStaleReviews, \
isAdminEnforced: $isAdminEnforced, \
requiresLinearHistory: $requiresLinearHistory, \
allowsForcePushes: $allowsForcePushes, \
allowsDeletions: $allowsDeletions\
}) { branchProtectionRule { id pattern } } }";

        GraphqlRequest::new(MUTATION)
            .with_variable("repositoryId", repository_id)
            .with_variable("pattern", self.pattern.as_str())
            .with_variable(
                "requiresApprovingReviews",
                self.required_approving_review_count.is_some(),
            )
            .with_variable(
                "requiredApprovingReviewCount",
                self.required_approving_review_count
                    .map_or(Value::Null, Value::from),
            )
            .with_variable("requiresStatusChecks", self.requires_status_checks)
            .with_variable(
                "requiredStatusCheckContexts",
                self.required_status_check_contexts.clone(),
            )
            .with_variable("dismissesStaleReviews", self.dismisses_stale_reviews)
            .with_variable("isAdminEnforced", self.is_admin_enforced)
            .with_variable("requiresLinearHistory", self.requires_linear_history)
            .with_variable("allowsForcePushes", self.allows_force_pushes)
            .with_variable("allowsDeletions", self.allows_deletions)
    }
}

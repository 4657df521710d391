//! Representative typed operations over the engine.
//!
//! Each operation resolves its owner/repo parameters, shapes a descriptor,
//! and hands off to the engine; nothing here touches HTTP directly. The
//! surface is deliberately small — enough to cover single-item fetches,
//! paginated collections, boolean probes, and GraphQL mutations.

use serde_json::Value;

use crate::cancel::CancelFlag;
use crate::descriptor::CallDescriptor;
use crate::engine::Engine;
use crate::error::{ApiError, Result};
use crate::graphql::{BranchProtectionRule, repository_id_query};
use crate::normalize::{NormalizeContext, ResultRecord};
use crate::rate_limit::RateLimitResponse;

/// Items requested per page for collection endpoints.
pub const PAGE_SIZE: u32 = 100;

/// A validated owner/name pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    owner: String,
    name: String,
}

impl RepoRef {
    /// Validate and build a repository reference.
    ///
    /// # Errors
    ///
    /// `InvalidDescriptor` when either part is empty or contains `/`.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        let name = name.into();
        for (label, part) in [("owner", &owner), ("name", &name)] {
            if part.is_empty() {
                return Err(ApiError::invalid_descriptor(format!(
                    "repository {label} must not be empty"
                )));
            }
            if part.contains('/') {
                return Err(ApiError::invalid_descriptor(format!(
                    "repository {label} {part:?} must not contain '/'"
                )));
            }
        }
        Ok(Self { owner, name })
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the full name (owner/name).
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    fn context(&self) -> NormalizeContext {
        NormalizeContext::repo(&self.owner, &self.name)
    }
}

/// Issue filter for [`Engine::list_issues`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IssueState {
    #[default]
    Open,
    Closed,
    All,
}

impl IssueState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
            IssueState::All => "all",
        }
    }
}

fn authed(descriptor: CallDescriptor, token: Option<&str>) -> CallDescriptor {
    match token {
        Some(token) => descriptor.with_token(token),
        None => descriptor,
    }
}

impl Engine {
    /// Fetch a single repository.
    pub async fn get_repo(&self, repo: &RepoRef, token: Option<&str>) -> Result<ResultRecord> {
        let descriptor = authed(
            CallDescriptor::get(format!("/repos/{}/{}", repo.owner(), repo.name())),
            token,
        );
        self.execute(&descriptor, &repo.context()).await
    }

    /// List a repository's issues, following pagination to exhaustion.
    pub async fn list_issues(
        &self,
        repo: &RepoRef,
        state: IssueState,
        token: Option<&str>,
        cancel: Option<&CancelFlag>,
    ) -> Result<Vec<ResultRecord>> {
        let descriptor = authed(
            CallDescriptor::get(format!("/repos/{}/{}/issues", repo.owner(), repo.name()))
                .with_query("state", state.as_str())
                .with_query("per_page", PAGE_SIZE.to_string()),
            token,
        );
        let context = repo.context().with_resource("issues");
        self.drain(&descriptor, &context, cancel).await
    }

    /// List a repository's branches, following pagination to exhaustion.
    pub async fn list_branches(
        &self,
        repo: &RepoRef,
        token: Option<&str>,
        cancel: Option<&CancelFlag>,
    ) -> Result<Vec<ResultRecord>> {
        let descriptor = authed(
            CallDescriptor::get(format!("/repos/{}/{}/branches", repo.owner(), repo.name()))
                .with_query("per_page", PAGE_SIZE.to_string()),
            token,
        );
        self.drain(&descriptor, &repo.context(), cancel).await
    }

    /// List a repository's assignable users.
    pub async fn list_assignees(
        &self,
        repo: &RepoRef,
        token: Option<&str>,
        cancel: Option<&CancelFlag>,
    ) -> Result<Vec<ResultRecord>> {
        let descriptor = authed(
            CallDescriptor::get(format!("/repos/{}/{}/assignees", repo.owner(), repo.name()))
                .with_query("per_page", PAGE_SIZE.to_string()),
            token,
        );
        self.drain(&descriptor, &repo.context(), cancel).await
    }

    /// Fetch a user's public profile.
    pub async fn get_user(&self, username: &str, token: Option<&str>) -> Result<ResultRecord> {
        if username.is_empty() {
            return Err(ApiError::invalid_descriptor("username must not be empty"));
        }
        let descriptor = authed(CallDescriptor::get(format!("/users/{username}")), token);
        self.execute(&descriptor, &NormalizeContext::new()).await
    }

    /// Whether vulnerability alerts are enabled for a repository.
    ///
    /// GitHub answers 204 when enabled and 404 when disabled; the outcome is
    /// a value, not an exception to parse.
    pub async fn vulnerability_alerts_enabled(
        &self,
        repo: &RepoRef,
        token: Option<&str>,
    ) -> Result<bool> {
        let descriptor = authed(
            CallDescriptor::get(format!(
                "/repos/{}/{}/vulnerability-alerts",
                repo.owner(),
                repo.name()
            )),
            token,
        );
        self.probe(&descriptor).await
    }

    /// Get the full per-resource rate limit breakdown.
    pub async fn get_rate_limits(&self, token: Option<&str>) -> Result<RateLimitResponse> {
        let descriptor = authed(CallDescriptor::get("/rate_limit"), token);
        self.execute_typed(&descriptor).await
    }

    /// Resolve a repository's GraphQL node id.
    pub async fn repository_node_id(&self, repo: &RepoRef, token: Option<&str>) -> Result<String> {
        let data = self
            .graphql(&repository_id_query(repo.owner(), repo.name()), token)
            .await?;
        data.get("repository")
            .and_then(|r| r.get("id"))
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| ApiError::decode("repository id missing from GraphQL response"))
    }

    /// Create a branch protection rule, resolving the repository node id
    /// first. Returns the created rule's node id.
    pub async fn create_branch_protection(
        &self,
        repo: &RepoRef,
        rule: &BranchProtectionRule,
        token: Option<&str>,
    ) -> Result<String> {
        let repository_id = self.repository_node_id(repo, token).await?;
        let data = self
            .graphql(&rule.to_create_mutation(&repository_id), token)
            .await?;
        data.get("createBranchProtectionRule")
            .and_then(|r| r.get("branchProtectionRule"))
            .and_then(|r| r.get("id"))
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| ApiError::decode("branch protection rule id missing from GraphQL response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::error::ErrorKind;
    use crate::http::{HttpMethod, MockTransport, header_get};
    use crate::retry::RetryConfig;
    use std::sync::Arc;

    const BASE: &str = "https://api.github.com";

    fn engine_with(mock: &MockTransport) -> Engine {
        let config = EngineConfig {
            retry: RetryConfig::default().with_jitter(false),
            ..EngineConfig::default()
        };
        Engine::with_transport(config, Arc::new(mock.clone()))
    }

    fn repo() -> RepoRef {
        RepoRef::new("octocat", "hello-world").expect("valid repo ref")
    }

    #[test]
    fn repo_ref_validates_its_parts() {
        assert!(RepoRef::new("o", "r").is_ok());
        assert_eq!(repo().full_name(), "octocat/hello-world");

        for (owner, name) in [("", "r"), ("o", ""), ("o/x", "r"), ("o", "r/x")] {
            let err = RepoRef::new(owner, name).expect_err("invalid ref");
            assert_eq!(err.kind, ErrorKind::InvalidDescriptor);
        }
    }

    #[test]
    fn issue_state_round_trips_to_query_values() {
        assert_eq!(IssueState::Open.as_str(), "open");
        assert_eq!(IssueState::Closed.as_str(), "closed");
        assert_eq!(IssueState::All.as_str(), "all");
        assert_eq!(IssueState::default(), IssueState::Open);
    }

    #[tokio::test]
    async fn get_repo_builds_the_expected_route_and_auth() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Get,
            &format!("{BASE}/repos/octocat/hello-world"),
            200,
            r#"{"id": 1296269, "name": "hello-world"}"#,
            &[],
        );

        let engine = engine_with(&mock);
        let record = engine
            .get_repo(&repo(), Some("t0ken"))
            .await
            .expect("repo record");

        assert_eq!(record.id, Some(1296269));
        assert_eq!(
            record.canonical_url.as_deref(),
            Some("https://github.com/octocat/hello-world")
        );

        let requests = mock.requests();
        assert_eq!(
            header_get(&requests[0].headers, "authorization"),
            Some("Bearer t0ken")
        );
    }

    #[tokio::test]
    async fn list_issues_drains_and_derives_issue_urls() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Get,
            &format!("{BASE}/repos/octocat/hello-world/issues?state=closed&per_page=100"),
            200,
            r#"[{"number": 5, "title": "a"}, {"number": 6, "title": "b"}]"#,
            &[],
        );

        let engine = engine_with(&mock);
        let records = engine
            .list_issues(&repo(), IssueState::Closed, None, None)
            .await
            .expect("one page of issues");

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].canonical_url.as_deref(),
            Some("https://github.com/octocat/hello-world/issues/5")
        );
    }

    #[tokio::test]
    async fn list_branches_omits_urls_for_unnumbered_items() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Get,
            &format!("{BASE}/repos/octocat/hello-world/branches?per_page=100"),
            200,
            r#"[{"name": "main"}, {"name": "dev"}]"#,
            &[],
        );

        let engine = engine_with(&mock);
        let records = engine
            .list_branches(&repo(), None, None)
            .await
            .expect("branches");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].canonical_url, None);
        assert_eq!(records[0].value["name"], "main");
    }

    #[tokio::test]
    async fn vulnerability_alerts_probe_is_boolean() {
        let mock = MockTransport::new();
        let url = format!("{BASE}/repos/octocat/hello-world/vulnerability-alerts");
        mock.push_response(
            HttpMethod::Get,
            &url,
            crate::http::HttpResponse {
                status: 204,
                headers: Vec::new(),
                body: Vec::new(),
            },
        );
        mock.push_json(HttpMethod::Get, &url, 404, r#"{"message": "Not Found"}"#, &[]);

        let engine = engine_with(&mock);
        assert!(engine
            .vulnerability_alerts_enabled(&repo(), None)
            .await
            .expect("enabled"));
        assert!(!engine
            .vulnerability_alerts_enabled(&repo(), None)
            .await
            .expect("disabled"));
    }

    #[tokio::test]
    async fn get_rate_limits_deserializes_the_breakdown() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Get,
            &format!("{BASE}/rate_limit"),
            200,
            r#"{"resources": {"core": {"limit": 5000, "used": 1, "remaining": 4999, "reset": 1700000000}}}"#,
            &[],
        );

        let engine = engine_with(&mock);
        let limits = engine.get_rate_limits(None).await.expect("rate limits");
        assert_eq!(limits.resources.core.remaining, 4999);
    }

    #[tokio::test]
    async fn create_branch_protection_resolves_node_id_then_mutates() {
        let mock = MockTransport::new();
        let graphql_url = format!("{BASE}/graphql");
        mock.push_json(
            HttpMethod::Post,
            &graphql_url,
            200,
            r#"{"data": {"repository": {"id": "R_node123"}}}"#,
            &[],
        );
        mock.push_json(
            HttpMethod::Post,
            &graphql_url,
            200,
            r#"{"data": {"createBranchProtectionRule": {"branchProtectionRule": {"id": "BPR_1", "pattern": "main"}}}}"#,
            &[],
        );

        let engine = engine_with(&mock);
        let rule_id = engine
            .create_branch_protection(
                &repo(),
                &BranchProtectionRule::new("main").with_required_reviews(1),
                Some("t0ken"),
            )
            .await
            .expect("rule created");

        assert_eq!(rule_id, "BPR_1");

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        let mutation: Value = serde_json::from_slice(&requests[1].body).expect("mutation body");
        assert_eq!(mutation["variables"]["repositoryId"], "R_node123");
        assert_eq!(mutation["variables"]["pattern"], "main");
    }

    #[tokio::test]
    async fn empty_username_is_rejected_before_any_request() {
        let mock = MockTransport::new();
        let engine = engine_with(&mock);

        let err = engine.get_user("", None).await.expect_err("empty username");
        assert_eq!(err.kind, ErrorKind::InvalidDescriptor);
        assert!(mock.requests().is_empty());
    }
}

//! Normalization of raw JSON items into typed result records.
//!
//! The normalizer never rejects an item: derived fields that cannot be
//! computed are simply omitted, and the decoded payload is carried through
//! untouched. Applying it twice yields the same record as applying it once.

use serde_json::Value;

/// Context for deriving fields the raw payload may lack.
///
/// Built from the resolved owner/repo of the call that produced the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeContext {
    owner: Option<String>,
    repo: Option<String>,
    resource: Option<String>,
}

impl NormalizeContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for items belonging to `owner/repo`.
    pub fn repo(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            repo: Some(repo.into()),
            resource: None,
        }
    }

    /// Name the resource collection (`issues`, `pull`, ...) used in derived
    /// canonical URLs.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }
}

/// A decoded item plus engine-derived convenience fields.
///
/// `value` is the payload exactly as the server sent it; the derived fields
/// live alongside it rather than being injected into the document.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    /// The decoded JSON payload, unmodified.
    pub value: Value,
    /// Browser-facing URL for the resource, when derivable.
    pub canonical_url: Option<String>,
    /// Stable numeric identifier, when the payload carries one.
    pub id: Option<i64>,
}

/// Decode one raw item into a [`ResultRecord`].
///
/// Derivation never fails: missing fields leave the corresponding derived
/// field unset.
#[must_use]
pub fn normalize(value: Value, context: &NormalizeContext) -> ResultRecord {
    let canonical_url = canonical_url(&value, context);
    let id = numeric_id(&value);
    ResultRecord {
        value,
        canonical_url,
        id,
    }
}

/// The item's own `html_url` when present, else a URL computed from the
/// context: `https://github.com/{owner}/{repo}/{resource}/{number}` for
/// numbered collection items, `https://github.com/{owner}/{repo}` for the
/// repository itself.
fn canonical_url(value: &Value, context: &NormalizeContext) -> Option<String> {
    if let Some(url) = value.get("html_url").and_then(Value::as_str) {
        return Some(url.to_string());
    }

    let owner = context.owner.as_deref()?;
    let repo = context.repo.as_deref()?;
    match &context.resource {
        Some(resource) => {
            let number = value.get("number").and_then(Value::as_i64)?;
            Some(format!("https://github.com/{owner}/{repo}/{resource}/{number}"))
        }
        None => Some(format!("https://github.com/{owner}/{repo}")),
    }
}

fn numeric_id(value: &Value) -> Option<i64> {
    value
        .get("id")
        .and_then(Value::as_i64)
        .or_else(|| value.get("number").and_then(Value::as_i64))
}

use serde::Serialize;
use std::borrow::Cow;

use super::diff;

/// Pull request metadata a review run works from.
/// Built once from the webhook payload (or the details endpoint) and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestContext {
    /// PR number (e.g., 42)
    pub number: u64,
    /// PR title
    pub title: String,
    /// Author's GitHub login
    pub author: String,
    /// Branch the PR merges into
    pub base_branch: String,
    /// Branch the PR comes from
    pub head_branch: String,
    /// PR body, absent when the author left it empty
    pub description: Option<String>,
    /// Browser URL of the PR
    pub url: String,
    /// Repository in `owner/name` form
    #[serde(rename = "repo")]
    pub repo_identifier: String,
}

/// Raw unified diff of a pull request.
/// Owned by a single run; the bounded projection is derived on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffPayload {
    raw: String,
}

impl DiffPayload {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Number of `\n`-separated lines in the raw diff.
    pub fn line_count(&self) -> usize {
        self.raw.split('\n').count()
    }

    /// Line-bounded projection used as model input.
    pub fn truncated(&self, max_lines: usize) -> Cow<'_, str> {
        diff::truncate(&self.raw, max_lines)
    }
}

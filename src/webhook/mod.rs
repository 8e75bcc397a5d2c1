pub mod signature;
pub mod types;

pub use types::PullRequestEvent;

use thiserror::Error;

use crate::pr::PullRequestContext;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const EVENT_HEADER: &str = "x-github-event";
pub const PULL_REQUEST_EVENT: &str = "pull_request";

/// PR actions that trigger a review.
pub const REVIEWABLE_ACTIONS: [&str; 3] = ["opened", "synchronize", "reopened"];

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Invalid webhook payload: {0}")]
    Payload(#[from] serde_json::Error),
}

pub fn is_reviewable(action: &str) -> bool {
    REVIEWABLE_ACTIONS.contains(&action)
}

impl PullRequestEvent {
    pub fn parse(body: &[u8]) -> Result<Self, EventError> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn is_reviewable(&self) -> bool {
        is_reviewable(&self.action)
    }

    pub fn into_context(self) -> PullRequestContext {
        let pr = self.pull_request;
        PullRequestContext {
            number: pr.number,
            title: pr.title,
            author: pr.user.login,
            base_branch: pr.base.name,
            head_branch: pr.head.name,
            description: pr.body.filter(|b| !b.trim().is_empty()),
            url: pr.html_url,
            repo_identifier: self.repository.full_name,
        }
    }
}

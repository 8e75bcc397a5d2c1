pub mod diff;
pub mod types;

pub use types::{DiffPayload, PullRequestContext};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::Config;

/// Upper bound for every call to the hosting API.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";
const JSON_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("GitHub API responded with {0}")]
    Status(reqwest::StatusCode),

    #[error("GitHub returned an empty diff")]
    EmptyDiff,

    #[error("Invalid repository identifier: {0}")]
    InvalidRepo(String),
}

/// Read access to the source-hosting platform.
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// Fetch the unified diff of a pull request. One attempt, no retry.
    async fn fetch_diff(&self, repo: &str, number: u64) -> Result<DiffPayload, PrError>;

    /// Fetch pull request metadata (used by the manual trigger).
    async fn fetch_details(&self, repo: &str, number: u64)
        -> Result<PullRequestContext, PrError>;

    /// Leave an issue comment on the pull request.
    async fn post_comment(&self, repo: &str, number: u64, body: &str) -> Result<(), PrError>;
}

/// GitHub REST client.
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(config: &Config) -> Result<Self, PrError> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url: config.github.api_url.trim_end_matches('/').to_string(),
            token: config.github_token().to_string(),
        })
    }

    fn pull_url(&self, repo: &str, number: u64) -> Result<String, PrError> {
        validate_repo(repo)?;
        Ok(format!("{}/repos/{}/pulls/{}", self.api_url, repo, number))
    }

    fn get(&self, url: &str, accept: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(USER_AGENT, "pr-review-agent")
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, accept)
    }
}

#[async_trait]
impl SourceHost for GitHubClient {
    #[instrument(skip(self))]
    async fn fetch_diff(&self, repo: &str, number: u64) -> Result<DiffPayload, PrError> {
        let url = self.pull_url(repo, number)?;

        debug!("fetching PR diff from GitHub API");
        let response = self.get(&url, DIFF_MEDIA_TYPE).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PrError::Status(status));
        }
        let diff_text = response.text().await?;
        debug!(diff_bytes = diff_text.len(), "received PR diff");

        if diff_text.trim().is_empty() {
            return Err(PrError::EmptyDiff);
        }
        Ok(DiffPayload::new(diff_text))
    }

    #[instrument(skip(self))]
    async fn fetch_details(
        &self,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestContext, PrError> {
        #[derive(serde::Deserialize)]
        struct User {
            login: String,
        }

        #[derive(serde::Deserialize)]
        struct BranchRef {
            #[serde(rename = "ref")]
            name: String,
        }

        #[derive(serde::Deserialize)]
        struct PullResponse {
            number: u64,
            title: String,
            user: User,
            base: BranchRef,
            head: BranchRef,
            body: Option<String>,
            html_url: String,
        }

        let url = self.pull_url(repo, number)?;

        debug!("fetching PR metadata from GitHub API");
        let pull = self
            .get(&url, JSON_MEDIA_TYPE)
            .send()
            .await?
            .error_for_status()?
            .json::<PullResponse>()
            .await?;
        debug!(title = %pull.title, "received PR metadata");

        Ok(PullRequestContext {
            number: pull.number,
            title: pull.title,
            author: pull.user.login,
            base_branch: pull.base.name,
            head_branch: pull.head.name,
            description: pull.body.filter(|b| !b.trim().is_empty()),
            url: pull.html_url,
            repo_identifier: repo.to_string(),
        })
    }

    #[instrument(skip(self, body))]
    async fn post_comment(&self, repo: &str, number: u64, body: &str) -> Result<(), PrError> {
        validate_repo(repo)?;
        let url = format!("{}/repos/{}/issues/{}/comments", self.api_url, repo, number);

        self.client
            .post(&url)
            .header(USER_AGENT, "pr-review-agent")
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?
            .error_for_status()?;
        debug!("posted PR comment");
        Ok(())
    }
}

/// Accept only `owner/name` so the identifier cannot reshape the request path.
fn validate_repo(repo: &str) -> Result<(), PrError> {
    let mut parts = repo.split('/');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None)
            if !owner.is_empty() && !name.is_empty() && owner != ".." && name != ".."
    );
    if valid {
        Ok(())
    } else {
        Err(PrError::InvalidRepo(repo.to_string()))
    }
}

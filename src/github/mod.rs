pub mod types;

pub use types::{IssueComment, PullRequestDetails};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::reference::PrRef;

const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "pr-resolver";

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Pull request not found: {0}")]
    NotFound(String),

    #[error("GitHub API authentication failed for {pr} (HTTP {status})")]
    Auth { pr: String, status: u16 },

    #[error("GitHub API returned HTTP {status} for {pr}")]
    Status { pr: String, status: u16 },
}

/// The two operations the resolver needs from the hosted-repository API.
/// Implementations must return comments in chronological (creation) order.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Fetch a pull request's metadata (its description text).
    async fn fetch_pull_request(&self, pr: &PrRef) -> Result<PullRequestDetails, GitHubError>;

    /// Fetch the issue comments on a pull request, oldest first.
    async fn fetch_issue_comments(&self, pr: &PrRef) -> Result<Vec<IssueComment>, GitHubError>;
}

/// GitHub REST API client.
///
/// Sends a bearer token when one is configured; unauthenticated requests
/// work for public repositories within GitHub's rate limits.
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Self {
        Self::with_api_url(DEFAULT_API_URL, token)
    }

    /// Use a non-default API base URL (GitHub Enterprise, test servers).
    pub fn with_api_url(api_url: impl Into<String>, token: Option<String>) -> Self {
        GitHubClient {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            token,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, pr: &PrRef) -> Result<T, GitHubError> {
        let mut request = self.client.get(url).header("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else if status == StatusCode::NOT_FOUND {
            Err(GitHubError::NotFound(pr.short()))
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(GitHubError::Auth {
                pr: pr.short(),
                status: status.as_u16(),
            })
        } else {
            Err(GitHubError::Status {
                pr: pr.short(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl PullRequestSource for GitHubClient {
    #[instrument(skip(self), fields(pr = %pr.short()))]
    async fn fetch_pull_request(&self, pr: &PrRef) -> Result<PullRequestDetails, GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_url, pr.org, pr.repo, pr.number
        );
        debug!("fetching pull request from GitHub API");
        self.get_json(&url, pr).await
    }

    #[instrument(skip(self), fields(pr = %pr.short()))]
    async fn fetch_issue_comments(&self, pr: &PrRef) -> Result<Vec<IssueComment>, GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_url, pr.org, pr.repo, pr.number
        );
        debug!("fetching issue comments from GitHub API");
        self.get_json(&url, pr).await
    }
}

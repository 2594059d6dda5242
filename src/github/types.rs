use serde::Deserialize;

/// The slice of the GitHub pull request payload the resolver needs.
/// GitHub sends `null` for a PR created without a description.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestDetails {
    pub body: Option<String>,
}

impl PullRequestDetails {
    /// Description text, empty when the PR has none.
    pub fn description(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

/// A single issue comment on a pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    pub body: Option<String>,
}

impl IssueComment {
    pub fn text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

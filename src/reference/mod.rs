pub mod types;

pub use types::{PrRef, RepoRef};

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unrecognized pull request reference: {0}")]
    UnrecognizedRef(String),

    #[error("Unrecognized repository URL: {0}")]
    UnrecognizedRepo(String),

    #[error("Pull request number out of range: {0}")]
    NumberOutOfRange(String),
}

/// Full pull request URL, e.g. https://github.com/org/repo/pull/42.
/// The org group is maximally greedy: in "a/b/c/pull/5" it captures "a/b"
/// and the repo group takes what remains. A trailing URL fragment is
/// tolerated and ignored.
static PR_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/(?P<org>.+)/(?P<repo>.+)/pull/(?P<number>\d+)(?:#.*)?$")
        .expect("valid PR URL pattern")
});

/// Short id form, e.g. org/repo#42. Same greedy capture semantics.
static SHORT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<org>.+)/(?P<repo>.+)#(?P<number>\d+)$").expect("valid short id pattern")
});

/// Repository root URL in https or SSH remote form, with an optional
/// trailing .git suffix.
static REPO_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https://[^/]+/|git@[^:]+:)(?P<org>.+)/(?P<repo>.+?)(?:\.git)?$")
        .expect("valid repository URL pattern")
});

/// Parse a textual pull request reference into its canonical form.
///
/// Recognized forms, tried in order (first match wins):
/// 1. Full URL: `https://github.com/<org>/<repo>/pull/<number>`
/// 2. Short id: `<org>/<repo>#<number>`
pub fn parse_pr_ref(text: &str) -> Result<PrRef, ParseError> {
    let caps = PR_URL_RE
        .captures(text)
        .or_else(|| SHORT_ID_RE.captures(text))
        .ok_or_else(|| ParseError::UnrecognizedRef(text.to_string()))?;

    let number = caps["number"]
        .parse::<u64>()
        .map_err(|_| ParseError::NumberOutOfRange(text.to_string()))?;

    Ok(PrRef::new(&caps["org"], &caps["repo"], number))
}

/// Extract (org, repo) from a repository URL.
///
/// Accepts `https://<host>/org/repo` and `git@<host>:org/repo`, tolerating
/// a trailing `.git`. Covers repository-root references that carry no pull
/// number; the resolver itself never produces these.
#[allow(dead_code)] // No resolver caller yet; kept for repository-root references
pub fn parse_repo_ref(text: &str) -> Result<RepoRef, ParseError> {
    let caps = REPO_URL_RE
        .captures(text)
        .ok_or_else(|| ParseError::UnrecognizedRepo(text.to_string()))?;

    Ok(RepoRef {
        org: caps["org"].to_string(),
        repo: caps["repo"].to_string(),
    })
}
